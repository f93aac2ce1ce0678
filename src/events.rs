//! Notifications for whatever renders the quote list.

use tokio::sync::mpsc;

use crate::quote::Quote;

#[derive(Debug, Clone, PartialEq)]
pub enum QuoteEvent {
    /// The store's list was replaced or appended to. Carries the new list.
    QuotesChanged(Vec<Quote>),
    /// A sync cycle finished with a successful fetch.
    SyncCompleted(String),
}

pub type EventSender = mpsc::UnboundedSender<QuoteEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<QuoteEvent>;

pub fn channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}
