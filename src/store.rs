//! The canonical quote list and the persisted filter selection.
//!
//! Persistence layout in the backing [`KvBackend`]:
//!
//! ```text
//! quotes            → JSON array of {text, category}
//! selectedCategory  → category name, or "all"
//! lastSyncedAt      → RFC 3339 timestamp of the last completed sync
//! ```
//!
//! Reads fail soft: a missing or corrupt value is logged and treated as
//! empty. Writes propagate their errors to the caller.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::QuoteError;
use crate::events::{EventSender, QuoteEvent};
use crate::quote::{self, CategoryFilter, Quote, QuoteDraft};
use crate::storage::KvBackend;

pub const QUOTES_KEY: &str = "quotes";
pub const SELECTED_CATEGORY_KEY: &str = "selectedCategory";
pub const LAST_SYNCED_KEY: &str = "lastSyncedAt";

pub struct QuoteStore {
    backend: Box<dyn KvBackend>,
    quotes: Vec<Quote>,
    events: EventSender,
}

impl QuoteStore {
    /// Open the store and load whatever list is persisted.
    pub fn open(backend: Box<dyn KvBackend>, events: EventSender) -> Self {
        let mut store = Self {
            backend,
            quotes: Vec::new(),
            events,
        };
        store.quotes = store.load();
        tracing::debug!(
            backend = store.backend.backend_name(),
            count = store.quotes.len(),
            "loaded quotes"
        );
        store
    }

    pub fn backend_name(&self) -> &str {
        self.backend.backend_name()
    }

    /// Read the persisted list. Absent or unparsable state yields an empty list.
    pub fn load(&self) -> Vec<Quote> {
        let raw = match self.backend.get(QUOTES_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                tracing::warn!(err = %e, "could not read stored quotes, starting empty");
                return Vec::new();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(quotes) => quotes,
            Err(e) => {
                tracing::warn!(err = %e, "stored quotes are corrupt, starting empty");
                Vec::new()
            }
        }
    }

    /// Overwrite the persisted list in a single backend write.
    pub fn save(&self, quotes: &[Quote]) -> Result<()> {
        let contents = serde_json::to_string(quotes).context("Failed to serialize quotes")?;
        self.backend
            .set(QUOTES_KEY, &contents)
            .context("Failed to persist quotes")
    }

    /// Replace the whole list (import, merge-apply). Persists before the
    /// in-memory list changes, so a failed write leaves the store as it was.
    pub fn replace(&mut self, quotes: Vec<Quote>) -> Result<()> {
        self.save(&quotes)?;
        self.quotes = quotes;
        self.notify_changed();
        Ok(())
    }

    /// Add one quote without any uniqueness check.
    pub fn append(&mut self, quote: Quote) -> Result<()> {
        self.quotes.push(quote);
        if let Err(e) = self.save(&self.quotes) {
            self.quotes.pop();
            return Err(e);
        }
        self.notify_changed();
        Ok(())
    }

    /// The manual add path: validate, then append.
    pub fn add(&mut self, draft: QuoteDraft) -> Result<Quote, QuoteError> {
        let quote = draft.validate()?;
        self.append(quote.clone())?;
        tracing::info!(text = %quote.text, category = %quote.category, "added quote");
        Ok(quote)
    }

    pub fn quotes(&self) -> &[Quote] {
        &self.quotes
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    pub fn categories(&self) -> Vec<String> {
        quote::categories(&self.quotes)
    }

    pub fn filter(&self, filter: &CategoryFilter) -> Vec<&Quote> {
        quote::filter_quotes(&self.quotes, filter)
    }

    pub fn random_quote<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&Quote> {
        self.quotes.choose(rng)
    }

    /// Last filter the user picked, `All` if none was ever saved.
    pub fn selected_category(&self) -> CategoryFilter {
        match self.backend.get(SELECTED_CATEGORY_KEY) {
            Ok(Some(raw)) => raw.parse().unwrap_or_default(),
            Ok(None) => CategoryFilter::All,
            Err(e) => {
                tracing::warn!(err = %e, "could not read selected category");
                CategoryFilter::All
            }
        }
    }

    pub fn select_category(&self, filter: &CategoryFilter) -> Result<()> {
        self.backend
            .set(SELECTED_CATEGORY_KEY, &filter.to_string())
            .context("Failed to persist selected category")
    }

    pub fn last_synced_at(&self) -> Option<DateTime<Utc>> {
        let raw = self.backend.get(LAST_SYNCED_KEY).ok().flatten()?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|t| t.with_timezone(&Utc))
            .ok()
    }

    pub fn record_sync(&self, at: DateTime<Utc>) -> Result<()> {
        self.backend
            .set(LAST_SYNCED_KEY, &at.to_rfc3339())
            .context("Failed to persist sync timestamp")
    }

    /// Replace the list with the contents of an exported JSON file.
    /// Returns the number of imported quotes.
    pub fn import_json(&mut self, contents: &str) -> Result<usize, QuoteError> {
        let imported: Vec<Quote> = serde_json::from_str(contents)?;
        let count = imported.len();
        self.replace(imported)?;
        tracing::info!(count, "imported quotes");
        Ok(count)
    }

    /// Pretty-printed JSON of the current list.
    pub fn export_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.quotes).context("Failed to serialize quotes")
    }

    fn notify_changed(&self) {
        let _ = self.events.send(QuoteEvent::QuotesChanged(self.quotes.clone()));
    }
}
