//! Quote list with local persistence and periodic reconciliation against a
//! remote JSON endpoint.
//!
//! The pieces, leaves first: [`quote`] (the entity), [`storage`] (key-value
//! backends), [`store`] (the canonical list), [`gateway`] (remote I/O),
//! [`merge`] (the pure reconciliation rule), [`sync`] (scheduling) and
//! [`console`] (line commands for a running watch).

pub mod config;
pub mod console;
pub mod error;
pub mod events;
pub mod gateway;
pub mod merge;
pub mod quote;
pub mod storage;
pub mod store;
pub mod sync;

pub use config::Config;
pub use error::QuoteError;
pub use events::QuoteEvent;
pub use gateway::{FetchOutcome, HttpGateway, RemoteSource};
pub use merge::{merge, reconcile, MergeReport};
pub use quote::{CategoryFilter, Quote, QuoteDraft};
pub use store::QuoteStore;
pub use sync::{SyncHandle, SyncOutcome, SyncScheduler};
