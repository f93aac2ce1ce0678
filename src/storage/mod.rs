//! Key-value persistence behind the quote store.
//!
//! - [`RedbBackend`]: embedded redb database on disk (default)
//! - [`MemoryBackend`]: process-local map, nothing survives a restart
//!
//! The `QuoteStore` holds a `Box<dyn KvBackend>` and every read and write of
//! persisted state goes through it. Values are strings; the store decides
//! their encoding.

pub mod local;
pub mod memory;

use anyhow::Result;

pub use local::RedbBackend;
pub use memory::MemoryBackend;

/// String-keyed persistence with whole-value writes.
///
/// A `set` must be all-or-nothing: a concurrent or later `get` sees either
/// the previous value or the new one, never a partial write.
pub trait KvBackend: Send + Sync {
    /// Human-readable backend name (e.g., "redb", "memory").
    fn backend_name(&self) -> &str;

    /// Read a value. Returns None if the key was never written.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Overwrite a value.
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

