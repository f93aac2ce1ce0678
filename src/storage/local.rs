//! On-disk backend backed by redb.
//!
//! A single table maps keys to raw string values:
//!   kv:  key → value (JSON for lists, plain text for scalars)
//!
//! Every `set` is its own write transaction, so a crash mid-write leaves the
//! previous value intact.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use redb::{Database, TableDefinition};

use super::KvBackend;

const KV: TableDefinition<&str, &str> = TableDefinition::new("kv");

pub struct RedbBackend {
    db: Database,
    path: PathBuf,
}

impl RedbBackend {
    /// Open or create the database, creating parent directories as needed.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let db = Database::create(path)
            .with_context(|| format!("failed to open quote database at {}", path.display()))?;
        // Ensure the table exists so read transactions never miss it
        {
            let txn = db.begin_write()?;
            txn.open_table(KV)?;
            txn.commit()?;
        }
        tracing::debug!(path = %path.display(), "opened quote database");
        Ok(Self {
            db,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KvBackend for RedbBackend {
    fn backend_name(&self) -> &str {
        "redb"
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(KV)?;
        Ok(table.get(key)?.map(|v| v.value().to_string()))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(KV)?;
            table.insert(key, value)?;
        }
        txn.commit()
            .with_context(|| format!("failed to commit write of '{}'", key))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_key_reads_none() {
        let dir = tempfile::tempdir().unwrap();
        let backend = RedbBackend::open(&dir.path().join("quotes.redb")).unwrap();
        assert!(backend.get("quotes").unwrap().is_none());
    }

    #[test]
    fn test_set_then_get_and_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let backend = RedbBackend::open(&dir.path().join("quotes.redb")).unwrap();

        backend.set("selectedCategory", "Design").unwrap();
        assert_eq!(backend.get("selectedCategory").unwrap().as_deref(), Some("Design"));

        backend.set("selectedCategory", "all").unwrap();
        assert_eq!(backend.get("selectedCategory").unwrap().as_deref(), Some("all"));
    }

    #[test]
    fn test_values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("quotes.redb");
        {
            let backend = RedbBackend::open(&path).unwrap();
            backend.set("quotes", "[]").unwrap();
        }
        let reopened = RedbBackend::open(&path).unwrap();
        assert_eq!(reopened.get("quotes").unwrap().as_deref(), Some("[]"));
        assert_eq!(reopened.path(), path.as_path());
    }
}
