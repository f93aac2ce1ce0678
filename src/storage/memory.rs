use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::Result;

use super::KvBackend;

/// Volatile backend for tests and `--ephemeral` runs.
#[derive(Default)]
pub struct MemoryBackend {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvBackend for MemoryBackend {
    fn backend_name(&self) -> &str {
        "memory"
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        let values = self.values.lock().map_err(|e| anyhow::anyhow!("lock poisoned: {e}"))?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self.values.lock().map_err(|e| anyhow::anyhow!("lock poisoned: {e}"))?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
