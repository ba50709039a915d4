//! Process-local store, for ephemeral runs and tests

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{Entries, PersistentStore};
use crate::error::StoreError;

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<Entries>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that already holds `entries`.
    pub fn with_entries(entries: Entries) -> Self {
        Self {
            entries: RwLock::new(entries),
        }
    }

    /// Copy of the current contents.
    pub fn snapshot(&self) -> Entries {
        self.entries.read().clone()
    }
}

#[async_trait]
impl PersistentStore for MemoryStore {
    async fn load_all(&self) -> Result<Entries, StoreError> {
        Ok(self.snapshot())
    }

    async fn save_all(&self, entries: &Entries) -> Result<(), StoreError> {
        *self.entries.write() = entries.clone();
        Ok(())
    }
}
