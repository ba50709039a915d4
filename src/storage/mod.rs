//! Persistent Store Module
//!
//! Durable mapping from cache key to entry. The store is always read and
//! written as a whole; there is no per-key primitive.

mod file;
mod memory;

use std::collections::HashMap;

use async_trait::async_trait;

use crate::cache::CacheEntry;
use crate::error::StoreError;

pub use file::JsonFileStore;
pub use memory::MemoryStore;

/// Full key → entry mapping as held by a store.
pub type Entries = HashMap<String, CacheEntry>;

/// Durable storage for the cache mirror.
#[async_trait]
pub trait PersistentStore: Send + Sync + 'static {
    /// Returns the full persisted mapping, empty if nothing was saved yet.
    async fn load_all(&self) -> Result<Entries, StoreError>;

    /// Replaces the full persisted mapping.
    async fn save_all(&self, entries: &Entries) -> Result<(), StoreError>;
}
