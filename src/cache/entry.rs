//! Cache Entry Module
//!
//! Defines the record stored for each cached resource.

use serde::{Deserialize, Serialize};

// == Cache Entry ==
/// An encoded resource and the moment it was written.
///
/// The key lives in the owning map. On disk the record is
/// `{"value": ..., "timestamp": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// The encoded payload (a data URL)
    pub value: String,
    /// Write timestamp (Unix milliseconds)
    #[serde(rename = "timestamp")]
    pub created_at: u64,
}

impl CacheEntry {
    // == Constructor ==
    pub fn new(value: impl Into<String>, created_at: u64) -> Self {
        Self {
            value: value.into(),
            created_at,
        }
    }

    // == Age ==
    /// Age in milliseconds at `now`. Entries dated in the future have age 0.
    pub fn age_ms(&self, now: u64) -> u64 {
        now.saturating_sub(self.created_at)
    }

    // == Is Fresh ==
    /// Checks whether the entry may still be served at `now`.
    ///
    /// Boundary condition: an entry is fresh while its age is strictly below
    /// the TTL, so at exactly `created_at + ttl` it is already expired.
    /// A wall clock stepped backwards leaves entries dated in the future;
    /// those stay fresh.
    pub fn is_fresh(&self, now: u64, ttl_ms: u64) -> bool {
        self.age_ms(now) < ttl_ms
    }

    // == Is Expired ==
    pub fn is_expired(&self, now: u64, ttl_ms: u64) -> bool {
        !self.is_fresh(now, ttl_ms)
    }
}
