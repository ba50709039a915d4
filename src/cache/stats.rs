//! Cache Statistics Module
//!
//! Tracks lookup outcomes and background population results.

use serde::Serialize;

// == Cache Stats ==
/// Counters describing how the cache has been used.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    /// Lookups answered with a fresh cached value
    pub hits: u64,
    /// Lookups for keys with no entry
    pub misses: u64,
    /// Lookups that found an expired entry
    pub stale: u64,
    /// Lookups made before the initial store load completed
    pub not_ready: u64,
    /// Populate requests handed to the background worker
    pub scheduled: u64,
    /// Populate requests skipped because the key was already in flight
    pub deduplicated: u64,
    /// Populate requests dropped because the queue was full or closed
    pub dropped: u64,
    /// Populates that persisted a new entry
    pub populated: u64,
    /// Populates abandoned on a fetch, encoding or store error
    pub failed: u64,
    /// Entries removed by expiration sweeps
    pub swept: u64,
    /// Current number of entries in the mirror
    pub total_entries: usize,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Fraction of lookups served from the cache.
    ///
    /// Every non-hit outcome counts against the rate. Returns 0.0 if no
    /// lookups have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.lookups();
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// Total lookups across all outcomes.
    pub fn lookups(&self) -> u64 {
        self.hits + self.misses + self.stale + self.not_ready
    }

    // == Update Entry Count ==
    /// Updates the total entries count.
    pub fn set_total_entries(&mut self, count: usize) {
        self.total_entries = count;
    }
}
