//! Cache Module
//!
//! Read-through caching of remote resources with TTL expiration and
//! background population.

mod clock;
mod engine;
mod entry;
mod stats;


// Re-export public types
pub use clock::{current_timestamp_ms, Clock, ManualClock, SystemClock};
pub use engine::{CacheEngine, EngineOptions, Lookup, LookupOutcome};
pub use entry::CacheEntry;
pub use stats::CacheStats;

// == Public Constants ==
/// Default entry lifetime: 24 hours in milliseconds
pub const DEFAULT_TTL_MS: u64 = 24 * 60 * 60 * 1000;

/// Maximum accepted key (URL) length in bytes
pub const MAX_KEY_LENGTH: usize = 2048;
