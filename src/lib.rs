//! Image Cache - A read-through cache for remote images
//!
//! Answers lookups instantly from an in-memory mirror of a persistent store,
//! falling back to the original URL while the image is fetched, encoded as a
//! data URL and persisted in the background. Entries expire after a TTL.

pub mod api;
pub mod cache;
pub mod codec;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod models;
pub mod storage;
pub mod tasks;

pub use api::AppState;
pub use cache::{CacheEngine, EngineOptions, Lookup, LookupOutcome};
pub use config::Config;
pub use tasks::spawn_sweep_task;
