//! Configuration Module
//!
//! Handles loading and managing service configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::DEFAULT_TTL_MS;

/// Service configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// JSON store file; None keeps the cache in memory only
    pub store_path: Option<PathBuf>,
    /// Top-level key holding the cache inside the store document
    pub store_namespace: String,
    /// Entry lifetime in milliseconds
    pub ttl_ms: u64,
    /// HTTP server port
    pub server_port: u16,
    /// Seconds between expiration sweeps
    pub sweep_interval: u64,
    /// Per-fetch timeout in seconds
    pub fetch_timeout: u64,
    /// Populates allowed to run at once
    pub max_concurrent_fetches: usize,
    /// Pending populate requests before new ones are dropped
    pub queue_capacity: usize,
    /// Largest resource body accepted, in bytes
    pub max_resource_bytes: usize,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `STORE_PATH` - Store file; set empty for memory only (default: image_cache.json)
    /// - `STORE_NAMESPACE` - Key inside the store document (default: image_cache)
    /// - `CACHE_TTL_MS` - Entry lifetime in ms (default: 86400000)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `SWEEP_INTERVAL` - Sweep frequency in seconds (default: 3600)
    /// - `FETCH_TIMEOUT` - Fetch timeout in seconds (default: 30)
    /// - `MAX_CONCURRENT_FETCHES` - Populate concurrency (default: 8)
    /// - `QUEUE_CAPACITY` - Pending populate requests (default: 1024)
    /// - `MAX_RESOURCE_BYTES` - Largest accepted resource (default: 5 MiB)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let store_path = match env::var("STORE_PATH") {
            Ok(path) if path.trim().is_empty() => None,
            Ok(path) => Some(PathBuf::from(path)),
            Err(_) => defaults.store_path,
        };

        Self {
            store_path,
            store_namespace: env::var("STORE_NAMESPACE")
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.store_namespace),
            ttl_ms: parse_env("CACHE_TTL_MS").unwrap_or(defaults.ttl_ms),
            server_port: parse_env("SERVER_PORT").unwrap_or(defaults.server_port),
            sweep_interval: parse_env("SWEEP_INTERVAL").unwrap_or(defaults.sweep_interval),
            fetch_timeout: parse_env("FETCH_TIMEOUT").unwrap_or(defaults.fetch_timeout),
            max_concurrent_fetches: parse_env("MAX_CONCURRENT_FETCHES")
                .unwrap_or(defaults.max_concurrent_fetches),
            queue_capacity: parse_env("QUEUE_CAPACITY").unwrap_or(defaults.queue_capacity),
            max_resource_bytes: parse_env("MAX_RESOURCE_BYTES")
                .unwrap_or(defaults.max_resource_bytes),
        }
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout)
    }
}

fn parse_env<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_path: Some(PathBuf::from("image_cache.json")),
            store_namespace: "image_cache".to_string(),
            ttl_ms: DEFAULT_TTL_MS,
            server_port: 3000,
            sweep_interval: 3600,
            fetch_timeout: 30,
            max_concurrent_fetches: 8,
            queue_capacity: 1024,
            max_resource_bytes: 5 * 1024 * 1024,
        }
    }
}
