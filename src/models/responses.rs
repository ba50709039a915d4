//! Response DTOs for the image cache API
//!
//! Defines the structure of outgoing HTTP response bodies.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cache::{CacheEntry, CacheStats, Lookup, LookupOutcome};

/// Response body for `GET /lookup`
#[derive(Debug, Clone, Serialize)]
pub struct LookupResponse {
    /// The requested key
    pub key: String,
    /// Cached data URL on a hit, the key itself otherwise
    pub value: String,
    /// How the lookup was answered
    pub outcome: LookupOutcome,
}

impl LookupResponse {
    pub fn new(key: impl Into<String>, lookup: Lookup) -> Self {
        Self {
            key: key.into(),
            value: lookup.value,
            outcome: lookup.outcome,
        }
    }
}

/// Response body for `POST /populate`
#[derive(Debug, Clone, Serialize)]
pub struct PopulateResponse {
    /// The key that was cached
    pub key: String,
    /// Write timestamp (Unix milliseconds)
    pub created_at: u64,
    /// Write timestamp in ISO 8601 format
    pub cached_at: String,
    /// Length of the stored data URL
    pub size: usize,
}

impl PopulateResponse {
    pub fn new(key: impl Into<String>, entry: &CacheEntry) -> Self {
        let cached_at = i64::try_from(entry.created_at)
            .ok()
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .map(|t| t.to_rfc3339())
            .unwrap_or_default();

        Self {
            key: key.into(),
            created_at: entry.created_at,
            cached_at,
            size: entry.value.len(),
        }
    }
}

/// Response body for `POST /sweep`
#[derive(Debug, Clone, Serialize)]
pub struct SweepResponse {
    /// Entries removed by this sweep
    pub removed: usize,
    /// Entries left in the cache
    pub remaining: usize,
}

/// Response body for the stats endpoint (`GET /stats`)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub stats: CacheStats,
    /// Hit rate (hits / all lookups)
    pub hit_rate: f64,
}

impl From<CacheStats> for StatsResponse {
    fn from(stats: CacheStats) -> Self {
        Self {
            hit_rate: stats.hit_rate(),
            stats,
        }
    }
}

/// Response body for the health endpoint (`GET /health`)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Whether the initial store load has completed
    pub ready: bool,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy(ready: bool) -> Self {
        Self {
            status: "healthy".to_string(),
            ready,
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    /// Creates a new ErrorResponse
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_response_serialize() {
        let resp = LookupResponse::new(
            "https://x/img.png",
            Lookup {
                value: "https://x/img.png".to_string(),
                outcome: LookupOutcome::NotReady,
            },
        );
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains(r#""outcome":"not_ready""#));
    }

    #[test]
    fn test_populate_response_timestamp() {
        let entry = CacheEntry::new("data:E1", 0);
        let resp = PopulateResponse::new("k", &entry);
        assert_eq!(resp.cached_at, "1970-01-01T00:00:00+00:00");
        assert_eq!(resp.size, 7);
    }

    #[test]
    fn test_stats_response_flattens_counters() {
        let stats = CacheStats {
            hits: 3,
            misses: 1,
            ..CacheStats::default()
        };
        let json = serde_json::to_value(StatsResponse::from(stats)).unwrap();
        assert_eq!(json["hits"], 3);
        assert_eq!(json["misses"], 1);
        assert_eq!(json["hit_rate"], 0.75);
    }

    #[test]
    fn test_health_response_serialize() {
        let resp = HealthResponse::healthy(true);
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("healthy"));
        assert!(json.contains(r#""ready":true"#));
        assert!(json.contains("timestamp"));
    }

    #[test]
    fn test_error_response_serialize() {
        let resp = ErrorResponse::new("Something went wrong");
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("error"));
        assert!(json.contains("Something went wrong"));
    }
}
