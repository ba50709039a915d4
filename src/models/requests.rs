//! Request DTOs for the image cache API
//!
//! Defines the structure of incoming query strings and request bodies.

use serde::Deserialize;

use crate::cache::MAX_KEY_LENGTH;

/// Query string for `GET /lookup` and `GET /raw`
#[derive(Debug, Clone, Deserialize)]
pub struct LookupQuery {
    /// Resource URL used as the cache key
    pub url: String,
}

impl LookupQuery {
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        validate_key(&self.url)
    }
}

/// Request body for `POST /populate`
#[derive(Debug, Clone, Deserialize)]
pub struct PopulateRequest {
    /// Resource URL to fetch and cache
    pub url: String,
}

impl PopulateRequest {
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        validate_key(&self.url)
    }
}

fn validate_key(key: &str) -> Option<String> {
    if key.trim().is_empty() {
        return Some("URL cannot be empty".to_string());
    }
    if key.len() > MAX_KEY_LENGTH {
        return Some(format!(
            "URL exceeds maximum length of {} bytes",
            MAX_KEY_LENGTH
        ));
    }
    None
}
