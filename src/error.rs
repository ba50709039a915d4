//! Error types for the image cache
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Fetch Error ==
/// Failure to retrieve a resource from its origin.
#[derive(Error, Debug)]
pub enum FetchError {
    /// Key is not a fetchable http(s) URL
    #[error("Invalid resource URL: {0}")]
    InvalidUrl(String),

    /// Transport failure or timeout
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Origin answered with a non-success status
    #[error("Origin returned status {status} for {url}")]
    Status { url: String, status: u16 },

    /// Body exceeds the configured limit
    #[error("Resource too large: {size} bytes (limit {limit})")]
    TooLarge { size: usize, limit: usize },
}

// == Encoding Error ==
/// Failure to turn fetched bytes into the storage representation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodingError {
    /// Nothing to encode
    #[error("Resource body is empty")]
    Empty,

    /// Neither a declared nor a sniffable media type
    #[error("Unable to determine media type")]
    UnknownMediaType,

    /// Stored value is not a base64 data URL
    #[error("Malformed data URL: {0}")]
    Malformed(String),
}

// == Store Error ==
/// Failure reading or writing the persistent store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store document is invalid: {0}")]
    Serde(#[from] serde_json::Error),
}

// == Cache Error Enum ==
/// Unified error type for the image cache.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Encoding(#[from] EncodingError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// No fresh entry for the key
    #[error("Not cached: {0}")]
    NotCached(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::Fetch(_) => StatusCode::BAD_GATEWAY,
            CacheError::Encoding(_) => StatusCode::UNPROCESSABLE_ENTITY,
            CacheError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CacheError::NotCached(_) => StatusCode::NOT_FOUND,
        };

        let body = Json(ErrorResponse::new(self.to_string()));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the image cache.
pub type Result<T> = std::result::Result<T, CacheError>;
