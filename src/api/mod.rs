//! API Module
//!
//! HTTP handlers and routing for the image cache REST API.
//!
//! # Endpoints
//! - `GET /lookup?url=` - Cached data URL or the URL itself
//! - `GET /raw?url=` - Cached bytes with their media type
//! - `POST /populate` - Fetch and cache a URL
//! - `POST /sweep` - Remove expired entries
//! - `GET /stats` - Get cache statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
