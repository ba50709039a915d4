//! API Routes
//!
//! Configures the Axum router with all image cache endpoints.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    health_handler, lookup_handler, populate_handler, raw_handler, stats_handler, sweep_handler,
    AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /lookup?url=` - Cached data URL or the URL itself, never waits
/// - `GET /raw?url=` - Cached bytes with their media type
/// - `POST /populate` - Fetch and cache a URL, waiting for the result
/// - `POST /sweep` - Remove expired entries
/// - `GET /stats` - Cache statistics
/// - `GET /health` - Health check endpoint
///
/// # Middleware
/// - CORS: Allows any origin, so extension and web UIs can call it
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/lookup", get(lookup_handler))
        .route("/raw", get(raw_handler))
        .route("/populate", post(populate_handler))
        .route("/sweep", post(sweep_handler))
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
