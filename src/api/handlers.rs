//! API Handlers
//!
//! HTTP request handlers for each image cache endpoint.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};

use crate::cache::{CacheEngine, EngineOptions};
use crate::codec;
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::fetcher::HttpFetcher;
use crate::models::{
    HealthResponse, LookupQuery, LookupResponse, PopulateRequest, PopulateResponse,
    StatsResponse, SweepResponse,
};
use crate::storage::{JsonFileStore, MemoryStore, PersistentStore};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: CacheEngine,
}

impl AppState {
    /// Creates a new AppState around an existing engine.
    pub fn new(engine: CacheEngine) -> Self {
        Self { engine }
    }

    /// Builds the store, fetcher and engine described by the configuration.
    ///
    /// Must be called from within a tokio runtime.
    pub fn from_config(config: &Config) -> Result<Self> {
        let store: Arc<dyn PersistentStore> = match &config.store_path {
            Some(path) => Arc::new(JsonFileStore::new(path, config.store_namespace.clone())),
            None => Arc::new(MemoryStore::new()),
        };
        let fetcher = HttpFetcher::new(config.fetch_timeout(), config.max_resource_bytes)?;

        let engine = CacheEngine::new(store, Arc::new(fetcher), EngineOptions::from_config(config));
        Ok(Self::new(engine))
    }
}

/// Handler for GET /lookup?url=
///
/// Answers immediately with the cached data URL or the URL itself.
pub async fn lookup_handler(
    State(state): State<AppState>,
    Query(query): Query<LookupQuery>,
) -> Result<Json<LookupResponse>> {
    if let Some(error_msg) = query.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let lookup = state.engine.lookup_detailed(&query.url);
    Ok(Json(LookupResponse::new(query.url, lookup)))
}

/// Handler for GET /raw?url=
///
/// Serves the cached bytes with their media type. Anything but a fresh hit
/// is a 404, and schedules a populate like any other lookup.
pub async fn raw_handler(
    State(state): State<AppState>,
    Query(query): Query<LookupQuery>,
) -> Result<Response> {
    if let Some(error_msg) = query.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let lookup = state.engine.lookup_detailed(&query.url);
    if !lookup.is_hit() {
        return Err(CacheError::NotCached(query.url));
    }

    let (media_type, bytes) = codec::decode(&lookup.value)?;
    Ok(([(header::CONTENT_TYPE, media_type)], bytes).into_response())
}

/// Handler for POST /populate
///
/// Fetches and caches the resource, waiting for the result.
pub async fn populate_handler(
    State(state): State<AppState>,
    Json(req): Json<PopulateRequest>,
) -> Result<Json<PopulateResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let entry = state.engine.populate(&req.url).await?;
    Ok(Json(PopulateResponse::new(req.url, &entry)))
}

/// Handler for POST /sweep
pub async fn sweep_handler(State(state): State<AppState>) -> Json<SweepResponse> {
    let removed = state.engine.clear_expired().await;

    Json(SweepResponse {
        removed,
        remaining: state.engine.len(),
    })
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse::from(state.engine.stats()))
}

/// Handler for GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::healthy(state.engine.is_ready()))
}
