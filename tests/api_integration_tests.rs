//! Integration Tests for API Endpoints
//!
//! Drives the router end to end against a mock image origin.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use image_cache::{
    api::create_router,
    cache::{CacheEngine, EngineOptions},
    fetcher::HttpFetcher,
    storage::{JsonFileStore, MemoryStore, PersistentStore},
    AppState,
};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 7, 7, 7];

// == Helper Functions ==

async fn origin_serving_png() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/img.png"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(PNG.to_vec())
                .insert_header("content-type", "image/png"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/missing.png"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    server
}

fn engine_on(store: Arc<dyn PersistentStore>) -> CacheEngine {
    let fetcher = HttpFetcher::new(Duration::from_secs(5), 1024 * 1024).unwrap();
    CacheEngine::new(store, Arc::new(fetcher), EngineOptions::default())
}

async fn create_test_app() -> (Router, CacheEngine) {
    let engine = engine_on(Arc::new(MemoryStore::new()));
    engine.wait_ready().await;
    (create_router(AppState::new(engine.clone())), engine)
}

fn encode_query(url: &str) -> String {
    url.replace(':', "%3A").replace('/', "%2F")
}

async fn get(app: &Router, uri: &str) -> axum::response::Response {
    app.clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn post_json(app: &Router, uri: &str, body: String) -> axum::response::Response {
    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap()
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn eventually(mut condition: impl FnMut() -> bool) {
    for _ in 0..300 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not met in time");
}

// == Lookup Endpoint Tests ==

#[tokio::test]
async fn test_lookup_miss_then_hit() {
    let origin = origin_serving_png().await;
    let (app, engine) = create_test_app().await;
    let url = format!("{}/img.png", origin.uri());
    let uri = format!("/lookup?url={}", encode_query(&url));

    let response = get(&app, &uri).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["value"], url.as_str());
    assert_eq!(json["outcome"], "miss");

    eventually(|| engine.peek(&url).is_some()).await;

    let json = body_to_json(get(&app, &uri).await.into_body()).await;
    assert_eq!(json["outcome"], "hit");
    assert!(json["value"]
        .as_str()
        .unwrap()
        .starts_with("data:image/png;base64,"));
}

#[tokio::test]
async fn test_lookup_failed_fetch_keeps_fallback() {
    let origin = origin_serving_png().await;
    let (app, engine) = create_test_app().await;
    let url = format!("{}/missing.png", origin.uri());
    let uri = format!("/lookup?url={}", encode_query(&url));

    get(&app, &uri).await;
    eventually(|| engine.stats().failed == 1 && engine.in_flight() == 0).await;

    let json = body_to_json(get(&app, &uri).await.into_body()).await;
    assert_eq!(json["value"], url.as_str());
    assert_eq!(json["outcome"], "miss");
    assert!(engine.is_empty());
}

// == Populate Endpoint Tests ==

#[tokio::test]
async fn test_populate_endpoint_success() {
    let origin = origin_serving_png().await;
    let (app, engine) = create_test_app().await;
    let url = format!("{}/img.png", origin.uri());

    let response = post_json(&app, "/populate", format!(r#"{{"url":"{}"}}"#, url)).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["key"], url.as_str());
    assert!(json["created_at"].as_u64().is_some());
    assert!(engine.lookup_detailed(&url).is_hit());
}

#[tokio::test]
async fn test_populate_endpoint_origin_error() {
    let origin = origin_serving_png().await;
    let (app, _) = create_test_app().await;
    let url = format!("{}/missing.png", origin.uri());

    let response = post_json(&app, "/populate", format!(r#"{{"url":"{}"}}"#, url)).await;

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let json = body_to_json(response.into_body()).await;
    assert!(json["error"].as_str().unwrap().contains("404"));
}

#[tokio::test]
async fn test_populate_endpoint_empty_url() {
    let (app, _) = create_test_app().await;

    let response = post_json(&app, "/populate", r#"{"url":""}"#.to_string()).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// == Raw Endpoint Tests ==

#[tokio::test]
async fn test_raw_endpoint_serves_decoded_bytes() {
    let origin = origin_serving_png().await;
    let (app, engine) = create_test_app().await;
    let url = format!("{}/img.png", origin.uri());
    engine.populate(&url).await.unwrap();

    let response = get(&app, &format!("/raw?url={}", encode_query(&url))).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "image/png");
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], PNG);
}

// == Sweep, Stats and Health Tests ==

#[tokio::test]
async fn test_sweep_endpoint_keeps_fresh_entries() {
    let origin = origin_serving_png().await;
    let (app, engine) = create_test_app().await;
    engine
        .populate(&format!("{}/img.png", origin.uri()))
        .await
        .unwrap();

    let response = post_json(&app, "/sweep", String::new()).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["removed"], 0);
    assert_eq!(json["remaining"], 1);
}

#[tokio::test]
async fn test_stats_endpoint_counts_lookups() {
    let (app, _) = create_test_app().await;

    get(&app, "/lookup?url=not-a-url").await;
    let json = body_to_json(get(&app, "/stats").await.into_body()).await;

    assert_eq!(json["misses"], 1);
    assert_eq!(json["hits"], 0);
    assert_eq!(json["hit_rate"], 0.0);
}

#[tokio::test]
async fn test_health_endpoint_reports_ready() {
    let (app, _) = create_test_app().await;

    let response = get(&app, "/health").await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["ready"], true);
}

// == Persistence Tests ==

#[tokio::test]
async fn test_entries_survive_restart() {
    let origin = origin_serving_png().await;
    let dir = TempDir::new().unwrap();
    let store_path = dir.path().join("cache.json");
    let url = format!("{}/img.png", origin.uri());

    let first = engine_on(Arc::new(JsonFileStore::new(&store_path, "image_cache")));
    first.wait_ready().await;
    let entry = first.populate(&url).await.unwrap();
    first.shutdown().await;

    let second = engine_on(Arc::new(JsonFileStore::new(&store_path, "image_cache")));
    second.wait_ready().await;

    assert_eq!(second.peek(&url), Some(entry.clone()));
    assert_eq!(second.lookup(&url), entry.value);
}
