// tests/api_http.rs
//
// HTTP-level tests for the public API Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.

use std::sync::Arc;

use serde_json::Value as Json;
use shuttle_axum::axum::{
    body::{self, Body},
    http::{header, Request, StatusCode},
    Router,
};
use tower::ServiceExt as _; // for `oneshot`

use funding_radar::api::{create_router, AppState};
use funding_radar::config::IngestConfig;
use funding_radar::ingest::types::SourceConnector;
use funding_radar::store::{FundingStore, InMemoryStore};

const BODY_LIMIT: usize = 1024 * 1024; // 1MB, safe for tests

fn test_router() -> Router {
    let connectors: Vec<Arc<dyn SourceConnector>> = Vec::new();
    let state = AppState {
        config: Arc::new(IngestConfig::default()),
        connectors: Arc::new(connectors),
        store: Arc::new(InMemoryStore::new()),
    };
    create_router(state)
}

#[tokio::test]
async fn api_health_returns_200_and_ok_body() {
    let app = test_router();

    let req = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .expect("build GET /health");

    let resp = app.oneshot(req).await.expect("oneshot /health");
    assert_eq!(resp.status(), StatusCode::OK);

    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    assert_eq!(String::from_utf8(bytes).expect("utf8").trim(), "ok");
}

#[tokio::test]
async fn api_run_with_no_connectors_completes_empty() {
    let app = test_router();

    let req = Request::builder()
        .method("POST")
        .uri("/api/ingest/run")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{}"))
        .expect("build POST /api/ingest/run");

    let resp = app.oneshot(req).await.expect("oneshot run");
    assert_eq!(resp.status(), StatusCode::OK);

    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body");
    let json: Json = serde_json::from_slice(&bytes).expect("json body");
    assert_eq!(json["status"], "COMPLETED");
    assert_eq!(json["items_processed"], 0);
    assert!(json["per_source"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn api_sources_lists_checkpoints() {
    use funding_radar::model::{SourceState, SourceType};

    let connectors: Vec<Arc<dyn SourceConnector>> = Vec::new();
    let store = Arc::new(InMemoryStore::new());
    store
        .save_source_state(SourceState::new("dealfeed-api", "DealFeed API", SourceType::Api))
        .await
        .unwrap();

    let state = AppState {
        config: Arc::new(IngestConfig::default()),
        connectors: Arc::new(connectors),
        store,
    };
    let app = create_router(state);

    let req = Request::builder()
        .method("GET")
        .uri("/api/sources")
        .body(Body::empty())
        .expect("build GET /api/sources");

    let resp = app.oneshot(req).await.expect("oneshot sources");
    assert_eq!(resp.status(), StatusCode::OK);

    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body");
    let json: Json = serde_json::from_slice(&bytes).expect("json body");
    let list = json.as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["name"], "dealfeed-api");
    assert_eq!(list[0]["historical_import_complete"], false);
}
