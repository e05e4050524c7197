// src/api.rs
//! Run-invocation surface: trigger an ingest run with optional filters, read
//! source checkpoints, and query similar deals across sources.

use std::sync::Arc;
use std::time::Duration;

use shuttle_axum::axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;

use crate::config::IngestConfig;
use crate::ingest::fanout::{self, AggregatedDeals};
use crate::ingest::orchestrator::run_ingest;
use crate::ingest::types::{IngestFilters, RunReport, SourceConnector};
use crate::model::SourceState;
use crate::store::FundingStore;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<IngestConfig>,
    pub connectors: Arc<Vec<Arc<dyn SourceConnector>>>,
    pub store: Arc<dyn FundingStore>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/ingest/run", post(trigger_run))
        .route("/api/sources", get(list_sources))
        .route("/api/similar-deals", get(similar_deals))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

async fn trigger_run(
    State(state): State<AppState>,
    Json(filters): Json<IngestFilters>,
) -> Json<RunReport> {
    let report = run_ingest(
        &state.connectors,
        Arc::clone(&state.store),
        &state.config,
        &filters,
    )
    .await;
    Json(report)
}

async fn list_sources(State(state): State<AppState>) -> Json<Vec<SourceState>> {
    let states = state.store.load_source_states().await.unwrap_or_default();
    Json(states)
}

#[derive(serde::Deserialize)]
struct SimilarQuery {
    company: String,
    #[serde(default)]
    min_score: Option<f64>,
}

async fn similar_deals(
    State(state): State<AppState>,
    Query(q): Query<SimilarQuery>,
) -> Json<AggregatedDeals> {
    let base_delay = Duration::from_millis(state.config.retry_base_delay_ms);
    let min_score = q.min_score.unwrap_or(state.config.similarity_floor);
    let agg = fanout::similar_deals(&state.connectors, base_delay, &q.company, min_score).await;
    Json(agg)
}
