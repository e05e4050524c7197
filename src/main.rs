//! Funding Radar — Binary Entrypoint
//! Boots the Axum HTTP server, wires the connector set, the checkpoint
//! store, and the background ingest scheduler.

use std::sync::Arc;

use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use funding_radar::api::{create_router, AppState};
use funding_radar::config::IngestConfig;
use funding_radar::extract::build_extractor;
use funding_radar::ingest::circuit;
use funding_radar::ingest::connectors::build_connectors;
use funding_radar::ingest::scheduler::spawn_ingest_scheduler;
use funding_radar::ingest::types::IngestFilters;
use funding_radar::metrics::Metrics;
use funding_radar::store::{FundingStore, InMemoryStore};

const CHECKPOINT_PATH: &str = "state/checkpoints.json";

/// Enable compact tracing logs in development only. The shuttle runtime
/// installs its own subscriber in production, so a second init would panic.
fn enable_dev_tracing() {
    let dev_flag = std::env::var("RADAR_DEV_LOG").ok().is_some_and(|v| v == "1");

    let is_dev_env = cfg!(debug_assertions)
        || matches!(
            std::env::var("SHUTTLE_ENV")
                .unwrap_or_default()
                .to_ascii_lowercase()
                .as_str(),
            "local" | "development" | "dev"
        );

    if !(dev_flag && is_dev_env) {
        return;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("funding_radar=info,ingest=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    enable_dev_tracing();

    let config = IngestConfig::load().expect("Failed to load ingest config");
    circuit::configure(config.circuit_config());

    let store = Arc::new(InMemoryStore::with_checkpoint_file(CHECKPOINT_PATH));
    match store.load_checkpoints().await {
        Ok(n) if n > 0 => tracing::info!(sources = n, "resumed source checkpoints"),
        Ok(_) => tracing::info!("no prior checkpoints, starting clean"),
        Err(e) => tracing::warn!(error = ?e, "checkpoint load failed, starting clean"),
    }
    let store: Arc<dyn FundingStore> = store;

    let extractor = build_extractor(&config.extractor);
    let connectors = Arc::new(build_connectors(&config, extractor));

    let metrics = Metrics::init(config.max_batches_per_run);

    // Weekly cadence by default; every tick is a small resumable run.
    spawn_ingest_scheduler(
        config.clone(),
        connectors.as_ref().clone(),
        Arc::clone(&store),
        IngestFilters::default(),
    );

    let state = AppState {
        config: Arc::new(config),
        connectors,
        store,
    };
    let router = create_router(state).merge(metrics.router());

    Ok(router.into())
}
