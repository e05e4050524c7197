// src/ingest/scheduler.rs
//! Background scheduler: one ingest run per tick. Cadence is weekly for the
//! legacy/RSS family by default; runs are small (MAX_BATCHES_PER_RUN pages
//! per source) and resumable, so a tick interrupted by the platform's
//! execution limit just continues next tick from the saved cursors.

use std::sync::Arc;

use metrics::counter;
use tokio::task::JoinHandle;

use crate::config::IngestConfig;
use crate::store::FundingStore;

use super::orchestrator::run_ingest;
use super::types::{IngestFilters, SourceConnector};

pub fn spawn_ingest_scheduler(
    cfg: IngestConfig,
    connectors: Vec<Arc<dyn SourceConnector>>,
    store: Arc<dyn FundingStore>,
    filters: IngestFilters,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker =
            tokio::time::interval(std::time::Duration::from_secs(cfg.interval_secs));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;

            let report = run_ingest(&connectors, Arc::clone(&store), &cfg, &filters).await;

            counter!("ingest_runs_total").increment(1);
            tracing::info!(
                target: "ingest",
                status = ?report.status,
                created = report.items_created,
                skipped = report.items_skipped,
                failed = report.items_failed,
                "scheduled ingest tick"
            );
        }
    })
}
