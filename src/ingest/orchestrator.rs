// src/ingest/orchestrator.rs
//! Parallel fetch orchestrator. Fans one task out per connector, walks each
//! source's pagination sequentially under its tier budget, feeds items
//! through the dedup engine, and persists cursors so the next run resumes
//! where this one stopped.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use metrics::{counter, gauge, histogram};

use crate::config::IngestConfig;
use crate::dedup::{self, DedupOptions};
use crate::model::{SourceState, SourceType};
use crate::store::FundingStore;

use super::circuit;
use super::retry;
use super::types::{IngestError, IngestFilters, RunReport, SourceConnector, SourceRunStats};
use super::ensure_metrics_described;

fn selected<'a>(
    connectors: &'a [Arc<dyn SourceConnector>],
    filters: &IngestFilters,
) -> Vec<&'a Arc<dyn SourceConnector>> {
    connectors
        .iter()
        .filter(|c| {
            if filters.legacy_only && c.source_type() != SourceType::Rss {
                return false;
            }
            if filters.paginated_only && c.source_type() == SourceType::Rss {
                return false;
            }
            if !filters.sources.is_empty()
                && !filters.sources.iter().any(|s| s == c.name())
            {
                return false;
            }
            true
        })
        .collect()
}

/// One run of the pipeline. Pagination is sequential per source (cursors
/// depend on the prior response); different sources run concurrently.
pub async fn run_ingest(
    connectors: &[Arc<dyn SourceConnector>],
    store: Arc<dyn FundingStore>,
    cfg: &IngestConfig,
    filters: &IngestFilters,
) -> RunReport {
    ensure_metrics_described();
    let t0 = Instant::now();

    let known: HashMap<String, SourceState> = store
        .load_source_states()
        .await
        .unwrap_or_default()
        .into_iter()
        .map(|s| (s.name.clone(), s))
        .collect();

    let dedup_opts = DedupOptions {
        window_days: cfg.dedup_window_days,
        amount_tolerance: cfg.amount_tolerance,
    };
    let base_delay = Duration::from_millis(cfg.retry_base_delay_ms);

    let mut handles = Vec::new();
    for connector in selected(connectors, filters) {
        let connector = Arc::clone(connector);
        let store = Arc::clone(&store);
        let state = known.get(connector.name()).cloned().unwrap_or_else(|| {
            SourceState::new(
                connector.name(),
                connector.display_name(),
                connector.source_type(),
            )
        });
        let max_batches = cfg.max_batches_per_run;
        handles.push(tokio::spawn(async move {
            run_source(connector, store, state, max_batches, base_delay, dedup_opts).await
        }));
    }

    let mut per_source = Vec::new();
    let mut checkpoint_errors = Vec::new();
    for handle in handles {
        match handle.await {
            Ok((stats, state, dirty)) => {
                if dirty {
                    if let Err(e) = store.save_source_state(state).await {
                        tracing::warn!(error = ?e, source = %stats.source, "checkpoint save failed");
                        checkpoint_errors.push(IngestError::new(
                            "checkpoint",
                            &stats.source,
                            format!("{e:#}"),
                        ));
                    }
                }
                per_source.push(stats);
            }
            Err(e) => {
                // A panicked source task is a source failure, not a run crash.
                tracing::error!(error = ?e, "source task panicked");
            }
        }
    }

    let status = RunReport::classify(&per_source);
    let mut errors: Vec<IngestError> = per_source
        .iter()
        .flat_map(|s| s.errors.iter().cloned())
        .collect();
    errors.extend(checkpoint_errors);

    let report = RunReport {
        status,
        items_processed: per_source.iter().map(|s| s.processed).sum(),
        items_created: per_source.iter().map(|s| s.created).sum(),
        items_skipped: per_source.iter().map(|s| s.skipped).sum(),
        items_failed: per_source.iter().map(|s| s.failed).sum(),
        duration_ms: t0.elapsed().as_millis() as u64,
        per_source,
        errors,
    };

    counter!("ingest_created_total").increment(report.items_created);
    counter!("ingest_skipped_total").increment(report.items_skipped);
    counter!("ingest_failed_total").increment(report.items_failed);
    gauge!("ingest_last_run_ts").set(chrono::Utc::now().timestamp() as f64);

    tracing::info!(
        target: "ingest",
        status = ?report.status,
        processed = report.items_processed,
        created = report.items_created,
        skipped = report.items_skipped,
        failed = report.items_failed,
        duration_ms = report.duration_ms,
        "ingest run finished"
    );

    report
}

/// Walk one source's pagination. Returns the stats, the updated checkpoint
/// state, and whether the state needs saving.
async fn run_source(
    connector: Arc<dyn SourceConnector>,
    store: Arc<dyn FundingStore>,
    mut state: SourceState,
    max_batches: u32,
    base_delay: Duration,
    dedup_opts: DedupOptions,
) -> (SourceRunStats, SourceState, bool) {
    let name = connector.name();
    let mut stats = SourceRunStats {
        source: name.to_string(),
        ..Default::default()
    };

    // Finished backfills are skipped outright on later runs.
    if state.historical_import_complete && connector.source_type().is_backfill() {
        stats.skipped_source = true;
        tracing::debug!(source = name, "backfill complete, skipping");
        return (stats, state, false);
    }

    if !circuit::allows(name) {
        stats.skipped_source = true;
        counter!("ingest_circuit_skips_total").increment(1);
        tracing::info!(
            source = name,
            phase = ?circuit::phase_of(name),
            "circuit open, skipping source"
        );
        return (stats, state, false);
    }

    let mut cursor = state.cursor.clone().or_else(|| connector.initial_cursor());
    let mut imported = 0u64;

    for _ in 0..max_batches {
        let t_batch = Instant::now();
        let page = match retry::with_budget(connector.tier(), base_delay, || {
            connector.fetch(cursor.as_deref())
        })
        .await
        {
            Ok(page) => {
                circuit::report_success(name);
                page
            }
            Err(e) => {
                // Abandon this source for the run; the saved cursor makes the
                // next scheduled run resume exactly here.
                circuit::report_failure(name);
                counter!("ingest_source_errors_total").increment(1);
                tracing::warn!(error = ?e, source = name, "batch fetch failed");
                stats.errors.push(IngestError::new("fetch", name, format!("{e:#}")));
                stats.aborted = true;
                break;
            }
        };

        stats.batches += 1;
        stats.found += page.items.len() as u64;

        for item in &page.items {
            match dedup::resolve_and_apply(store.as_ref(), item, &dedup_opts).await {
                Ok(res) => {
                    stats.processed += 1;
                    if res.created_round() {
                        stats.created += 1;
                        imported += 1;
                    } else {
                        stats.skipped += 1;
                    }
                }
                Err(e) => {
                    // Per-item errors never abort the batch.
                    stats.failed += 1;
                    stats.errors.push(IngestError::new(
                        "persist",
                        &item.company_name,
                        format!("{e:#}"),
                    ));
                }
            }
        }

        histogram!("ingest_batch_ms").record(t_batch.elapsed().as_secs_f64() * 1_000.0);

        cursor = page.next_cursor.clone();
        if !page.has_more {
            if connector.source_type().is_backfill() {
                state.historical_import_complete = true;
                stats.completed_backfill = true;
            }
            break;
        }
        if cursor.is_none() {
            break;
        }
    }

    state.cursor = cursor;
    state.last_import_at = Some(chrono::Utc::now());
    state.last_import_count = imported;
    state.total_rounds += imported;
    state.display_name = connector.display_name().to_string();
    state.is_active = true;

    (stats, state, true)
}
