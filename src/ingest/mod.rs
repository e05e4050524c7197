// src/ingest/mod.rs
pub mod circuit;
pub mod connectors;
pub mod cursor;
pub mod fanout;
pub mod orchestrator;
pub mod retry;
pub mod scheduler;
pub mod types;

use chrono::NaiveDate;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram};
use once_cell::sync::OnceCell;

use crate::extract::DynFieldExtractor;
use crate::model::RawFundingRecord;
use crate::normalize::normalize_text;

/// One-time metrics registration (so series show up on /metrics).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("ingest_items_total", "Items parsed from source pages.");
        describe_counter!(
            "ingest_created_total",
            "Funding rounds created by the dedup engine."
        );
        describe_counter!(
            "ingest_skipped_total",
            "Items classified as duplicates and skipped."
        );
        describe_counter!("ingest_failed_total", "Per-item pipeline failures.");
        describe_counter!(
            "ingest_extract_rejected_total",
            "Articles rejected by the extraction confidence gate."
        );
        describe_counter!(
            "ingest_source_errors_total",
            "Connector fetch failures (after retry budget)."
        );
        describe_counter!(
            "ingest_circuit_skips_total",
            "Sources skipped because their circuit was open."
        );
        describe_histogram!("ingest_batch_ms", "Per-batch fetch+process time.");
        describe_histogram!("ingest_parse_ms", "Connector parse time in milliseconds.");
        describe_gauge!(
            "ingest_last_run_ts",
            "Unix ts when the ingest orchestrator last finished a run."
        );
    });
}

/// Shared path for article-shaped sources (RSS, press-release scrapes):
/// normalize the text, run the field extractor, apply the confidence gate,
/// and shape the result into the record the dedup engine consumes.
pub(crate) async fn article_to_record(
    extractor: &DynFieldExtractor,
    source_name: &str,
    title: &str,
    content: &str,
    url: Option<String>,
    published: NaiveDate,
) -> Option<RawFundingRecord> {
    let title = normalize_text(title);
    let content = normalize_text(content);
    if title.is_empty() {
        return None;
    }

    let Some(fields) = extractor.extract(&title, &content).await else {
        return None;
    };
    if !fields.passes_gate() {
        counter!("ingest_extract_rejected_total").increment(1);
        tracing::debug!(source = source_name, title = %title, "extraction below confidence gate");
        return None;
    }

    Some(fields.into_record(source_name, url, published))
}
