// src/ingest/types.rs
//! Connector contract and the run-report types the orchestrator aggregates.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::model::{RawFundingRecord, SourceType};

/// One page of results from a connector. `next_cursor` is replayed verbatim
/// on the next call; the orchestrator never interprets it.
#[derive(Debug, Clone, Default)]
pub struct FetchPage {
    pub items: Vec<RawFundingRecord>,
    pub next_cursor: Option<String>,
    pub has_more: bool,
    pub total_estimated: Option<u64>,
}

/// Timeout/retry budget tier a connector is assigned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Internal,
    Fast,
    Slow,
}

impl Tier {
    pub fn timeout(self) -> Duration {
        match self {
            Tier::Internal => Duration::from_secs(2),
            Tier::Fast => Duration::from_secs(5),
            Tier::Slow => Duration::from_secs(10),
        }
    }

    pub fn retries(self) -> u32 {
        match self {
            Tier::Internal => 0,
            Tier::Fast => 1,
            Tier::Slow => 2,
        }
    }
}

/// Uniform interface every external source implements. Cursor format is
/// private to the connector; `fetch` must be idempotent for a given cursor;
/// a connector past its minimum-date cutoff answers `has_more: false`
/// regardless of what the underlying source still has.
#[async_trait]
pub trait SourceConnector: Send + Sync {
    fn name(&self) -> &'static str;
    fn display_name(&self) -> &'static str;
    fn source_type(&self) -> SourceType;
    fn tier(&self) -> Tier;

    fn initial_cursor(&self) -> Option<String> {
        None
    }

    async fn fetch(&self, cursor: Option<&str>) -> Result<FetchPage>;
}

/// Filters accepted by a run invocation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestFilters {
    /// Only RSS-family legacy sources.
    #[serde(default)]
    pub legacy_only: bool,
    /// Only paginated (archive/api/scrape) sources.
    #[serde(default)]
    pub paginated_only: bool,
    /// Explicit source-name subset; empty means all.
    #[serde(default)]
    pub sources: Vec<String>,
}

/// Structured error entry in a run report. Enough to diagnose which
/// source/record failed without crashing the scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestError {
    pub message: String,
    pub item_name: String,
    /// "fetch" | "extract" | "dedup" | "persist" | "checkpoint"
    pub phase: String,
    pub timestamp: DateTime<Utc>,
}

impl IngestError {
    pub fn new(phase: &str, item_name: &str, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            item_name: item_name.to_string(),
            phase: phase.to_string(),
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Completed,
    Partial,
    Failed,
}

/// Per-source outcome of one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceRunStats {
    pub source: String,
    pub batches: u32,
    pub found: u64,
    pub processed: u64,
    pub created: u64,
    pub skipped: u64,
    pub failed: u64,
    /// Source was skipped proactively (open circuit or completed backfill).
    pub skipped_source: bool,
    /// A fetch-phase failure aborted this source's remaining batches.
    pub aborted: bool,
    pub completed_backfill: bool,
    pub errors: Vec<IngestError>,
}

/// Aggregate result of one orchestrator run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub status: RunStatus,
    pub items_processed: u64,
    pub items_created: u64,
    pub items_skipped: u64,
    pub items_failed: u64,
    pub duration_ms: u64,
    pub per_source: Vec<SourceRunStats>,
    pub errors: Vec<IngestError>,
}

impl RunReport {
    /// Completed when nothing failed, Failed when every attempted source
    /// aborted, Partial otherwise. Proactively skipped sources don't count.
    pub fn classify(per_source: &[SourceRunStats]) -> RunStatus {
        let attempted: Vec<_> = per_source.iter().filter(|s| !s.skipped_source).collect();
        let aborted = attempted.iter().filter(|s| s.aborted).count();
        if attempted.is_empty() || aborted == 0 {
            RunStatus::Completed
        } else if aborted == attempted.len() {
            RunStatus::Failed
        } else {
            RunStatus::Partial
        }
    }
}
