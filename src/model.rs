// src/model.rs
//! Canonical entities of the funding store plus the ephemeral record type
//! produced by source connectors.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Family a source belongs to. Archive/scrape sources are backfilled once;
/// RSS/API sources are polled forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Rss,
    Archive,
    Api,
    Scrape,
}

impl SourceType {
    /// Backfill-style sources are skipped once their historical import is done.
    pub fn is_backfill(self) -> bool {
        matches!(self, SourceType::Archive | SourceType::Scrape)
    }
}

/// Per-source checkpoint record. One per source name, upserted after every
/// batch; never deleted, only deactivated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceState {
    pub name: String,
    pub display_name: String,
    pub source_type: SourceType,
    pub cursor: Option<String>,
    pub historical_import_complete: bool,
    pub last_import_at: Option<DateTime<Utc>>,
    pub last_import_count: u64,
    pub total_rounds: u64,
    pub is_active: bool,
}

impl SourceState {
    pub fn new(name: &str, display_name: &str, source_type: SourceType) -> Self {
        Self {
            name: name.to_string(),
            display_name: display_name.to_string(),
            source_type,
            cursor: None,
            historical_import_complete: false,
            last_import_at: None,
            last_import_count: 0,
            total_rounds: 0,
            is_active: true,
        }
    }
}

/// Normalized funding stage. Free-text labels (English and French) map here
/// via [`Stage::parse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    PreSeed,
    Seed,
    SeriesA,
    SeriesB,
    SeriesC,
    SeriesD,
    Growth,
    Bridge,
    Debt,
    Grant,
    Ipo,
    Unknown,
}

impl Stage {
    /// Map a free-text stage label to a normalized stage. Several sources are
    /// French, so the common French labels are handled too.
    pub fn parse(label: &str) -> Stage {
        let l = label.trim().to_lowercase();
        let l = l.trim_start_matches("stage ").trim();
        match l {
            "pre-seed" | "preseed" | "pre seed" | "pré-amorçage" | "pre-amorçage" => {
                Stage::PreSeed
            }
            "seed" | "amorçage" | "amorcage" => Stage::Seed,
            "series a" | "série a" | "serie a" | "a" => Stage::SeriesA,
            "series b" | "série b" | "serie b" | "b" => Stage::SeriesB,
            "series c" | "série c" | "serie c" | "c" => Stage::SeriesC,
            "series d" | "série d" | "serie d" | "d" => Stage::SeriesD,
            "growth" | "late stage" | "croissance" => Stage::Growth,
            "bridge" | "pont" => Stage::Bridge,
            "debt" | "venture debt" | "dette" => Stage::Debt,
            "grant" | "subvention" => Stage::Grant,
            "ipo" | "introduction en bourse" => Stage::Ipo,
            _ => Stage::Unknown,
        }
    }

    /// Parse an optional label; `Unknown` collapses to `None` so that a junk
    /// label never blocks a stage-agreement check.
    pub fn parse_opt(label: Option<&str>) -> Option<Stage> {
        match label.map(Stage::parse) {
            Some(Stage::Unknown) | None => None,
            some => some,
        }
    }
}

/// Ephemeral record emitted by a connector. Immutable once produced and
/// consumed exactly once by the dedup engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawFundingRecord {
    pub company_name: String,
    pub amount: Option<Decimal>,
    pub currency: String,
    pub stage: Option<String>,
    pub investors: Vec<String>,
    pub lead_investor: Option<String>,
    pub date: NaiveDate,
    /// Global unique key when present; the strongest duplicate signal.
    pub source_url: Option<String>,
    pub source_name: String,
    pub description: Option<String>,
}

impl RawFundingRecord {
    /// Share of informative fields present, used as a crude quality score.
    pub fn completeness(&self) -> f32 {
        let mut have = 0u8;
        if !self.company_name.trim().is_empty() {
            have += 1;
        }
        if self.amount.is_some() {
            have += 1;
        }
        if self.stage.is_some() {
            have += 1;
        }
        if !self.investors.is_empty() {
            have += 1;
        }
        if self.source_url.is_some() {
            have += 1;
        }
        if self.description.is_some() {
            have += 1;
        }
        f32::from(have) / 6.0
    }
}

/// Canonical company row. Aliases accumulate every differently-spelled name
/// that resolved to this company.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Company {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub aliases: Vec<String>,
    pub last_round_stage: Option<Stage>,
    pub last_round_date: Option<NaiveDate>,
    pub total_raised_usd: Decimal,
    pub data_quality: f32,
}

/// Persisted funding round. Append-only: rows are never mutated after
/// creation, only the duplicate check prevents creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundingRound {
    pub id: Uuid,
    pub company_id: Uuid,
    pub amount: Option<Decimal>,
    pub amount_usd: Option<Decimal>,
    pub currency: String,
    pub stage: Option<String>,
    pub stage_normalized: Option<Stage>,
    pub investors: Vec<String>,
    pub funding_date: NaiveDate,
    pub source: String,
    pub source_url: Option<String>,
    pub is_migrated: bool,
}
