// src/config.rs
//! Pipeline configuration: `config/ingest.toml` with env-var overrides.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::extract::ExtractorConfig;

pub const ENV_CONFIG_PATH: &str = "INGEST_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/ingest.toml";

fn default_interval_secs() -> u64 {
    7 * 24 * 3600
}
fn default_max_batches() -> u32 {
    5
}
fn default_window_days() -> i64 {
    7
}
fn default_tolerance() -> f64 {
    0.10
}
fn default_retry_base_delay_ms() -> u64 {
    500
}
fn default_min_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2015, 1, 1).expect("valid backfill floor")
}
fn default_sources() -> Vec<String> {
    vec![
        "eu-startups".to_string(),
        "frenchweb-archive".to_string(),
        "dealfeed-api".to_string(),
        "presswire".to_string(),
    ]
}
fn default_similarity_floor() -> f64 {
    0.6
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitSettings {
    pub failure_threshold: u32,
    pub cooldown_secs: u64,
    pub success_threshold: u32,
}

impl Default for CircuitSettings {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            cooldown_secs: 120,
            success_threshold: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Scheduler cadence; weekly by default for the legacy/RSS family.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Pagination cap per source per run; small values keep a run inside the
    /// platform execution budget and lean on cursor resume instead.
    #[serde(default = "default_max_batches")]
    pub max_batches_per_run: u32,
    #[serde(default = "default_window_days")]
    pub dedup_window_days: i64,
    #[serde(default = "default_tolerance")]
    pub amount_tolerance: f64,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    /// Historical backfill floor: connectors stop once they see older items.
    #[serde(default = "default_min_date")]
    pub backfill_min_date: NaiveDate,
    #[serde(default = "default_sources")]
    pub enabled_sources: Vec<String>,
    /// Minimum combined-similarity score for the similar-deals query.
    #[serde(default = "default_similarity_floor")]
    pub similarity_floor: f64,
    #[serde(default)]
    pub circuit: CircuitSettings,
    #[serde(default)]
    pub extractor: ExtractorConfig,
}

impl Default for IngestConfig {
    fn default() -> Self {
        // serde defaults are the single source of truth.
        toml::from_str("").expect("empty config parses to defaults")
    }
}

impl IngestConfig {
    pub fn load_from(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
    }

    /// Load using `$INGEST_CONFIG_PATH`, then `config/ingest.toml`, then
    /// built-in defaults. A pointed-to-but-missing path is an error; a
    /// missing default file is not.
    pub fn load() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            return Self::load_from(&PathBuf::from(p));
        }
        let default = PathBuf::from(DEFAULT_CONFIG_PATH);
        if default.exists() {
            return Self::load_from(&default);
        }
        Ok(Self::default())
    }

    pub fn circuit_config(&self) -> crate::ingest::circuit::CircuitConfig {
        crate::ingest::circuit::CircuitConfig {
            failure_threshold: self.circuit.failure_threshold,
            cooldown: std::time::Duration::from_secs(self.circuit.cooldown_secs),
            success_threshold: self.circuit.success_threshold,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = IngestConfig::default();
        assert_eq!(cfg.max_batches_per_run, 5);
        assert_eq!(cfg.dedup_window_days, 7);
        assert!((cfg.amount_tolerance - 0.10).abs() < f64::EPSILON);
        assert_eq!(cfg.enabled_sources.len(), 4);
        assert_eq!(cfg.circuit.failure_threshold, 3);
    }

    #[test]
    fn partial_toml_overrides_only_named_fields() {
        let cfg: IngestConfig = toml::from_str(
            r#"
            max_batches_per_run = 2
            enabled_sources = ["dealfeed-api"]

            [circuit]
            failure_threshold = 5
            cooldown_secs = 60
            success_threshold = 2
            "#,
        )
        .unwrap();
        assert_eq!(cfg.max_batches_per_run, 2);
        assert_eq!(cfg.enabled_sources, vec!["dealfeed-api".to_string()]);
        assert_eq!(cfg.circuit.failure_threshold, 5);
        // untouched fields keep defaults
        assert_eq!(cfg.dedup_window_days, 7);
    }

    #[test]
    fn min_date_parses_from_toml_string() {
        let cfg: IngestConfig = toml::from_str(r#"backfill_min_date = "2018-06-01""#).unwrap();
        assert_eq!(
            cfg.backfill_min_date,
            NaiveDate::from_ymd_opt(2018, 6, 1).unwrap()
        );
    }
}
