// src/store.rs
//! Storage collaborator: the record store the pipeline writes into, plus the
//! per-source checkpoint persistence. The trait is what the dedup engine and
//! orchestrator are written against; the provided implementation is an
//! in-memory store with a JSON checkpoint file so interrupted runs resume
//! from the last saved cursor.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::model::{Company, FundingRound, SourceState};
use crate::normalize::slugify;

/// Record store with upsert semantics. Writes are keyed by slug or
/// source_url so that two sources racing to create the "same" company
/// converge instead of duplicating.
#[async_trait]
pub trait FundingStore: Send + Sync {
    async fn find_by_slug_or_alias(&self, name: &str) -> Result<Option<Company>>;
    async fn upsert_company(&self, company: Company) -> Result<Company>;
    async fn create_round(&self, round: FundingRound) -> Result<()>;
    async fn find_round_by_source_url(&self, url: &str) -> Result<Option<FundingRound>>;
    async fn find_rounds_near(
        &self,
        company_id: Uuid,
        date: NaiveDate,
        window_days: i64,
    ) -> Result<Vec<FundingRound>>;

    async fn load_source_states(&self) -> Result<Vec<SourceState>>;
    async fn save_source_state(&self, state: SourceState) -> Result<()>;
}

#[derive(Default)]
struct Inner {
    companies: HashMap<Uuid, Company>,
    slug_index: HashMap<String, Uuid>,
    rounds: Vec<FundingRound>,
    url_index: HashMap<String, Uuid>,
    sources: HashMap<String, SourceState>,
}

/// In-memory store. Checkpoints optionally persist to a JSON file after each
/// source-state save, so a fresh process picks up where the last run ended.
pub struct InMemoryStore {
    inner: Mutex<Inner>,
    checkpoint_path: Option<PathBuf>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            checkpoint_path: None,
        }
    }

    pub fn with_checkpoint_file(path: impl Into<PathBuf>) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            checkpoint_path: Some(path.into()),
        }
    }

    /// Load previously persisted source states. Missing or unreadable files
    /// start from a clean slate; a half-written file must not kill startup.
    pub async fn load_checkpoints(&self) -> Result<usize> {
        let Some(path) = &self.checkpoint_path else {
            return Ok(0);
        };
        let raw = match tokio::fs::read_to_string(path).await {
            Ok(s) => s,
            Err(_) => return Ok(0),
        };
        let states: Vec<SourceState> = match serde_json::from_str(&raw) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = ?e, path = %path.display(), "ignoring malformed checkpoint file");
                return Ok(0);
            }
        };
        let mut inner = self.inner.lock().expect("store mutex poisoned");
        let n = states.len();
        for s in states {
            inner.sources.insert(s.name.clone(), s);
        }
        Ok(n)
    }

    async fn persist_checkpoints(&self) -> Result<()> {
        let Some(path) = &self.checkpoint_path else {
            return Ok(());
        };
        let snapshot: Vec<SourceState> = {
            let inner = self.inner.lock().expect("store mutex poisoned");
            let mut v: Vec<SourceState> = inner.sources.values().cloned().collect();
            v.sort_by(|a, b| a.name.cmp(&b.name));
            v
        };
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .with_context(|| format!("creating checkpoint dir {}", dir.display()))?;
        }
        let json = serde_json::to_vec_pretty(&snapshot).context("serializing checkpoints")?;
        tokio::fs::write(path, json)
            .await
            .with_context(|| format!("writing checkpoint file {}", path.display()))?;
        Ok(())
    }

    /// Snapshot of all rounds, test/debug helper.
    pub fn rounds_snapshot(&self) -> Vec<FundingRound> {
        self.inner.lock().expect("store mutex poisoned").rounds.clone()
    }

    /// Snapshot of all companies, test/debug helper.
    pub fn companies_snapshot(&self) -> Vec<Company> {
        let inner = self.inner.lock().expect("store mutex poisoned");
        inner.companies.values().cloned().collect()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Minimum length before a slug-prefix comparison counts. Keeps "ai" from
/// matching every company starting with those letters.
const MIN_PREFIX_LEN: usize = 4;

fn prefix_match(a: &str, b: &str) -> bool {
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    short.len() >= MIN_PREFIX_LEN && long.starts_with(short)
}

#[async_trait]
impl FundingStore for InMemoryStore {
    async fn find_by_slug_or_alias(&self, name: &str) -> Result<Option<Company>> {
        let slug = slugify(name);
        if slug.is_empty() {
            return Ok(None);
        }
        let inner = self.inner.lock().expect("store mutex poisoned");

        if let Some(id) = inner.slug_index.get(&slug) {
            return Ok(inner.companies.get(id).cloned());
        }

        // Slug prefix, then alias membership.
        for company in inner.companies.values() {
            if prefix_match(&slug, &company.slug) {
                return Ok(Some(company.clone()));
            }
            if company.aliases.iter().any(|a| slugify(a) == slug) {
                return Ok(Some(company.clone()));
            }
        }
        Ok(None)
    }

    async fn upsert_company(&self, mut company: Company) -> Result<Company> {
        let mut inner = self.inner.lock().expect("store mutex poisoned");

        if inner.companies.contains_key(&company.id) {
            // Existing row: keep its slug, replace the rest.
            inner.slug_index.insert(company.slug.clone(), company.id);
            inner.companies.insert(company.id, company.clone());
            return Ok(company);
        }

        // New row: resolve slug collisions with a numeric suffix.
        if inner.slug_index.contains_key(&company.slug) {
            let base = company.slug.clone();
            let mut n = 2u32;
            while inner.slug_index.contains_key(&company.slug) {
                company.slug = format!("{base}-{n}");
                n += 1;
            }
        }
        inner.slug_index.insert(company.slug.clone(), company.id);
        inner.companies.insert(company.id, company.clone());
        Ok(company)
    }

    async fn create_round(&self, round: FundingRound) -> Result<()> {
        let mut inner = self.inner.lock().expect("store mutex poisoned");
        if let Some(url) = &round.source_url {
            // Upsert semantics on the unique key: a racing duplicate write
            // converges to a no-op instead of a second row.
            if inner.url_index.contains_key(url) {
                return Ok(());
            }
            inner.url_index.insert(url.clone(), round.id);
        }
        inner.rounds.push(round);
        Ok(())
    }

    async fn find_round_by_source_url(&self, url: &str) -> Result<Option<FundingRound>> {
        let inner = self.inner.lock().expect("store mutex poisoned");
        let Some(id) = inner.url_index.get(url) else {
            return Ok(None);
        };
        Ok(inner.rounds.iter().find(|r| r.id == *id).cloned())
    }

    async fn find_rounds_near(
        &self,
        company_id: Uuid,
        date: NaiveDate,
        window_days: i64,
    ) -> Result<Vec<FundingRound>> {
        let inner = self.inner.lock().expect("store mutex poisoned");
        Ok(inner
            .rounds
            .iter()
            .filter(|r| {
                r.company_id == company_id
                    && (r.funding_date - date).num_days().abs() <= window_days
            })
            .cloned()
            .collect())
    }

    async fn load_source_states(&self) -> Result<Vec<SourceState>> {
        let inner = self.inner.lock().expect("store mutex poisoned");
        let mut v: Vec<SourceState> = inner.sources.values().cloned().collect();
        v.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(v)
    }

    async fn save_source_state(&self, state: SourceState) -> Result<()> {
        {
            let mut inner = self.inner.lock().expect("store mutex poisoned");
            inner.sources.insert(state.name.clone(), state);
        }
        self.persist_checkpoints().await
    }
}
