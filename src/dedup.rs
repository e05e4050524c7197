// src/dedup.rs
//! Identity resolution: given a freshly parsed record, decide whether it is
//! an exact duplicate (skip), a new round for a known company, or a brand
//! new company. The strongest signal — source URL — is checked before any
//! fuzzy matching; company identity goes through slug/alias lookup; the
//! round-level duplicate check compares USD-normalized amounts inside a
//! ±7-day window.

use anyhow::{Context, Result};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::fx;
use crate::model::{Company, FundingRound, RawFundingRecord, Stage};
use crate::normalize::slugify;
use crate::store::FundingStore;

#[derive(Debug, Clone, Copy)]
pub struct DedupOptions {
    pub window_days: i64,
    /// Relative amount tolerance, e.g. 0.10 for "within 10%".
    pub amount_tolerance: f64,
}

impl Default for DedupOptions {
    fn default() -> Self {
        Self {
            window_days: 7,
            amount_tolerance: 0.10,
        }
    }
}

/// Outcome of resolving one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// source_url already persisted — strongest duplicate signal.
    DuplicateUrl,
    /// Same company already has a matching round in the date window.
    DuplicateRound { company_id: Uuid },
    /// Known company, genuinely new round.
    NewRound { company_id: Uuid },
    /// No matching company; both company and round were created.
    NewCompany { company_id: Uuid },
}

impl Resolution {
    pub fn created_round(self) -> bool {
        matches!(self, Resolution::NewRound { .. } | Resolution::NewCompany { .. })
    }

    pub fn is_duplicate(self) -> bool {
        matches!(self, Resolution::DuplicateUrl | Resolution::DuplicateRound { .. })
    }
}

/// Resolve a record against the store and apply the outcome (create rows,
/// update company rollups). Rounds are append-only: only the duplicate check
/// prevents row creation.
pub async fn resolve_and_apply(
    store: &dyn FundingStore,
    rec: &RawFundingRecord,
    opts: &DedupOptions,
) -> Result<Resolution> {
    // 1. Exact URL match short-circuits everything else.
    if let Some(url) = &rec.source_url {
        if store
            .find_round_by_source_url(url)
            .await
            .context("url lookup")?
            .is_some()
        {
            return Ok(Resolution::DuplicateUrl);
        }
    }

    // 2. Company identity via slug/alias lookup.
    let existing = store
        .find_by_slug_or_alias(&rec.company_name)
        .await
        .context("company lookup")?;

    let Some(company) = existing else {
        // 3. New company path.
        let company = create_company(store, rec).await?;
        create_round(store, rec, company.id).await?;
        return Ok(Resolution::NewCompany {
            company_id: company.id,
        });
    };

    // 4. Round-level duplicate check inside the date window.
    let nearby = store
        .find_rounds_near(company.id, rec.date, opts.window_days)
        .await
        .context("window lookup")?;
    if nearby.iter().any(|r| is_duplicate_round(rec, r, opts)) {
        return Ok(Resolution::DuplicateRound {
            company_id: company.id,
        });
    }

    let company_id = company.id;
    create_round(store, rec, company_id).await?;
    update_company_rollup(store, company, rec).await?;
    Ok(Resolution::NewRound { company_id })
}

fn usd_amount(amount: Option<Decimal>, currency: &str) -> Option<Decimal> {
    amount.and_then(|a| fx::to_usd(a, currency))
}

fn stages_agree(a: Option<Stage>, b: Option<Stage>) -> bool {
    match (a, b) {
        (Some(x), Some(y)) => x == y,
        // A missing stage on either side never blocks an amount match.
        _ => true,
    }
}

/// Two records describe the same round when their USD amounts are within
/// tolerance and stages don't disagree, or when an amount is unknown but
/// both stages are known and equal.
pub fn is_duplicate_round(
    rec: &RawFundingRecord,
    existing: &FundingRound,
    opts: &DedupOptions,
) -> bool {
    let rec_stage = Stage::parse_opt(rec.stage.as_deref());
    let ex_stage = existing.stage_normalized;

    let rec_usd = usd_amount(rec.amount, &rec.currency);
    let ex_usd = existing
        .amount_usd
        .or_else(|| usd_amount(existing.amount, &existing.currency));

    // Same-currency fallback when the FX table doesn't know the currency.
    let pair = match (rec_usd, ex_usd) {
        (Some(a), Some(b)) => Some((a, b)),
        _ => match (rec.amount, existing.amount) {
            (Some(a), Some(b))
                if rec.currency.eq_ignore_ascii_case(&existing.currency) =>
            {
                Some((a, b))
            }
            _ => None,
        },
    };

    match pair {
        Some((a, b)) => {
            let max = a.max(b);
            if max.is_zero() {
                return false;
            }
            let ratio = (a - b).abs() / max;
            let tolerance =
                Decimal::from_f64(opts.amount_tolerance).unwrap_or_else(|| Decimal::new(1, 1));
            ratio <= tolerance && stages_agree(rec_stage, ex_stage)
        }
        // Amount unknown on a side: only an exact known-stage agreement
        // counts as a duplicate.
        None => matches!((rec_stage, ex_stage), (Some(x), Some(y)) if x == y),
    }
}

async fn create_company(store: &dyn FundingStore, rec: &RawFundingRecord) -> Result<Company> {
    let name = rec.company_name.trim().to_string();
    let usd = usd_amount(rec.amount, &rec.currency);
    let company = Company {
        id: Uuid::new_v4(),
        slug: slugify(&name),
        name,
        aliases: Vec::new(),
        last_round_stage: Stage::parse_opt(rec.stage.as_deref()),
        last_round_date: Some(rec.date),
        total_raised_usd: usd.unwrap_or(Decimal::ZERO),
        data_quality: rec.completeness(),
    };
    store.upsert_company(company).await.context("create company")
}

async fn create_round(
    store: &dyn FundingStore,
    rec: &RawFundingRecord,
    company_id: Uuid,
) -> Result<()> {
    let round = FundingRound {
        id: Uuid::new_v4(),
        company_id,
        amount: rec.amount,
        amount_usd: usd_amount(rec.amount, &rec.currency),
        currency: rec.currency.clone(),
        stage: rec.stage.clone(),
        stage_normalized: Stage::parse_opt(rec.stage.as_deref()),
        investors: rec.investors.clone(),
        funding_date: rec.date,
        source: rec.source_name.clone(),
        source_url: rec.source_url.clone(),
        is_migrated: false,
    };
    store.create_round(round).await.context("create round")
}

async fn update_company_rollup(
    store: &dyn FundingStore,
    mut company: Company,
    rec: &RawFundingRecord,
) -> Result<()> {
    let incoming = rec.company_name.trim();
    if incoming != company.name && !company.aliases.iter().any(|a| a == incoming) {
        company.aliases.push(incoming.to_string());
    }

    if company.last_round_date.map_or(true, |d| rec.date >= d) {
        company.last_round_date = Some(rec.date);
        if let Some(stage) = Stage::parse_opt(rec.stage.as_deref()) {
            company.last_round_stage = Some(stage);
        }
    }

    if let Some(usd) = usd_amount(rec.amount, &rec.currency) {
        company.total_raised_usd += usd;
    }
    company.data_quality = company.data_quality.max(rec.completeness());

    store.upsert_company(company).await.context("update company")?;
    Ok(())
}
