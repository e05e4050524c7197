// src/ingest/connectors/dealfeed_api.rs
//! DealFeed public JSON API. Offset pagination with a server-reported total;
//! the API is polled forever for new deals, so it is never marked
//! backfill-complete.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use metrics::{counter, histogram};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::ingest::cursor::OffsetCursor;
use crate::ingest::types::{FetchPage, SourceConnector, Tier};
use crate::model::{RawFundingRecord, SourceType};
use crate::normalize::normalize_text;

pub const NAME: &str = "dealfeed-api";
pub const BASE_URL: &str = "https://api.dealfeed.io/v1/deals";

const PAGE_SIZE: u64 = 50;

#[derive(Debug, Deserialize)]
struct DealsPage {
    total: u64,
    #[serde(default)]
    deals: Vec<Deal>,
}

#[derive(Debug, Deserialize)]
struct Deal {
    company: String,
    amount: Option<Decimal>,
    #[serde(default)]
    currency: Option<String>,
    round: Option<String>,
    #[serde(default)]
    investors: Vec<String>,
    lead: Option<String>,
    date: NaiveDate,
    url: Option<String>,
    #[serde(default)]
    summary: Option<String>,
}

enum Mode {
    /// JSON bodies keyed by request offset.
    Fixture(std::collections::HashMap<u64, String>),
    Http {
        base: &'static str,
        client: reqwest::Client,
    },
}

pub struct DealfeedApiConnector {
    mode: Mode,
    min_date: NaiveDate,
}

impl DealfeedApiConnector {
    pub fn from_fixture(
        pages: std::collections::HashMap<u64, String>,
        min_date: NaiveDate,
    ) -> Self {
        Self {
            mode: Mode::Fixture(pages),
            min_date,
        }
    }

    pub fn from_url(base: &'static str, min_date: NaiveDate) -> Self {
        Self {
            mode: Mode::Http {
                base,
                client: reqwest::Client::new(),
            },
            min_date,
        }
    }

    async fn page_body(&self, cur: &OffsetCursor) -> Result<Option<String>> {
        match &self.mode {
            Mode::Fixture(pages) => Ok(pages.get(&cur.offset).cloned()),
            Mode::Http { base, client } => {
                let url = format!("{base}?offset={}&limit={}", cur.offset, cur.limit);
                let body = client
                    .get(&url)
                    .send()
                    .await
                    .context("dealfeed http get")?
                    .error_for_status()
                    .context("dealfeed http status")?
                    .text()
                    .await
                    .context("dealfeed http body")?;
                Ok(Some(body))
            }
        }
    }
}

#[async_trait]
impl SourceConnector for DealfeedApiConnector {
    fn name(&self) -> &'static str {
        NAME
    }

    fn display_name(&self) -> &'static str {
        "DealFeed API"
    }

    fn source_type(&self) -> SourceType {
        SourceType::Api
    }

    fn tier(&self) -> Tier {
        Tier::Fast
    }

    fn initial_cursor(&self) -> Option<String> {
        Some(OffsetCursor::first(PAGE_SIZE).encode())
    }

    async fn fetch(&self, cursor: Option<&str>) -> Result<FetchPage> {
        let cur = match cursor {
            Some(raw) => OffsetCursor::decode(raw)?,
            None => OffsetCursor::first(PAGE_SIZE),
        };

        let Some(body) = self.page_body(&cur).await? else {
            return Ok(FetchPage::default());
        };

        let t0 = std::time::Instant::now();
        let page: DealsPage = serde_json::from_str(&body).context("parsing dealfeed json")?;
        let fetched = page.deals.len() as u64;

        let mut hit_cutoff = false;
        let mut items = Vec::with_capacity(page.deals.len());
        for deal in page.deals {
            if deal.date < self.min_date {
                hit_cutoff = true;
                continue;
            }
            let company_name = normalize_text(&deal.company);
            if company_name.is_empty() {
                continue;
            }
            items.push(RawFundingRecord {
                company_name,
                amount: deal.amount,
                currency: deal.currency.unwrap_or_else(|| "USD".to_string()),
                stage: deal.round,
                investors: deal.investors,
                lead_investor: deal.lead,
                date: deal.date,
                source_url: deal.url,
                source_name: NAME.to_string(),
                description: deal.summary,
            });
        }

        histogram!("ingest_parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        counter!("ingest_items_total").increment(items.len() as u64);

        let next = cur.advance(fetched);
        let exhausted = fetched == 0 || next.offset >= page.total;

        Ok(FetchPage {
            items,
            next_cursor: (!exhausted && !hit_cutoff).then(|| next.encode()),
            has_more: !exhausted && !hit_cutoff,
            total_estimated: Some(page.total),
        })
    }
}
