// src/ingest/connectors/frenchweb_archive.rs
//! FrenchWeb deal-archive backfill. The archive is browsed sector by sector,
//! each sector paginated newest-first, so the cursor is the composite
//! sector × page position. Listing entries carry structured data attributes;
//! no extractor involved.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use metrics::{counter, histogram};
use once_cell::sync::OnceCell;
use regex::Regex;
use rust_decimal::Decimal;

use crate::ingest::cursor::SectorPageCursor;
use crate::ingest::types::{FetchPage, SourceConnector, Tier};
use crate::model::{RawFundingRecord, SourceType};
use crate::normalize::normalize_text;

pub const NAME: &str = "frenchweb-archive";
pub const BASE_URL: &str = "https://www.frenchweb.fr/levees-de-fonds";

/// Sector slugs browsed in order during backfill.
pub const SECTORS: &[&str] = &["fintech", "healthtech", "saas", "deeptech"];

enum Mode {
    /// `pages[sector][page - 1]` — listing bodies per sector.
    Fixture(Vec<Vec<String>>),
    Http {
        base: &'static str,
        client: reqwest::Client,
    },
}

pub struct FrenchwebArchiveConnector {
    mode: Mode,
    min_date: NaiveDate,
}

fn re_entry() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?s)<article class="deal"(?P<attrs>[^>]*)>(?P<body>.*?)</article>"#).unwrap()
    })
}

fn re_attr() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r#"data-([a-z]+)="([^"]*)""#).unwrap())
}

fn attr(attrs: &str, name: &str) -> Option<String> {
    re_attr()
        .captures_iter(attrs)
        .find(|c| &c[1] == name)
        .map(|c| c[2].to_string())
}

fn re_investors() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r#"<p class="investors">([^<]*)</p>"#).unwrap())
}

impl FrenchwebArchiveConnector {
    pub fn from_fixture(pages: Vec<Vec<String>>, min_date: NaiveDate) -> Self {
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

    /// Listing body for one sector/page; `None` past the end of a sector.
    async fn page_body(&self, cur: &SectorPageCursor) -> Result<Option<String>> {
        match &self.mode {
            Mode::Fixture(pages) => Ok(pages
                .get(cur.sector)
                .and_then(|sector| sector.get((cur.page - 1) as usize))
                .cloned()),
            Mode::Http { base, client } => {
                let sector = SECTORS.get(cur.sector).copied().unwrap_or_default();
                let url = format!("{base}/{sector}/page/{}", cur.page);
                let resp = client.get(&url).send().await.context("archive http get")?;
                if resp.status() == reqwest::StatusCode::NOT_FOUND {
                    return Ok(None);
                }
                let body = resp
                    .error_for_status()
                    .context("archive http status")?
                    .text()
                    .await
                    .context("archive http body")?;
                Ok(Some(body))
            }
        }
    }

    fn parse_listing(&self, body: &str) -> Vec<RawFundingRecord> {
        let t0 = std::time::Instant::now();
        let mut out = Vec::new();

        for caps in re_entry().captures_iter(body) {
            let attrs = &caps["attrs"];
            let entry_body = &caps["body"];

            let Some(company) = attr(attrs, "company").filter(|c| !c.is_empty()) else {
                continue;
            };
            let Some(date) = attr(attrs, "date")
                .and_then(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok())
            else {
                continue;
            };

            let amount = attr(attrs, "amount").and_then(|a| a.parse::<Decimal>().ok());
            let currency = attr(attrs, "currency").unwrap_or_else(|| "EUR".to_string());
            let stage = attr(attrs, "stage").filter(|s| !s.is_empty());
            let url = attr(attrs, "url").filter(|u| !u.is_empty());

            let investors = re_investors()
                .captures(entry_body)
                .map(|c| {
                    c[1].split(',')
                        .map(|i| normalize_text(i))
                        .filter(|i| !i.is_empty())
                        .collect()
                })
                .unwrap_or_default();

            out.push(RawFundingRecord {
                company_name: normalize_text(&company),
                amount,
                currency,
                stage,
                investors,
                lead_investor: None,
                date,
                source_url: url,
                source_name: NAME.to_string(),
                description: None,
            });
        }

        histogram!("ingest_parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        counter!("ingest_items_total").increment(out.len() as u64);
        out
    }
}

#[async_trait]
impl SourceConnector for FrenchwebArchiveConnector {
    fn name(&self) -> &'static str {
        NAME
    }

    fn display_name(&self) -> &'static str {
        "FrenchWeb Archive"
    }

    fn source_type(&self) -> SourceType {
        SourceType::Archive
    }

    fn tier(&self) -> Tier {
        Tier::Slow
    }

    fn initial_cursor(&self) -> Option<String> {
        Some(SectorPageCursor::first().encode())
    }

    async fn fetch(&self, cursor: Option<&str>) -> Result<FetchPage> {
        let cur = match cursor {
            Some(raw) => SectorPageCursor::decode(raw)?,
            None => SectorPageCursor::first(),
        };

        let body = self.page_body(&cur).await?;
        let items = body.as_deref().map(|b| self.parse_listing(b)).unwrap_or_default();

        // Sector exhausted: move on, or finish after the last sector.
        if items.is_empty() {
            return Ok(if cur.sector + 1 < SECTORS.len() {
                FetchPage {
                    items: Vec::new(),
                    next_cursor: Some(cur.next_sector().encode()),
                    has_more: true,
                    total_estimated: None,
                }
            } else {
                FetchPage::default()
            });
        }

        // Minimum-date cutoff: pages are newest-first, so one old item means
        // everything deeper is older still.
        let hit_cutoff = items.iter().any(|r| r.date < self.min_date);
        let items: Vec<RawFundingRecord> =
            items.into_iter().filter(|r| r.date >= self.min_date).collect();

        if hit_cutoff {
            return Ok(FetchPage {
                items,
                next_cursor: None,
                has_more: false,
                total_estimated: None,
            });
        }

        Ok(FetchPage {
            items,
            next_cursor: Some(cur.next_page().encode()),
            has_more: true,
            total_estimated: None,
        })
    }
}
