// src/ingest/connectors/presswire_scrape.rs
//! PressWire funding press releases, scraped page by page. Releases are
//! free text, so records come out of the extractor; a plain page-number
//! cursor drives the walk and the minimum-date cutoff bounds it.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use metrics::{counter, histogram};
use once_cell::sync::OnceCell;
use regex::Regex;

use crate::extract::DynFieldExtractor;
use crate::ingest::article_to_record;
use crate::ingest::cursor::PageCursor;
use crate::ingest::types::{FetchPage, SourceConnector, Tier};
use crate::model::SourceType;

pub const NAME: &str = "presswire";
pub const BASE_URL: &str = "https://www.presswire.example/funding";

enum Mode {
    Fixture(Vec<String>),
    Http {
        base: &'static str,
        client: reqwest::Client,
    },
}

pub struct PresswireScrapeConnector {
    mode: Mode,
    extractor: DynFieldExtractor,
    min_date: NaiveDate,
}

fn re_release() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"(?s)<div class="release" data-date="(?P<date>[^"]+)" data-href="(?P<href>[^"]*)">\s*<h3>(?P<title>.*?)</h3>\s*<p>(?P<body>.*?)</p>"#,
        )
        .unwrap()
    })
}

impl PresswireScrapeConnector {
    pub fn from_fixture(
        pages: Vec<String>,
        extractor: DynFieldExtractor,
        min_date: NaiveDate,
    ) -> Self {
        Self {
            mode: Mode::Fixture(pages),
            extractor,
            min_date,
        }
    }

    pub fn from_url(
        base: &'static str,
        extractor: DynFieldExtractor,
        min_date: NaiveDate,
    ) -> Self {
        Self {
            mode: Mode::Http {
                base,
                client: reqwest::Client::new(),
            },
            extractor,
            min_date,
        }
    }

    async fn page_body(&self, page: u32) -> Result<Option<String>> {
        match &self.mode {
            Mode::Fixture(pages) => Ok(pages.get((page - 1) as usize).cloned()),
            Mode::Http { base, client } => {
                let url = format!("{base}?page={page}");
                let resp = client.get(&url).send().await.context("presswire http get")?;
                if resp.status() == reqwest::StatusCode::NOT_FOUND {
                    return Ok(None);
                }
                let body = resp
                    .error_for_status()
                    .context("presswire http status")?
                    .text()
                    .await
                    .context("presswire http body")?;
                Ok(Some(body))
            }
        }
    }
}

#[async_trait]
impl SourceConnector for PresswireScrapeConnector {
    fn name(&self) -> &'static str {
        NAME
    }

    fn display_name(&self) -> &'static str {
        "PressWire"
    }

    fn source_type(&self) -> SourceType {
        SourceType::Scrape
    }

    fn tier(&self) -> Tier {
        Tier::Slow
    }

    fn initial_cursor(&self) -> Option<String> {
        Some(PageCursor::first().encode())
    }

    async fn fetch(&self, cursor: Option<&str>) -> Result<FetchPage> {
        let cur = match cursor {
            Some(raw) => PageCursor::decode(raw)?,
            None => PageCursor::first(),
        };

        let Some(body) = self.page_body(cur.page).await? else {
            return Ok(FetchPage::default());
        };

        let t0 = std::time::Instant::now();
        let mut hit_cutoff = false;
        let mut releases = 0u64;
        let mut items = Vec::new();

        for caps in re_release().captures_iter(&body) {
            releases += 1;
            let Some(published) =
                NaiveDate::parse_from_str(&caps["date"], "%Y-%m-%d").ok()
            else {
                continue;
            };
            if published < self.min_date {
                hit_cutoff = true;
                continue;
            }
            let href = caps["href"].to_string();
            let url = (!href.is_empty()).then_some(href);
            if let Some(rec) = article_to_record(
                &self.extractor,
                NAME,
                &caps["title"],
                &caps["body"],
                url,
                published,
            )
            .await
            {
                items.push(rec);
            }
        }

        histogram!("ingest_parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        counter!("ingest_items_total").increment(items.len() as u64);

        // An empty listing page means the walk ran off the end.
        if releases == 0 {
            return Ok(FetchPage::default());
        }

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
            next_cursor: Some(cur.next().encode()),
            has_more: true,
            total_estimated: None,
        })
    }
}
