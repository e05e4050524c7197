// src/ingest/connectors/eu_startups_rss.rs
//! EU-Startups funding feed. RSS items are articles, so structured fields go
//! through the extractor; the feed is a single page — no pagination, polled
//! forever.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use metrics::{counter, histogram};
use quick_xml::de::from_str;
use serde::Deserialize;
use time::{format_description::well_known::Rfc2822, OffsetDateTime, UtcOffset};

use crate::extract::DynFieldExtractor;
use crate::ingest::article_to_record;
use crate::ingest::types::{FetchPage, SourceConnector, Tier};
use crate::model::SourceType;

pub const NAME: &str = "eu-startups";
pub const FEED_URL: &str = "https://www.eu-startups.com/category/funding/feed/";

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
}

fn parse_rfc2822_date(ts: &str) -> Option<NaiveDate> {
    OffsetDateTime::parse(ts, &Rfc2822)
        .ok()
        .map(|dt| dt.to_offset(UtcOffset::UTC))
        .and_then(|dt| {
            NaiveDate::from_ymd_opt(dt.year(), u8::from(dt.month()) as u32, dt.day() as u32)
        })
}

enum Mode {
    Fixture(String),
    Http {
        url: &'static str,
        client: reqwest::Client,
    },
}

pub struct EuStartupsRssConnector {
    mode: Mode,
    extractor: DynFieldExtractor,
    min_date: NaiveDate,
}

impl EuStartupsRssConnector {
    pub fn from_fixture(xml: &str, extractor: DynFieldExtractor, min_date: NaiveDate) -> Self {
        Self {
            mode: Mode::Fixture(xml.to_string()),
            extractor,
            min_date,
        }
    }

    pub fn from_url(
        url: &'static str,
        extractor: DynFieldExtractor,
        min_date: NaiveDate,
    ) -> Self {
        let client = reqwest::Client::new();
        Self {
            mode: Mode::Http { url, client },
            extractor,
            min_date,
        }
    }

    async fn parse_feed(&self, body: &str) -> Result<FetchPage> {
        let t0 = std::time::Instant::now();
        let xml = scrub_entities_for_xml(body);
        let rss: Rss = from_str(&xml).context("parsing eu-startups rss xml")?;

        let mut items = Vec::with_capacity(rss.channel.item.len());
        for it in rss.channel.item {
            let Some(published) = it.pub_date.as_deref().and_then(parse_rfc2822_date) else {
                continue;
            };
            if published < self.min_date {
                continue;
            }
            let title = it.title.as_deref().unwrap_or_default();
            let description = it.description.as_deref().unwrap_or_default();
            if let Some(rec) = article_to_record(
                &self.extractor,
                NAME,
                title,
                description,
                it.link.clone(),
                published,
            )
            .await
            {
                items.push(rec);
            }
        }

        histogram!("ingest_parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        counter!("ingest_items_total").increment(items.len() as u64);

        Ok(FetchPage {
            items,
            next_cursor: None,
            has_more: false,
            total_estimated: None,
        })
    }
}

#[async_trait]
impl SourceConnector for EuStartupsRssConnector {
    fn name(&self) -> &'static str {
        NAME
    }

    fn display_name(&self) -> &'static str {
        "EU-Startups"
    }

    fn source_type(&self) -> SourceType {
        SourceType::Rss
    }

    fn tier(&self) -> Tier {
        Tier::Fast
    }

    async fn fetch(&self, _cursor: Option<&str>) -> Result<FetchPage> {
        match &self.mode {
            Mode::Fixture(xml) => self.parse_feed(xml).await,
            Mode::Http { url, client } => {
                let body = client
                    .get(*url)
                    .send()
                    .await
                    .context("eu-startups http get")?
                    .text()
                    .await
                    .context("eu-startups http body")?;
                self.parse_feed(&body).await
            }
        }
    }
}

fn scrub_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}
