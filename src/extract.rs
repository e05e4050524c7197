// src/extract.rs
//! Field-extractor collaborator: turns article text into structured funding
//! fields. The real extractor is an LLM service behind an HTTP endpoint; the
//! pipeline only depends on the trait, and ships a deterministic heuristic
//! implementation used as the default and in tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use once_cell::sync::OnceCell;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::ingest::circuit;
use crate::model::RawFundingRecord;

/// Structured fields produced by an extractor. `confidence_score` is 0-100.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedFields {
    pub company_name: String,
    pub amount: Option<Decimal>,
    pub currency: Option<String>,
    pub stage: Option<String>,
    #[serde(default)]
    pub investors: Vec<String>,
    pub lead_investor: Option<String>,
    pub date: Option<NaiveDate>,
    pub description: Option<String>,
    pub confidence_score: u8,
}

impl ParsedFields {
    /// Gate applied upstream of the dedup engine: low-confidence extractions
    /// and extractions without a company name are rejected.
    pub fn passes_gate(&self) -> bool {
        self.confidence_score >= 50 && !self.company_name.trim().is_empty()
    }

    /// Build the ephemeral record the dedup engine consumes. `fallback_date`
    /// is the article publication date, used when the extractor found none.
    pub fn into_record(
        self,
        source_name: &str,
        source_url: Option<String>,
        fallback_date: NaiveDate,
    ) -> RawFundingRecord {
        RawFundingRecord {
            company_name: self.company_name,
            amount: self.amount,
            currency: self.currency.unwrap_or_else(|| "EUR".to_string()),
            stage: self.stage,
            investors: self.investors,
            lead_investor: self.lead_investor,
            date: self.date.unwrap_or(fallback_date),
            source_url,
            source_name: source_name.to_string(),
            description: self.description,
        }
    }
}

#[async_trait]
pub trait FieldExtractor: Send + Sync {
    /// Extract funding fields from an article, or `None` when the text does
    /// not describe a funding event (or the backend is unavailable).
    async fn extract(&self, title: &str, content: &str) -> Option<ParsedFields>;
    fn name(&self) -> &'static str;
}

pub type DynFieldExtractor = Arc<dyn FieldExtractor>;

/// Extractor configuration, `[extractor]` table of `config/ingest.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    pub enabled: bool,
    /// "heuristic" | "remote"
    pub provider: Option<String>,
    pub endpoint: Option<String>,
    pub daily_limit: Option<u32>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            provider: Some("heuristic".to_string()),
            endpoint: None,
            daily_limit: Some(200),
        }
    }
}

/// Factory: build an extractor according to config and environment.
///
/// * `EXTRACTOR_TEST_MODE=heuristic` forces the deterministic extractor.
/// * `enabled = false` yields a null extractor (RSS/scrape items drop).
/// * `provider = "remote"` wraps the HTTP backend with cache + daily limit.
pub fn build_extractor(config: &ExtractorConfig) -> DynFieldExtractor {
    if std::env::var("EXTRACTOR_TEST_MODE")
        .map(|v| v == "heuristic")
        .unwrap_or(false)
    {
        return Arc::new(HeuristicExtractor);
    }

    if !config.enabled {
        return Arc::new(DisabledExtractor);
    }

    match config.provider.as_deref() {
        Some("remote") => match &config.endpoint {
            Some(url) => Arc::new(RemoteExtractor::new(
                url.clone(),
                config.daily_limit.unwrap_or(200),
            )),
            None => {
                tracing::warn!("remote extractor configured without endpoint, disabling");
                Arc::new(DisabledExtractor)
            }
        },
        _ => Arc::new(HeuristicExtractor),
    }
}

/// Null object: always refuses.
pub struct DisabledExtractor;

#[async_trait]
impl FieldExtractor for DisabledExtractor {
    async fn extract(&self, _title: &str, _content: &str) -> Option<ParsedFields> {
        None
    }
    fn name(&self) -> &'static str {
        "disabled"
    }
}

// ------------------------------------------------------------
// Heuristic extractor
// ------------------------------------------------------------

/// Deterministic regex-based extractor for the common funding-headline
/// shapes, English and French:
///   "Acme raises €5M Series A led by Iris Capital"
///   "Acme lève 5 millions d'euros auprès de Partech"
pub struct HeuristicExtractor;

fn re_amount() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?ix)
            (?P<cur>[$€£])\s?(?P<num>\d+(?:[.,]\d+)?)\s?(?P<mag>[mkb](?:illion|illions)?\b)?
            | (?P<num2>\d+(?:[.,]\d+)?)\s?(?P<mag2>million[s]?|milliard[s]?|[mkb]\b)\s*(?:de\s+|d')?(?P<cur2>euros?|dollars?|pounds?|€|\$|£)?",
        )
        .unwrap()
    })
}

fn re_stage() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(pre-?seed|seed|s[ée]rie[s]?\s+[a-d]\b|growth|bridge|amor[çc]age|venture debt|grant|ipo)")
            .unwrap()
    })
}

fn re_verb() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\s+(raises|raised|secures|secured|lands|closes|nets|l[èe]ve|obtient|boucle)\s+")
            .unwrap()
    })
}

fn magnitude(mag: &str) -> Decimal {
    match mag.to_ascii_lowercase().chars().next() {
        Some('k') => Decimal::new(1_000, 0),
        Some('b') => Decimal::new(1_000_000_000, 0),
        // "m", "million", "millions" ("milliard" never reaches here).
        _ => Decimal::new(1_000_000, 0),
    }
}

fn parse_amount(text: &str) -> Option<(Decimal, String)> {
    let caps = re_amount().captures(text)?;
    let (num, mag, cur) = if let Some(n) = caps.name("num") {
        (
            n.as_str(),
            caps.name("mag").map(|m| m.as_str()).unwrap_or(""),
            caps.name("cur").map(|c| c.as_str()).unwrap_or(""),
        )
    } else {
        (
            caps.name("num2")?.as_str(),
            caps.name("mag2").map(|m| m.as_str()).unwrap_or(""),
            caps.name("cur2").map(|c| c.as_str()).unwrap_or(""),
        )
    };

    let base: Decimal = num.replace(',', ".").parse().ok()?;
    let mult = if mag.is_empty() {
        Decimal::ONE
    } else if mag.to_ascii_lowercase().starts_with("milliard") {
        Decimal::new(1_000_000_000, 0)
    } else {
        magnitude(mag)
    };

    let currency = match cur.to_ascii_lowercase().as_str() {
        "$" | "dollar" | "dollars" => "USD",
        "£" | "pound" | "pounds" => "GBP",
        // Bare amounts on European sources default to euros.
        _ => "EUR",
    };

    Some((base * mult, currency.to_string()))
}

fn split_investors(s: &str) -> Vec<String> {
    s.split(|c| c == ',' || c == '&')
        .flat_map(|part| part.split(" and "))
        .flat_map(|part| part.split(" et "))
        .map(|p| p.trim().trim_end_matches('.').trim())
        .filter(|p| !p.is_empty() && p.len() < 60)
        .map(str::to_string)
        .collect()
}

#[async_trait]
impl FieldExtractor for HeuristicExtractor {
    async fn extract(&self, title: &str, content: &str) -> Option<ParsedFields> {
        let text = format!("{title}. {content}");

        let verb = re_verb().find(&text)?;
        let company_name = title[..verb.start().min(title.len())].trim().to_string();

        let amount_cur = parse_amount(&text);
        let stage = re_stage().find(&text).map(|m| m.as_str().to_string());

        static RE_LED: OnceCell<Regex> = OnceCell::new();
        let re_led = RE_LED.get_or_init(|| {
            Regex::new(r"(?i)(?:led by|men[ée] par)\s+(?P<lead>.+?)(?:\s+with\b|\s+avec\b|,|\.|$)")
                .unwrap()
        });
        let lead_investor = re_led
            .captures(&text)
            .map(|c| c["lead"].trim().to_string());

        static RE_FROM: OnceCell<Regex> = OnceCell::new();
        let re_from = RE_FROM.get_or_init(|| {
            Regex::new(r"(?i)(?:from|with participation from|aupr[èe]s de)\s+(?P<inv>[^.]+)")
                .unwrap()
        });
        let mut investors = re_from
            .captures(&text)
            .map(|c| split_investors(&c["inv"]))
            .unwrap_or_default();
        if let Some(lead) = &lead_investor {
            if !investors.iter().any(|i| i == lead) {
                investors.insert(0, lead.clone());
            }
        }

        let mut confidence: u8 = 40;
        if !company_name.is_empty() {
            confidence += 20;
        }
        if amount_cur.is_some() {
            confidence += 20;
        }
        if stage.is_some() {
            confidence += 10;
        }
        if !investors.is_empty() {
            confidence += 10;
        }

        let (amount, currency) = match amount_cur {
            Some((a, c)) => (Some(a), Some(c)),
            None => (None, None),
        };

        Some(ParsedFields {
            company_name,
            amount,
            currency,
            stage,
            investors,
            lead_investor,
            date: None,
            description: Some(content.to_string()),
            confidence_score: confidence.min(100),
        })
    }

    fn name(&self) -> &'static str {
        "heuristic"
    }
}

// ------------------------------------------------------------
// Remote extractor (HTTP backend + cache + daily limit)
// ------------------------------------------------------------

/// HTTP-backed extractor. Responses are cached by input hash and calls are
/// capped per day; the backend sits behind its own named circuit so a broken
/// extractor never takes the fetch pipeline down with it.
pub struct RemoteExtractor {
    http: reqwest::Client,
    endpoint: String,
    daily_limit: u32,
    calls_today: AtomicU32,
    cache: Mutex<HashMap<String, Option<ParsedFields>>>,
}

pub const EXTRACTOR_CIRCUIT: &str = "extractor";

impl RemoteExtractor {
    pub fn new(endpoint: String, daily_limit: u32) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("funding-radar/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self {
            http,
            endpoint,
            daily_limit,
            calls_today: AtomicU32::new(0),
            cache: Mutex::new(HashMap::new()),
        }
    }

    fn cache_key(title: &str, content: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(title.as_bytes());
        hasher.update(b"\x1f");
        hasher.update(content.as_bytes());
        let digest = hasher.finalize();
        let mut out = String::with_capacity(32);
        for b in digest.iter().take(16) {
            use std::fmt::Write as _;
            let _ = write!(&mut out, "{b:02x}");
        }
        out
    }
}

#[derive(Serialize)]
struct ExtractRequest<'a> {
    title: &'a str,
    content: &'a str,
}

#[async_trait]
impl FieldExtractor for RemoteExtractor {
    async fn extract(&self, title: &str, content: &str) -> Option<ParsedFields> {
        let key = Self::cache_key(title, content);
        if let Some(hit) = self
            .cache
            .lock()
            .expect("extractor cache mutex poisoned")
            .get(&key)
        {
            return hit.clone();
        }

        if !circuit::allows(EXTRACTOR_CIRCUIT) {
            tracing::debug!("extractor circuit open, skipping call");
            return None;
        }
        if self.calls_today.fetch_add(1, Ordering::Relaxed) >= self.daily_limit {
            tracing::warn!("extractor daily limit reached");
            return None;
        }

        let resp = self
            .http
            .post(&self.endpoint)
            .json(&ExtractRequest { title, content })
            .send()
            .await;

        let fields: Option<ParsedFields> = match resp {
            Ok(r) if r.status().is_success() => match r.json().await {
                Ok(f) => {
                    circuit::report_success(EXTRACTOR_CIRCUIT);
                    Some(f)
                }
                Err(e) => {
                    tracing::warn!(error = ?e, "extractor returned unparseable body");
                    circuit::report_failure(EXTRACTOR_CIRCUIT);
                    None
                }
            },
            Ok(r) => {
                tracing::warn!(status = %r.status(), "extractor http error");
                circuit::report_failure(EXTRACTOR_CIRCUIT);
                None
            }
            Err(e) => {
                tracing::warn!(error = ?e, "extractor request failed");
                circuit::report_failure(EXTRACTOR_CIRCUIT);
                None
            }
        };

        self.cache
            .lock()
            .expect("extractor cache mutex poisoned")
            .insert(key, fields.clone());
        fields
    }

    fn name(&self) -> &'static str {
        "remote"
    }
}
