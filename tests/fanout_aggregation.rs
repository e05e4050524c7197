// tests/fanout_aggregation.rs
// Cross-connector aggregation: concurrent first-page fetches, per-connector
// outcomes, and first-occurrence-wins dedup on the merged list.

use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::sync::Arc;

use funding_radar::ingest::fanout::{fan_out, similar_deals};
use funding_radar::ingest::types::{FetchPage, SourceConnector, Tier};
use funding_radar::model::{RawFundingRecord, SourceType};

fn record(name: &str, source: &str) -> RawFundingRecord {
    RawFundingRecord {
        company_name: name.to_string(),
        amount: Some(Decimal::new(3_000_000, 0)),
        currency: "EUR".into(),
        stage: None,
        investors: vec![],
        lead_investor: None,
        date: NaiveDate::from_ymd_opt(2024, 4, 2).unwrap(),
        source_url: None,
        source_name: source.to_string(),
        description: None,
    }
}

struct OnePage {
    name: &'static str,
    items: Vec<RawFundingRecord>,
    fail: bool,
}

#[async_trait]
impl SourceConnector for OnePage {
    fn name(&self) -> &'static str {
        self.name
    }
    fn display_name(&self) -> &'static str {
        self.name
    }
    fn source_type(&self) -> SourceType {
        SourceType::Api
    }
    fn tier(&self) -> Tier {
        Tier::Internal
    }

    async fn fetch(&self, _cursor: Option<&str>) -> Result<FetchPage> {
        if self.fail {
            return Err(anyhow!("unreachable host"));
        }
        Ok(FetchPage {
            items: self.items.clone(),
            next_cursor: None,
            has_more: false,
            total_estimated: None,
        })
    }
}

#[tokio::test]
async fn merged_list_dedups_by_normalized_name_first_wins() {
    let connectors: Vec<Arc<dyn SourceConnector>> = vec![
        Arc::new(OnePage {
            name: "agg-a",
            items: vec![record("Qonto", "agg-a"), record("Alan", "agg-a")],
            fail: false,
        }),
        Arc::new(OnePage {
            name: "agg-b",
            // "  qonto " normalizes to the same identity key.
            items: vec![record("  qonto ", "agg-b"), record("Swile", "agg-b")],
            fail: false,
        }),
    ];

    let agg = fan_out(&connectors, Duration::from_millis(1)).await;

    assert_eq!(agg.outcomes.len(), 2);
    assert!(agg.outcomes.iter().all(|o| o.success));
    assert_eq!(agg.deals.len(), 3);

    // First occurrence wins: Qonto comes from source agg-a.
    let qonto = agg.deals.iter().find(|d| d.company_name.trim().eq_ignore_ascii_case("qonto")).unwrap();
    assert_eq!(qonto.source_name, "agg-a");
}

#[tokio::test]
async fn failed_connector_is_reported_not_fatal() {
    let connectors: Vec<Arc<dyn SourceConnector>> = vec![
        Arc::new(OnePage {
            name: "agg-ok",
            items: vec![record("Mirakl", "agg-ok")],
            fail: false,
        }),
        Arc::new(OnePage {
            name: "agg-broken",
            items: vec![],
            fail: true,
        }),
    ];

    let agg = fan_out(&connectors, Duration::from_millis(1)).await;

    let broken = agg.outcomes.iter().find(|o| o.source == "agg-broken").unwrap();
    assert!(!broken.success);
    assert!(broken.error.as_deref().unwrap().contains("unreachable"));
    assert_eq!(agg.deals.len(), 1);
}

#[tokio::test]
async fn similar_deals_filters_by_name_score() {
    let connectors: Vec<Arc<dyn SourceConnector>> = vec![Arc::new(OnePage {
        name: "agg-sim",
        items: vec![record("Dataiku SAS", "agg-sim"), record("Mirakl", "agg-sim")],
        fail: false,
    })];

    let agg = similar_deals(&connectors, Duration::from_millis(1), "Dataiku", 0.8).await;
    assert_eq!(agg.deals.len(), 1);
    assert_eq!(agg.deals[0].company_name, "Dataiku SAS");
}
