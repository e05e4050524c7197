// tests/connectors_rss.rs
// Fixture-driven RSS connector: article extraction, confidence gating, and
// the minimum-date skip.

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use funding_radar::extract::HeuristicExtractor;
use funding_radar::ingest::connectors::EuStartupsRssConnector;
use funding_radar::ingest::types::SourceConnector;

const FEED: &str = include_str!("fixtures/eu_startups_rss.xml");

fn connector() -> EuStartupsRssConnector {
    EuStartupsRssConnector::from_fixture(
        FEED,
        Arc::new(HeuristicExtractor),
        NaiveDate::from_ymd_opt(2015, 1, 1).unwrap(),
    )
}

#[tokio::test]
async fn feed_yields_funding_records_only() {
    let page = connector().fetch(None).await.unwrap();

    // Four items in the feed: two funding articles, one summit announcement
    // (fails extraction), one pre-cutoff article (skipped by date).
    assert_eq!(page.items.len(), 2);
    assert!(!page.has_more);
    assert!(page.next_cursor.is_none());

    let qonto = page
        .items
        .iter()
        .find(|r| r.company_name == "Qonto")
        .expect("Qonto record");
    assert_eq!(qonto.amount, Some(Decimal::new(104_000_000, 0)));
    assert_eq!(qonto.currency, "EUR");
    assert_eq!(qonto.lead_investor.as_deref(), Some("DST Global"));
    assert_eq!(
        qonto.source_url.as_deref(),
        Some("https://www.eu-startups.com/2024/07/qonto-series-c/")
    );
    assert_eq!(qonto.date, NaiveDate::from_ymd_opt(2024, 7, 9).unwrap());

    let datawise = page
        .items
        .iter()
        .find(|r| r.company_name == "Datawise")
        .expect("Datawise record");
    assert_eq!(datawise.amount, Some(Decimal::new(12_000_000, 0)));
    assert!(datawise.investors.iter().any(|i| i == "Partech"));
}

#[tokio::test]
async fn fetch_is_idempotent_for_the_same_cursor() {
    let c = connector();
    let first = c.fetch(None).await.unwrap();
    let second = c.fetch(None).await.unwrap();
    assert_eq!(first.items, second.items);
}
