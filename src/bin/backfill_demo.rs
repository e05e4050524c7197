//! Demo that drives one resumable ingest run over fixture connectors and
//! prints the aggregate report (no network, no checkpoint file).

use std::sync::Arc;

use chrono::NaiveDate;

use funding_radar::config::IngestConfig;
use funding_radar::ingest::connectors::FrenchwebArchiveConnector;
use funding_radar::ingest::orchestrator::run_ingest;
use funding_radar::ingest::types::{IngestFilters, SourceConnector};
use funding_radar::store::InMemoryStore;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_target(false).init();

    let min_date = NaiveDate::from_ymd_opt(2020, 1, 1).expect("valid date");
    let page = r#"
        <article class="deal" data-company="Qonto" data-amount="104000000" data-currency="EUR" data-stage="Série C" data-date="2021-07-09" data-url="https://example.test/qonto">
          <h2>Qonto</h2><p class="investors">DST Global, Tencent</p>
        </article>
        <article class="deal" data-company="Alan SA" data-amount="185000000" data-currency="EUR" data-stage="Série D" data-date="2021-04-19" data-url="https://example.test/alan">
          <h2>Alan</h2><p class="investors">Coatue</p>
        </article>
        <article class="deal" data-company="Vintage Deal" data-amount="500000" data-currency="EUR" data-stage="Seed" data-date="2014-02-02" data-url="https://example.test/old">
          <h2>Old</h2><p class="investors">Nobody</p>
        </article>
    "#;

    let connector: Arc<dyn SourceConnector> = Arc::new(FrenchwebArchiveConnector::from_fixture(
        vec![vec![page.to_string()]],
        min_date,
    ));

    let store = Arc::new(InMemoryStore::new());
    let cfg = IngestConfig::default();

    let report = run_ingest(
        &[connector],
        store.clone(),
        &cfg,
        &IngestFilters::default(),
    )
    .await;

    println!(
        "status={:?} processed={} created={} skipped={} failed={}",
        report.status,
        report.items_processed,
        report.items_created,
        report.items_skipped,
        report.items_failed
    );
    for c in store.companies_snapshot() {
        println!("company: {} (slug {})", c.name, c.slug);
    }

    println!("backfill-demo done");
}
