// tests/dedup_engine.rs
// Identity-resolution behavior against the in-memory store: URL duplicates,
// the amount-tolerance boundary, and the two-source "same round, different
// spelling" scenario.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use funding_radar::dedup::{resolve_and_apply, DedupOptions, Resolution};
use funding_radar::model::RawFundingRecord;
use funding_radar::store::InMemoryStore;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn record(name: &str, amount: i64, date: NaiveDate) -> RawFundingRecord {
    RawFundingRecord {
        company_name: name.to_string(),
        amount: Some(Decimal::new(amount, 0)),
        currency: "USD".into(),
        stage: Some("Seed".into()),
        investors: vec!["Some Fund".into()],
        lead_investor: None,
        date,
        source_url: None,
        source_name: "test-source".into(),
        description: None,
    }
}

#[tokio::test]
async fn first_record_creates_company_and_round() {
    let store = InMemoryStore::new();
    let res = resolve_and_apply(&store, &record("Acme", 1_000_000, d(2024, 5, 1)), &DedupOptions::default())
        .await
        .unwrap();
    assert!(matches!(res, Resolution::NewCompany { .. }));
    assert_eq!(store.companies_snapshot().len(), 1);
    assert_eq!(store.rounds_snapshot().len(), 1);
}

#[tokio::test]
async fn identical_source_url_is_always_a_duplicate() {
    let store = InMemoryStore::new();
    let mut first = record("Acme", 1_000_000, d(2024, 5, 1));
    first.source_url = Some("https://example.test/acme-seed".into());
    resolve_and_apply(&store, &first, &DedupOptions::default())
        .await
        .unwrap();

    // Same URL, wildly different fields: still a duplicate.
    let mut second = record("Totally Different Co", 99_000_000, d(2025, 1, 1));
    second.stage = Some("Series C".into());
    second.source_url = Some("https://example.test/acme-seed".into());
    let res = resolve_and_apply(&store, &second, &DedupOptions::default())
        .await
        .unwrap();
    assert_eq!(res, Resolution::DuplicateUrl);
    assert_eq!(store.rounds_snapshot().len(), 1);
}

#[tokio::test]
async fn tolerance_boundary_within_ten_percent_is_duplicate() {
    let store = InMemoryStore::new();
    let opts = DedupOptions::default();
    resolve_and_apply(&store, &record("Acme", 10_000_000, d(2024, 5, 1)), &opts)
        .await
        .unwrap();

    // 9.5M vs 10M, 5% apart, 3 days later, same stage -> duplicate.
    let res = resolve_and_apply(&store, &record("Acme", 9_500_000, d(2024, 5, 4)), &opts)
        .await
        .unwrap();
    assert!(res.is_duplicate());
    assert_eq!(store.rounds_snapshot().len(), 1);

    // 8M vs 10M, 20% apart -> a distinct round.
    let res = resolve_and_apply(&store, &record("Acme", 8_000_000, d(2024, 5, 4)), &opts)
        .await
        .unwrap();
    assert!(matches!(res, Resolution::NewRound { .. }));
    assert_eq!(store.rounds_snapshot().len(), 2);
}

#[tokio::test]
async fn window_bounds_the_duplicate_check() {
    let store = InMemoryStore::new();
    let opts = DedupOptions::default();
    resolve_and_apply(&store, &record("Acme", 10_000_000, d(2024, 5, 1)), &opts)
        .await
        .unwrap();

    // Identical amount but 30 days later: outside the window, new round.
    let res = resolve_and_apply(&store, &record("Acme", 10_000_000, d(2024, 5, 31)), &opts)
        .await
        .unwrap();
    assert!(matches!(res, Resolution::NewRound { .. }));
}

#[tokio::test]
async fn two_sources_one_company_one_round() {
    let store = InMemoryStore::new();
    let opts = DedupOptions::default();

    // Source A.
    let mut a = record("Foo", 1_000_000, d(2024, 5, 1));
    a.source_url = Some("https://a.example/u1".into());
    a.source_name = "source-a".into();
    let res_a = resolve_and_apply(&store, &a, &opts).await.unwrap();
    assert!(matches!(res_a, Resolution::NewCompany { .. }));

    // Source B, different spelling, amount within 10%, two days later.
    let mut b = record("Foo Inc", 1_050_000, d(2024, 5, 3));
    b.source_url = Some("https://b.example/u2".into());
    b.source_name = "source-b".into();
    let res_b = resolve_and_apply(&store, &b, &opts).await.unwrap();
    assert!(res_b.is_duplicate(), "fuzzy match should classify as duplicate");

    let companies = store.companies_snapshot();
    assert_eq!(companies.len(), 1);
    assert_eq!(companies[0].slug, "foo");
    assert_eq!(store.rounds_snapshot().len(), 1);
}

#[tokio::test]
async fn alias_accumulates_on_new_round() {
    let store = InMemoryStore::new();
    let opts = DedupOptions::default();
    resolve_and_apply(&store, &record("Acme", 1_000_000, d(2024, 1, 10)), &opts)
        .await
        .unwrap();

    // Same company, clearly different round (far apart in time).
    let mut later = record("Acme SAS", 5_000_000, d(2024, 9, 20));
    later.stage = Some("Series A".into());
    let res = resolve_and_apply(&store, &later, &opts).await.unwrap();
    assert!(matches!(res, Resolution::NewRound { .. }));

    let companies = store.companies_snapshot();
    assert_eq!(companies.len(), 1);
    assert!(companies[0].aliases.iter().any(|a| a == "Acme SAS"));
    assert_eq!(
        companies[0].total_raised_usd,
        Decimal::new(6_000_000, 0)
    );
}
