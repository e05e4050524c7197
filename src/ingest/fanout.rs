// src/ingest/fanout.rs
//! Cross-connector aggregation for a single logical query ("similar deals"):
//! every applicable connector is asked concurrently, per-connector outcomes
//! are kept for diagnostics, and the merged item list is deduplicated by
//! normalized company-name key — first occurrence wins.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::model::RawFundingRecord;
use crate::normalize::identity_key;
use crate::similarity::combined_similarity;

use super::circuit;
use super::retry;
use super::types::SourceConnector;

/// Outcome of one connector's first page during a fan-out query.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectorOutcome {
    pub source: String,
    pub success: bool,
    pub latency_ms: u64,
    pub items: usize,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AggregatedDeals {
    pub outcomes: Vec<ConnectorOutcome>,
    pub deals: Vec<RawFundingRecord>,
}

/// Fetch the first page of every connector concurrently and merge.
pub async fn fan_out(
    connectors: &[Arc<dyn SourceConnector>],
    base_delay: Duration,
) -> AggregatedDeals {
    let mut handles = Vec::new();
    for connector in connectors {
        let connector = Arc::clone(connector);
        handles.push(tokio::spawn(async move {
            let name = connector.name().to_string();
            let t0 = Instant::now();

            if !circuit::allows(&name) {
                return (
                    ConnectorOutcome {
                        source: name,
                        success: false,
                        latency_ms: 0,
                        items: 0,
                        error: Some("circuit open".to_string()),
                    },
                    Vec::new(),
                );
            }

            let cursor = connector.initial_cursor();
            match retry::with_budget(connector.tier(), base_delay, || {
                connector.fetch(cursor.as_deref())
            })
            .await
            {
                Ok(page) => {
                    circuit::report_success(&name);
                    (
                        ConnectorOutcome {
                            source: name,
                            success: true,
                            latency_ms: t0.elapsed().as_millis() as u64,
                            items: page.items.len(),
                            error: None,
                        },
                        page.items,
                    )
                }
                Err(e) => {
                    circuit::report_failure(&name);
                    (
                        ConnectorOutcome {
                            source: name,
                            success: false,
                            latency_ms: t0.elapsed().as_millis() as u64,
                            items: 0,
                            error: Some(format!("{e:#}")),
                        },
                        Vec::new(),
                    )
                }
            }
        }));
    }

    let mut outcomes = Vec::new();
    let mut merged: Vec<RawFundingRecord> = Vec::new();
    let mut seen = std::collections::HashSet::new();

    for handle in handles {
        let Ok((outcome, items)) = handle.await else {
            continue;
        };
        outcomes.push(outcome);
        for item in items {
            // First occurrence wins across sources.
            if seen.insert(identity_key(&item.company_name)) {
                merged.push(item);
            }
        }
    }

    AggregatedDeals {
        outcomes,
        deals: merged,
    }
}

/// Fan out and keep only deals whose company name resembles `query`.
pub async fn similar_deals(
    connectors: &[Arc<dyn SourceConnector>],
    base_delay: Duration,
    query: &str,
    min_score: f64,
) -> AggregatedDeals {
    let mut agg = fan_out(connectors, base_delay).await;
    agg.deals
        .retain(|d| combined_similarity(&d.company_name, query) >= min_score);
    agg
}
