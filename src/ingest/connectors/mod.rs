// src/ingest/connectors/mod.rs
//! Concrete source connectors. Each owns its native pagination format and a
//! fixture mode used by tests; the registry builds HTTP-mode connectors for
//! the sources enabled in config.

pub mod dealfeed_api;
pub mod eu_startups_rss;
pub mod frenchweb_archive;
pub mod presswire_scrape;

use std::sync::Arc;

use crate::config::IngestConfig;
use crate::extract::DynFieldExtractor;

use super::types::SourceConnector;

pub use dealfeed_api::DealfeedApiConnector;
pub use eu_startups_rss::EuStartupsRssConnector;
pub use frenchweb_archive::FrenchwebArchiveConnector;
pub use presswire_scrape::PresswireScrapeConnector;

/// Build the connector set for the enabled sources. Unknown names in config
/// are logged and skipped rather than failing the run.
pub fn build_connectors(
    cfg: &IngestConfig,
    extractor: DynFieldExtractor,
) -> Vec<Arc<dyn SourceConnector>> {
    let mut out: Vec<Arc<dyn SourceConnector>> = Vec::new();
    for name in &cfg.enabled_sources {
        match name.as_str() {
            eu_startups_rss::NAME => out.push(Arc::new(EuStartupsRssConnector::from_url(
                eu_startups_rss::FEED_URL,
                extractor.clone(),
                cfg.backfill_min_date,
            ))),
            frenchweb_archive::NAME => out.push(Arc::new(FrenchwebArchiveConnector::from_url(
                frenchweb_archive::BASE_URL,
                cfg.backfill_min_date,
            ))),
            dealfeed_api::NAME => out.push(Arc::new(DealfeedApiConnector::from_url(
                dealfeed_api::BASE_URL,
                cfg.backfill_min_date,
            ))),
            presswire_scrape::NAME => out.push(Arc::new(PresswireScrapeConnector::from_url(
                presswire_scrape::BASE_URL,
                extractor.clone(),
                cfg.backfill_min_date,
            ))),
            other => {
                tracing::warn!(source = other, "unknown source in config, skipping");
            }
        }
    }
    out
}
