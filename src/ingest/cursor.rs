// src/ingest/cursor.rs
//! Typed pagination cursors. Each connector family owns one cursor shape and
//! serializes it to the opaque string the checkpoint store persists — no ad
//! hoc string splitting, so a malformed stored cursor surfaces as a decode
//! error instead of a crash deep inside a connector.

use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

fn encode<T: Serialize>(cursor: &T) -> String {
    // These shapes are plain structs of integers/strings; serialization
    // cannot fail for them.
    serde_json::to_string(cursor).expect("cursor serialization")
}

fn decode<T: DeserializeOwned>(raw: &str, family: &str) -> Result<T> {
    serde_json::from_str(raw).with_context(|| format!("malformed {family} cursor: {raw}"))
}

/// Plain page-number pagination (HTML archives).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageCursor {
    pub page: u32,
}

impl PageCursor {
    pub fn first() -> Self {
        Self { page: 1 }
    }

    pub fn next(self) -> Self {
        Self {
            page: self.page + 1,
        }
    }

    pub fn encode(&self) -> String {
        encode(self)
    }

    pub fn decode(raw: &str) -> Result<Self> {
        decode(raw, "page")
    }
}

/// Composite sector × page walk ("sector:page" in the original sources),
/// modeled as a struct so the two coordinates can't be mixed up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectorPageCursor {
    pub sector: usize,
    pub page: u32,
}

impl SectorPageCursor {
    pub fn first() -> Self {
        Self { sector: 0, page: 1 }
    }

    /// Advance within the sector.
    pub fn next_page(&self) -> Self {
        Self {
            sector: self.sector,
            page: self.page + 1,
        }
    }

    /// Move to the next sector, restarting pagination.
    pub fn next_sector(&self) -> Self {
        Self {
            sector: self.sector + 1,
            page: 1,
        }
    }

    pub fn encode(&self) -> String {
        encode(self)
    }

    pub fn decode(raw: &str) -> Result<Self> {
        decode(raw, "sector-page")
    }
}

/// Offset pagination for JSON APIs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffsetCursor {
    pub offset: u64,
    pub limit: u64,
}

impl OffsetCursor {
    pub fn first(limit: u64) -> Self {
        Self { offset: 0, limit }
    }

    pub fn advance(self, fetched: u64) -> Self {
        Self {
            offset: self.offset + fetched,
            limit: self.limit,
        }
    }

    pub fn encode(&self) -> String {
        encode(self)
    }

    pub fn decode(raw: &str) -> Result<Self> {
        decode(raw, "offset")
    }
}
