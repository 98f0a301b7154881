//! Per-feed delivery watermarks.
//!
//! A watermark is the publish time boundary below which every item of a
//! feed is considered delivered. It is the only state carried between
//! cycles and must never move backwards.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod memory;
pub mod sqlite;

pub use memory::InMemoryWatermarkStore;
pub use sqlite::SqliteWatermarkStore;

/// Watermark of a feed that has never been delivered.
pub const ZERO: DateTime<Utc> = DateTime::<Utc>::UNIX_EPOCH;

/// Watermark store failures.
#[derive(Error, Debug)]
pub enum WatermarkError {
    /// Backend failure while reading or writing a watermark.
    #[error("watermark store failure: {0}")]
    Internal(String),
}

/// A stored watermark as shown by operator commands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatermarkRecord {
    /// Feed url.
    pub url: String,
    /// Latest delivered publish time.
    pub timestamp: DateTime<Utc>,
    /// When the record was last written.
    pub updated_at: DateTime<Utc>,
}

/// Durable per-url watermark storage.
#[async_trait]
pub trait WatermarkStore: Send + Sync {
    /// Stored watermark for `url`, or [`ZERO`] when none exists.
    async fn get(&self, url: &str) -> Result<DateTime<Utc>, WatermarkError>;

    /// Create or update the watermark for `url`.
    ///
    /// Implementations keep the later of the stored and the given value.
    async fn set(&self, url: &str, timestamp: DateTime<Utc>) -> Result<(), WatermarkError>;

    /// All stored watermarks ordered by url.
    async fn list(&self) -> Result<Vec<WatermarkRecord>, WatermarkError>;
}
