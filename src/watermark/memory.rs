use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{WatermarkError, WatermarkRecord, WatermarkStore, ZERO};

/// Process-local watermark store.
#[derive(Debug, Default)]
pub struct InMemoryWatermarkStore {
    records: RwLock<HashMap<String, WatermarkRecord>>,
}

impl InMemoryWatermarkStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> WatermarkError {
    WatermarkError::Internal("watermark lock poisoned".to_string())
}

#[async_trait]
impl WatermarkStore for InMemoryWatermarkStore {
    async fn get(&self, url: &str) -> Result<DateTime<Utc>, WatermarkError> {
        let records = self.records.read().map_err(poisoned)?;
        Ok(records.get(url).map(|r| r.timestamp).unwrap_or(ZERO))
    }

    async fn set(&self, url: &str, timestamp: DateTime<Utc>) -> Result<(), WatermarkError> {
        let mut records = self.records.write().map_err(poisoned)?;
        let now = Utc::now();
        records
            .entry(url.to_string())
            .and_modify(|r| {
                r.timestamp = r.timestamp.max(timestamp);
                r.updated_at = now;
            })
            .or_insert_with(|| WatermarkRecord {
                url: url.to_string(),
                timestamp,
                updated_at: now,
            });
        Ok(())
    }

    async fn list(&self) -> Result<Vec<WatermarkRecord>, WatermarkError> {
        let records = self.records.read().map_err(poisoned)?;
        let mut all: Vec<WatermarkRecord> = records.values().cloned().collect();
        all.sort_by(|a, b| a.url.cmp(&b.url));
        Ok(all)
    }
}
