//! Command handlers for the CLI
//!
//! - `run`: poll feeds and submit new items
//! - `watermark`: inspect the watermark database

pub mod run;
pub mod watermark;

use std::sync::Arc;

use crate::config::Config;
use crate::error::Result;
use crate::watermark::SqliteWatermarkStore;

/// Open the watermark database named by the configuration, or the default
/// location when none is set.
pub fn open_watermark_store(config: &Config) -> Result<Arc<SqliteWatermarkStore>> {
    let store = match &config.storage.db_path {
        Some(path) => SqliteWatermarkStore::new_with_path(path.clone())?,
        None => SqliteWatermarkStore::new()?,
    };
    tracing::debug!(path = %store.db_path().display(), "Opened watermark database");
    Ok(Arc::new(store))
}
