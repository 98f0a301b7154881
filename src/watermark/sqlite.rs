use std::path::{Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use rusqlite::{params, Connection, OptionalExtension};

use super::{WatermarkError, WatermarkRecord, WatermarkStore, ZERO};
use crate::error::{FeedRelayError, Result};

/// SQLite-backed watermark store.
///
/// A connection is opened per operation and all blocking work runs on the
/// tokio blocking pool.
pub struct SqliteWatermarkStore {
    db_path: PathBuf,
}

impl SqliteWatermarkStore {
    /// Default database location inside the platform data directory.
    pub fn default_db_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "feedrelay", "feedrelay").ok_or_else(|| {
            FeedRelayError::Storage("Could not determine data directory".into())
        })?;
        Ok(proj_dirs.data_dir().join("watermarks.db"))
    }

    /// Open the store at the default location.
    pub fn new() -> Result<Self> {
        Self::new_with_path(Self::default_db_path()?)
    }

    /// Open the store at `db_path`, creating parent directories and the
    /// schema when missing.
    ///
    /// # Examples
    ///
    /// ```
    /// use feedrelay::watermark::SqliteWatermarkStore;
    ///
    /// let dir = tempfile::tempdir().unwrap();
    /// let store = SqliteWatermarkStore::new_with_path(dir.path().join("wm.db")).unwrap();
    /// assert!(store.db_path().ends_with("wm.db"));
    /// ```
    pub fn new_with_path<P: Into<PathBuf>>(db_path: P) -> Result<Self> {
        let db_path = db_path.into();

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .context("Failed to create parent directory for database")
                .map_err(|e| FeedRelayError::Storage(e.to_string()))?;
        }

        let store = Self { db_path };
        store.init()?;
        Ok(store)
    }

    /// Path of the underlying database file.
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn init(&self) -> Result<()> {
        let conn = Connection::open(&self.db_path)
            .context("Failed to open database")
            .map_err(|e| FeedRelayError::Storage(e.to_string()))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS watermarks (
                url TEXT PRIMARY KEY,
                ts_secs INTEGER NOT NULL,
                ts_subsec_nanos INTEGER NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )
        .context("Failed to create tables")
        .map_err(|e| FeedRelayError::Storage(e.to_string()))?;

        Ok(())
    }

    async fn run_blocking<T, F>(&self, op: F) -> std::result::Result<T, WatermarkError>
    where
        T: Send + 'static,
        F: FnOnce(&Path) -> std::result::Result<T, WatermarkError> + Send + 'static,
    {
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || op(&db_path))
            .await
            .map_err(|e| WatermarkError::Internal(format!("blocking task failed: {}", e)))?
    }
}

fn open(db_path: &Path) -> std::result::Result<Connection, WatermarkError> {
    Connection::open(db_path).map_err(internal("Failed to open database"))
}

fn internal(context: &'static str) -> impl Fn(rusqlite::Error) -> WatermarkError {
    move |e| WatermarkError::Internal(format!("{}: {}", context, e))
}

// Seconds plus sub-second nanos covers every `DateTime<Utc>` exactly.
fn encode(timestamp: DateTime<Utc>) -> (i64, u32) {
    (timestamp.timestamp(), timestamp.timestamp_subsec_nanos())
}

fn decode(secs: i64, nanos: u32) -> std::result::Result<DateTime<Utc>, WatermarkError> {
    DateTime::from_timestamp(secs, nanos).ok_or_else(|| {
        WatermarkError::Internal(format!("stored timestamp {}.{:09} is out of range", secs, nanos))
    })
}

#[async_trait]
impl WatermarkStore for SqliteWatermarkStore {
    async fn get(&self, url: &str) -> std::result::Result<DateTime<Utc>, WatermarkError> {
        let url = url.to_string();
        self.run_blocking(move |db_path| {
            let conn = open(db_path)?;
            let stored: Option<(i64, u32)> = conn
                .query_row(
                    "SELECT ts_secs, ts_subsec_nanos FROM watermarks WHERE url = ?",
                    params![url],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()
                .map_err(internal("Failed to query watermark"))?;
            match stored {
                Some((secs, nanos)) => decode(secs, nanos),
                None => Ok(ZERO),
            }
        })
        .await
    }

    async fn set(
        &self,
        url: &str,
        timestamp: DateTime<Utc>,
    ) -> std::result::Result<(), WatermarkError> {
        let url = url.to_string();
        let (secs, nanos) = encode(timestamp);
        self.run_blocking(move |db_path| {
            let conn = open(db_path)?;
            let now = Utc::now().to_rfc3339();
            conn.execute(
                "INSERT INTO watermarks (url, ts_secs, ts_subsec_nanos, updated_at)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(url) DO UPDATE SET
                    ts_secs = excluded.ts_secs,
                    ts_subsec_nanos = excluded.ts_subsec_nanos,
                    updated_at = excluded.updated_at
                WHERE (excluded.ts_secs, excluded.ts_subsec_nanos)
                    > (watermarks.ts_secs, watermarks.ts_subsec_nanos)",
                params![url, secs, nanos, now],
            )
            .map_err(internal("Failed to upsert watermark"))?;
            Ok(())
        })
        .await
    }

    async fn list(&self) -> std::result::Result<Vec<WatermarkRecord>, WatermarkError> {
        self.run_blocking(|db_path| {
            let conn = open(db_path)?;
            let mut stmt = conn
                .prepare(
                    "SELECT url, ts_secs, ts_subsec_nanos, updated_at FROM watermarks ORDER BY url",
                )
                .map_err(internal("Failed to prepare statement"))?;

            let rows = stmt
                .query_map([], |row| {
                    let url: String = row.get(0)?;
                    let secs: i64 = row.get(1)?;
                    let nanos: u32 = row.get(2)?;
                    let updated_at: String = row.get(3)?;
                    Ok((url, secs, nanos, updated_at))
                })
                .map_err(internal("Failed to query watermarks"))?;

            let mut records = Vec::new();
            for row in rows {
                let (url, secs, nanos, updated_at) =
                    row.map_err(internal("Failed to read row"))?;
                let updated_at = DateTime::parse_from_rfc3339(&updated_at)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(|e| {
                        WatermarkError::Internal(format!("Invalid updated_at for {}: {}", url, e))
                    })?;
                records.push(WatermarkRecord {
                    url,
                    timestamp: decode(secs, nanos)?,
                    updated_at,
                });
            }
            Ok(records)
        })
        .await
    }
}
