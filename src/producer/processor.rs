//! One feed, one cycle: fetch, select unread items, convert, submit and
//! advance the watermark.
//!
//! The watermark only moves after every unread item has been acknowledged
//! by the destination, so a crash or failure at any point leads to
//! re-delivery rather than loss.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::submitter::{BatchSubmitter, SubmitError};
use crate::converter::EventConverter;
use crate::destination::DestinationError;
use crate::feeds::{next_refresh, FeedFetcher, FeedSchedule, FetchError, Item};
use crate::watermark::{WatermarkError, WatermarkStore, ZERO};

/// Reasons a feed could not be fully processed in a cycle.
#[derive(Error, Debug)]
pub enum FeedError {
    /// The feed could not be retrieved or parsed.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The stored watermark could not be read; all items were re-sent.
    #[error("failed to read watermark: {0}")]
    WatermarkRead(#[source] WatermarkError),

    /// Events were delivered but the new watermark could not be stored.
    #[error("failed to write watermark: {0}")]
    WatermarkWrite(#[source] WatermarkError),

    /// The destination stopped accepting events.
    #[error("delivery stopped after {acked} of {total} events: {source}")]
    Delivery {
        /// Events acknowledged before the failure.
        acked: usize,
        /// Events offered.
        total: usize,
        /// Destination failure.
        #[source]
        source: DestinationError,
    },

    /// Submission was cancelled.
    #[error("cancelled after {acked} of {total} events")]
    Cancelled {
        /// Events acknowledged before cancellation.
        acked: usize,
        /// Events offered.
        total: usize,
    },
}

impl FeedError {
    /// Short label used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            FeedError::Fetch(_) => "fetch",
            FeedError::WatermarkRead(_) => "watermark_read",
            FeedError::WatermarkWrite(_) => "watermark_write",
            FeedError::Delivery { .. } => "delivery",
            FeedError::Cancelled { .. } => "cancelled",
        }
    }
}

/// Counters for a processed feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedReport {
    /// Feed url.
    pub url: String,
    /// Items in the fetched snapshot.
    pub items: usize,
    /// Items newer than the watermark (or without a publish time).
    pub unread: usize,
    /// Events produced from unread items.
    pub converted: usize,
    /// Events acknowledged by the destination.
    pub acked: usize,
    /// Watermark before this cycle.
    pub previous_watermark: DateTime<Utc>,
    /// Watermark written in this cycle, if it advanced.
    pub new_watermark: Option<DateTime<Utc>>,
    /// Next allowed refresh.
    pub next_refresh: DateTime<Utc>,
}

/// Result of a feed's turn in a cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedOutcome {
    /// The feed was not due yet.
    Skipped,
    /// The feed was fetched and every unread item was delivered.
    Processed(FeedReport),
}

/// Processes a single feed per call.
pub struct FeedProcessor {
    fetcher: Arc<dyn FeedFetcher>,
    store: Arc<dyn WatermarkStore>,
    converter: EventConverter,
    submitter: BatchSubmitter,
    interval_min: Duration,
    interval_max: Duration,
}

fn is_unread(item: &Item, watermark: DateTime<Utc>) -> bool {
    match item.published {
        None => true,
        Some(published) => watermark == ZERO || published > watermark,
    }
}

impl FeedProcessor {
    /// Creates a processor. Refresh hints are clamped into
    /// `[interval_min, interval_max]`.
    pub fn new(
        fetcher: Arc<dyn FeedFetcher>,
        store: Arc<dyn WatermarkStore>,
        converter: EventConverter,
        submitter: BatchSubmitter,
        interval_min: Duration,
        interval_max: Duration,
    ) -> Self {
        Self {
            fetcher,
            store,
            converter,
            submitter,
            interval_min,
            interval_max,
        }
    }

    /// Process the feed behind `schedule` at `now`.
    ///
    /// On a successful fetch `schedule.next_refresh` is recomputed from the
    /// feed's refresh hint; a failed fetch leaves it untouched so the feed
    /// is retried in the next cycle.
    ///
    /// # Errors
    ///
    /// See [`FeedError`]. The watermark is never advanced when an error is
    /// returned.
    pub async fn process(
        &self,
        schedule: &mut FeedSchedule,
        now: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> Result<FeedOutcome, FeedError> {
        if !schedule.is_due(now) {
            debug!(url = %schedule.url, next_refresh = %schedule.next_refresh, "Feed not due");
            return Ok(FeedOutcome::Skipped);
        }

        let url = schedule.url.clone();
        let feed = self.fetcher.fetch(&url).await?;
        schedule.next_refresh =
            next_refresh(now, feed.refresh_hint, self.interval_min, self.interval_max);

        let (watermark, read_error) = match self.store.get(&url).await {
            Ok(watermark) => (watermark, None),
            Err(e) => {
                warn!(url = %url, error = %e, "Watermark unavailable, re-sending all items");
                (ZERO, Some(e))
            }
        };

        let unread: Vec<&Item> = feed
            .items
            .iter()
            .filter(|item| is_unread(item, watermark))
            .collect();

        let events: Vec<_> = unread
            .iter()
            .map(|item| self.converter.convert(&feed, item))
            .collect();
        debug!(
            url = %url,
            items = feed.items.len(),
            unread = unread.len(),
            converted = events.len(),
            watermark = %watermark,
            "Selected unread items"
        );

        let acked = if events.is_empty() {
            0
        } else {
            let report = self.submitter.submit(&events, cancel).await;
            match report.error {
                Some(SubmitError::Destination(source)) => {
                    return Err(FeedError::Delivery {
                        acked: report.acked,
                        total: events.len(),
                        source,
                    })
                }
                Some(SubmitError::Cancelled) => {
                    return Err(FeedError::Cancelled {
                        acked: report.acked,
                        total: events.len(),
                    })
                }
                None => report.acked,
            }
        };

        if let Some(e) = read_error {
            return Err(FeedError::WatermarkRead(e));
        }

        let mut new_watermark = None;
        if let Some(candidate) = feed.max_published() {
            if candidate > watermark && acked == unread.len() {
                self.store
                    .set(&url, candidate)
                    .await
                    .map_err(FeedError::WatermarkWrite)?;
                new_watermark = Some(candidate);
            }
        }

        Ok(FeedOutcome::Processed(FeedReport {
            url,
            items: feed.items.len(),
            unread: unread.len(),
            converted: events.len(),
            acked,
            previous_watermark: watermark,
            new_watermark,
            next_refresh: schedule.next_refresh,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 6, 9, 7, 31, 0).unwrap() + Duration::seconds(secs)
    }

    #[test]
    fn test_is_unread_rules() {
        let undated = Item::default();
        let dated = Item {
            published: Some(at(10)),
            ..Default::default()
        };

        assert!(is_unread(&undated, at(100)));
        assert!(is_unread(&dated, ZERO));
        assert!(is_unread(&dated, at(9)));
        assert!(!is_unread(&dated, at(10)));
        assert!(!is_unread(&dated, at(11)));
    }

    #[test]
    fn test_feed_error_kinds() {
        assert_eq!(
            FeedError::WatermarkRead(WatermarkError::Internal("x".into())).kind(),
            "watermark_read"
        );
        assert_eq!(
            FeedError::Delivery {
                acked: 1,
                total: 2,
                source: DestinationError::TargetMissing("gone".into()),
            }
            .kind(),
            "delivery"
        );
        assert_eq!(FeedError::Cancelled { acked: 0, total: 1 }.kind(), "cancelled");
    }

    #[test]
    fn test_delivery_error_display() {
        let err = FeedError::Delivery {
            acked: 3,
            total: 5,
            source: DestinationError::Internal("boom".into()),
        };
        assert_eq!(
            err.to_string(),
            "delivery stopped after 3 of 5 events: destination internal failure: boom"
        );
    }
}
