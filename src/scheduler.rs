//! Cycle loop over all configured feeds.
//!
//! Each cycle gives every feed one turn through the [`FeedProcessor`],
//! collects the outcomes into a [`CycleReport`] and then sleeps for the
//! configured minimum interval. One feed's failure never stops the others.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::feeds::FeedSchedule;
use crate::observer::Observer;
use crate::producer::{FeedError, FeedOutcome, FeedProcessor};

/// A feed that failed in a cycle.
#[derive(Debug)]
pub struct FeedFailure {
    /// Feed url.
    pub url: String,
    /// What went wrong.
    pub error: FeedError,
}

/// Aggregated outcome of one cycle.
#[derive(Debug)]
pub struct CycleReport {
    /// When the cycle started.
    pub started_at: DateTime<Utc>,
    /// Wall time spent in the cycle.
    pub elapsed: Duration,
    /// Feeds considered.
    pub feeds: usize,
    /// Feeds fetched and fully delivered.
    pub processed: usize,
    /// Feeds not yet due.
    pub skipped: usize,
    /// Events acknowledged across all processed feeds.
    pub events_acked: usize,
    /// Feeds whose watermark advanced.
    pub watermarks_advanced: usize,
    /// Feeds that failed.
    pub failures: Vec<FeedFailure>,
}

impl CycleReport {
    fn new(started_at: DateTime<Utc>, feeds: usize) -> Self {
        Self {
            started_at,
            elapsed: Duration::ZERO,
            feeds,
            processed: 0,
            skipped: 0,
            events_acked: 0,
            watermarks_advanced: 0,
            failures: Vec::new(),
        }
    }

    /// Whether every feed was skipped or processed without error.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Runs processing cycles over a fixed set of feeds.
pub struct Scheduler {
    processor: Arc<FeedProcessor>,
    observer: Arc<dyn Observer>,
    schedules: Vec<FeedSchedule>,
    cycle_interval: Duration,
    max_concurrent_feeds: usize,
}

impl Scheduler {
    /// Creates a scheduler over `urls`. Duplicate urls are dropped, keeping
    /// the first occurrence, so a feed is processed at most once per cycle.
    pub fn new(
        processor: Arc<FeedProcessor>,
        observer: Arc<dyn Observer>,
        urls: Vec<String>,
        cycle_interval: Duration,
        max_concurrent_feeds: usize,
    ) -> Self {
        let mut schedules: Vec<FeedSchedule> = Vec::with_capacity(urls.len());
        for url in urls {
            if schedules.iter().any(|s| s.url == url) {
                debug!(url = %url, "Ignoring duplicate feed url");
                continue;
            }
            schedules.push(FeedSchedule::new(url));
        }

        Self {
            processor,
            observer,
            schedules,
            cycle_interval,
            max_concurrent_feeds: max_concurrent_feeds.max(1),
        }
    }

    /// Current refresh state of every feed.
    pub fn schedules(&self) -> &[FeedSchedule] {
        &self.schedules
    }

    /// Run a single cycle at `now`.
    pub async fn run_cycle(&mut self, now: DateTime<Utc>, cancel: &CancellationToken) -> CycleReport {
        let timer = Instant::now();
        let mut report = CycleReport::new(now, self.schedules.len());

        let processor = &self.processor;
        let observer = &self.observer;
        let limit = self.max_concurrent_feeds;

        let results: Vec<(String, Result<FeedOutcome, FeedError>)> =
            stream::iter(self.schedules.iter_mut())
                .map(|schedule| async move {
                    let result = processor.process(schedule, now, cancel).await;
                    observer.feed_completed(&schedule.url, &result);
                    (schedule.url.clone(), result)
                })
                .buffer_unordered(limit)
                .collect()
                .await;

        for (url, result) in results {
            match result {
                Ok(FeedOutcome::Skipped) => report.skipped += 1,
                Ok(FeedOutcome::Processed(feed)) => {
                    report.processed += 1;
                    report.events_acked += feed.acked;
                    if feed.new_watermark.is_some() {
                        report.watermarks_advanced += 1;
                    }
                }
                Err(error) => report.failures.push(FeedFailure { url, error }),
            }
        }

        report.elapsed = timer.elapsed();
        self.observer.cycle_completed(&report);
        report
    }

    /// Run cycles until `cancel` fires, sleeping the cycle interval between
    /// them.
    pub async fn run(&mut self, cancel: CancellationToken) {
        info!(
            feeds = self.schedules.len(),
            interval_secs = self.cycle_interval.as_secs(),
            "Starting feed processing"
        );

        loop {
            if cancel.is_cancelled() {
                break;
            }

            self.run_cycle(Utc::now(), &cancel).await;

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.cycle_interval) => {}
            }
        }

        info!("Feed processing stopped");
    }
}
