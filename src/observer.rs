//! Outcome reporting for feeds and cycles.
//!
//! The scheduler hands every per-feed result and every cycle report to an
//! [`Observer`]. [`TracingObserver`] turns them into log lines and
//! `metrics` counters.
//!
//! # Metrics
//!
//! - `feedrelay_events_submitted_total`: events offered to the destination
//! - `feedrelay_events_acked_total`: events acknowledged by the destination
//! - `feedrelay_feed_failures_total`: failed feeds by `kind`
//! - `feedrelay_watermark_advances_total`: watermark writes
//! - `feedrelay_cycles_total`: completed cycles
//! - `feedrelay_cycle_duration_seconds`: cycle wall time

use metrics::{counter, histogram, increment_counter};
use tracing::{debug, info, warn};

use crate::producer::{FeedError, FeedOutcome};
use crate::scheduler::CycleReport;

/// Receives processing outcomes.
pub trait Observer: Send + Sync {
    /// Called once per feed per cycle.
    fn feed_completed(&self, url: &str, result: &Result<FeedOutcome, FeedError>);

    /// Called after every cycle.
    fn cycle_completed(&self, report: &CycleReport);
}

/// Logs outcomes with `tracing` and records `metrics` counters.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl TracingObserver {
    /// Creates the observer.
    pub fn new() -> Self {
        Self
    }
}

impl Observer for TracingObserver {
    fn feed_completed(&self, url: &str, result: &Result<FeedOutcome, FeedError>) {
        match result {
            Ok(FeedOutcome::Skipped) => {
                debug!(url = %url, "Feed skipped, not due yet");
            }
            Ok(FeedOutcome::Processed(report)) => {
                counter!("feedrelay_events_submitted_total", report.converted as u64);
                counter!("feedrelay_events_acked_total", report.acked as u64);
                if let Some(watermark) = report.new_watermark {
                    increment_counter!("feedrelay_watermark_advances_total");
                    info!(
                        url = %url,
                        unread = report.unread,
                        acked = report.acked,
                        watermark = %watermark,
                        next_refresh = %report.next_refresh,
                        "Feed delivered"
                    );
                } else {
                    debug!(
                        url = %url,
                        items = report.items,
                        unread = report.unread,
                        next_refresh = %report.next_refresh,
                        "Feed has nothing new"
                    );
                }
            }
            Err(error) => {
                match error {
                    FeedError::Delivery { acked, total, .. }
                    | FeedError::Cancelled { acked, total } => {
                        counter!("feedrelay_events_submitted_total", *total as u64);
                        counter!("feedrelay_events_acked_total", *acked as u64);
                    }
                    _ => {}
                }
                increment_counter!("feedrelay_feed_failures_total", "kind" => error.kind());
                warn!(url = %url, kind = error.kind(), error = %error, "Feed processing failed");
            }
        }
    }

    fn cycle_completed(&self, report: &CycleReport) {
        increment_counter!("feedrelay_cycles_total");
        histogram!(
            "feedrelay_cycle_duration_seconds",
            report.elapsed.as_secs_f64()
        );

        if report.is_success() {
            info!(
                feeds = report.feeds,
                processed = report.processed,
                skipped = report.skipped,
                acked = report.events_acked,
                elapsed_ms = report.elapsed.as_millis() as u64,
                "Cycle completed"
            );
        } else {
            warn!(
                feeds = report.feeds,
                processed = report.processed,
                skipped = report.skipped,
                failed = report.failures.len(),
                acked = report.events_acked,
                elapsed_ms = report.elapsed.as_millis() as u64,
                "Cycle completed with failures"
            );
        }
    }
}

/// Install the Prometheus exporter when built with the `prometheus`
/// feature. A no-op otherwise.
pub fn init_metrics_exporter() {
    #[cfg(feature = "prometheus")]
    {
        use metrics_exporter_prometheus::PrometheusBuilder;
        let builder = PrometheusBuilder::new();
        let _ = builder.install().map_err(|e| {
            tracing::warn!("Failed to install Prometheus exporter: {}", e);
        });
    }
}
