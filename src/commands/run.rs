//! `feedrelay run`: wire the pipeline together and start polling.

use std::sync::Arc;

use anyhow::Context;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::converter::EventConverter;
use crate::destination::{EventSink, HttpEventSink};
use crate::error::{FeedRelayError, Result};
use crate::feeds::{FeedFetcher, HttpFeedFetcher};
use crate::observer::{Observer, TracingObserver};
use crate::producer::{BatchSubmitter, FeedProcessor};
use crate::scheduler::Scheduler;
use crate::watermark::WatermarkStore;

/// Build a scheduler over the configured feeds using the given
/// collaborators.
///
/// # Errors
///
/// Returns `FeedRelayError::FeedList` if the feed list cannot be read or is
/// empty.
pub fn build_scheduler(
    config: &Config,
    fetcher: Arc<dyn FeedFetcher>,
    store: Arc<dyn WatermarkStore>,
    sink: Arc<dyn EventSink>,
    observer: Arc<dyn Observer>,
) -> Result<Scheduler> {
    let urls = config.feeds.feed_urls()?;
    if urls.is_empty() {
        return Err(FeedRelayError::FeedList(
            "no feed urls configured (feeds.urls, feeds.urls_file or --feeds-file)".to_string(),
        )
        .into());
    }

    let submitter = BatchSubmitter::new(
        sink,
        config.destination.batch_size,
        config.destination.backoff(),
    );
    let processor = FeedProcessor::new(
        fetcher,
        store,
        EventConverter::new(config.message.clone()),
        submitter,
        config.feeds.update_interval_min(),
        config.feeds.update_interval_max(),
    );

    Ok(Scheduler::new(
        Arc::new(processor),
        observer,
        urls,
        std::time::Duration::from_secs(config.feeds.update_interval_min_secs),
        config.scheduler.max_concurrent_feeds,
    ))
}

/// Run the relay until Ctrl-C, or a single cycle when `once` is set.
///
/// # Errors
///
/// Returns an error if the pipeline cannot be built, or if `once` is set
/// and any feed failed in that cycle.
pub async fn run_relay(config: Config, once: bool) -> Result<()> {
    let store = super::open_watermark_store(&config)?;
    let fetcher = HttpFeedFetcher::new(&config.feeds)
        .map_err(FeedRelayError::from)
        .context("Failed to build feed HTTP client")?;
    let sink = HttpEventSink::new(&config.destination)
        .map_err(FeedRelayError::from)
        .context("Failed to build destination HTTP client")?;

    let mut scheduler = build_scheduler(
        &config,
        Arc::new(fetcher),
        store,
        Arc::new(sink),
        Arc::new(TracingObserver::new()),
    )?;

    tracing::info!(
        destination = %config.destination.uri,
        feeds = scheduler.schedules().len(),
        "Relay configured"
    );

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, shutting down");
            trigger.cancel();
        }
    });

    if once {
        let report = scheduler.run_cycle(chrono::Utc::now(), &cancel).await;
        if !report.is_success() {
            return Err(anyhow::anyhow!(
                "{} of {} feeds failed",
                report.failures.len(),
                report.feeds
            ));
        }
        return Ok(());
    }

    scheduler.run(cancel).await;
    Ok(())
}
