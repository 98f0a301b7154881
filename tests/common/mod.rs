#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use tempfile::TempDir;

use feedrelay::config::MessageConfig;
use feedrelay::converter::EventConverter;
use feedrelay::destination::{BatchResponse, EventSink};
use feedrelay::feeds::{Feed, FeedFetcher, FetchError, Item};
use feedrelay::observer::Observer;
use feedrelay::producer::{BatchSubmitter, FeedError, FeedOutcome, FeedProcessor};
use feedrelay::scheduler::CycleReport;
use feedrelay::watermark::{WatermarkError, WatermarkRecord, WatermarkStore};
use feedrelay::CanonicalEvent;

pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
}

pub fn at(secs: i64) -> DateTime<Utc> {
    base_time() + chrono::Duration::seconds(secs)
}

pub fn item(name: &str, published: Option<DateTime<Utc>>) -> Item {
    Item {
        id: Some(name.to_string()),
        title: name.to_string(),
        link: format!("https://news.example.com/{}", name),
        published,
        ..Default::default()
    }
}

pub fn feed(url: &str, items: Vec<Item>) -> Feed {
    Feed {
        url: url.to_string(),
        link: "https://news.example.com".to_string(),
        title: "Example News".to_string(),
        items,
        ..Default::default()
    }
}

/// Serves fixed feed snapshots keyed by url.
#[derive(Default)]
pub struct FakeFetcher {
    feeds: Mutex<HashMap<String, Feed>>,
    fetches: Mutex<Vec<String>>,
}

impl FakeFetcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn serve(&self, feed: Feed) {
        self.feeds.lock().unwrap().insert(feed.url.clone(), feed);
    }

    pub fn fetches(&self) -> Vec<String> {
        self.fetches.lock().unwrap().clone()
    }
}

#[async_trait]
impl FeedFetcher for FakeFetcher {
    async fn fetch(&self, url: &str) -> Result<Feed, FetchError> {
        self.fetches.lock().unwrap().push(url.to_string());
        self.feeds
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::Status {
                url: url.to_string(),
                status: 404,
            })
    }
}

/// Replays scripted batch responses and records every offered window by
/// event subject. Acknowledges everything once the script runs out.
#[derive(Default)]
pub struct ScriptedSink {
    responses: Mutex<VecDeque<BatchResponse>>,
    offered: Mutex<Vec<Vec<String>>>,
    sources: Mutex<Vec<String>>,
}

impl ScriptedSink {
    pub fn new(responses: Vec<BatchResponse>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            offered: Mutex::new(Vec::new()),
            sources: Mutex::new(Vec::new()),
        })
    }

    pub fn script(&self, responses: Vec<BatchResponse>) {
        self.responses.lock().unwrap().extend(responses);
    }

    pub fn offered(&self) -> Vec<Vec<String>> {
        self.offered.lock().unwrap().clone()
    }

    /// Every subject offered, in order, across all calls.
    pub fn offered_flat(&self) -> Vec<String> {
        self.offered().into_iter().flatten().collect()
    }

    /// Event source of every offered event, in order.
    pub fn sources(&self) -> Vec<String> {
        self.sources.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.offered.lock().unwrap().clear();
    }
}

#[async_trait]
impl EventSink for ScriptedSink {
    async fn submit_batch(&self, events: &[CanonicalEvent]) -> BatchResponse {
        self.offered
            .lock()
            .unwrap()
            .push(events.iter().map(|e| e.subject.clone()).collect());
        self.sources
            .lock()
            .unwrap()
            .extend(events.iter().map(|e| e.source.clone()));
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| BatchResponse::acked(events.len()))
    }
}

/// Store whose reads or writes always fail.
pub struct FailingStore {
    pub fail_get: bool,
    pub fail_set: bool,
    pub writes: Mutex<Vec<(String, DateTime<Utc>)>>,
}

impl FailingStore {
    pub fn new(fail_get: bool, fail_set: bool) -> Arc<Self> {
        Arc::new(Self {
            fail_get,
            fail_set,
            writes: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl WatermarkStore for FailingStore {
    async fn get(&self, _url: &str) -> Result<DateTime<Utc>, WatermarkError> {
        if self.fail_get {
            return Err(WatermarkError::Internal("database locked".to_string()));
        }
        Ok(feedrelay::watermark::ZERO)
    }

    async fn set(&self, url: &str, timestamp: DateTime<Utc>) -> Result<(), WatermarkError> {
        if self.fail_set {
            return Err(WatermarkError::Internal("disk full".to_string()));
        }
        self.writes
            .lock()
            .unwrap()
            .push((url.to_string(), timestamp));
        Ok(())
    }

    async fn list(&self) -> Result<Vec<WatermarkRecord>, WatermarkError> {
        Ok(Vec::new())
    }
}

/// Records observer callbacks.
#[derive(Default)]
pub struct RecordingObserver {
    pub feeds: Mutex<Vec<(String, bool)>>,
    pub cycles: Mutex<usize>,
}

impl RecordingObserver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn cycles(&self) -> usize {
        *self.cycles.lock().unwrap()
    }

    pub fn failed_urls(&self) -> Vec<String> {
        self.feeds
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, ok)| !ok)
            .map(|(url, _)| url.clone())
            .collect()
    }
}

impl Observer for RecordingObserver {
    fn feed_completed(&self, url: &str, result: &Result<FeedOutcome, FeedError>) {
        self.feeds
            .lock()
            .unwrap()
            .push((url.to_string(), result.is_ok()));
    }

    fn cycle_completed(&self, _report: &CycleReport) {
        *self.cycles.lock().unwrap() += 1;
    }
}

pub fn processor(
    fetcher: Arc<dyn FeedFetcher>,
    store: Arc<dyn WatermarkStore>,
    sink: Arc<dyn EventSink>,
    batch_size: usize,
) -> FeedProcessor {
    FeedProcessor::new(
        fetcher,
        store,
        EventConverter::new(MessageConfig::default()),
        BatchSubmitter::new(sink, batch_size, Duration::from_millis(5)),
        chrono::Duration::seconds(10),
        chrono::Duration::seconds(60),
    )
}

pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("feedrelay.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}

/// Event subjects produced by [`item`] for the given names.
pub fn links(names: &[&str]) -> Vec<String> {
    names
        .iter()
        .map(|name| format!("https://news.example.com/{}", name))
        .collect()
}
