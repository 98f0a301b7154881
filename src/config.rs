//! Configuration management for feedrelay
//!
//! Configuration is read from a YAML file, then overridden by
//! `FEEDRELAY_*` environment variables and finally by CLI flags. Every
//! field has a default so an empty or missing file yields a runnable
//! configuration.

use crate::cli::{Cli, Commands};
use crate::error::{FeedRelayError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Longest accepted refresh interval bound, in seconds (one year).
const MAX_INTERVAL_SECS: u64 = 365 * 24 * 60 * 60;

/// CloudEvents context attribute names that metadata keys must not shadow.
const RESERVED_ATTRIBUTES: [&str; 9] = [
    "id",
    "source",
    "specversion",
    "type",
    "subject",
    "time",
    "data",
    "datacontenttype",
    "dataschema",
];

/// Main configuration structure for feedrelay
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Event destination settings
    #[serde(default)]
    pub destination: DestinationConfig,

    /// Feed sources and refresh bounds
    #[serde(default)]
    pub feeds: FeedsConfig,

    /// Canonical event shape
    #[serde(default)]
    pub message: MessageConfig,

    /// Watermark persistence
    #[serde(default)]
    pub storage: StorageConfig,

    /// Cycle execution
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Logging output
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Destination the batches are submitted to
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DestinationConfig {
    /// HTTP endpoint accepting CloudEvents batches
    #[serde(default = "default_destination_uri")]
    pub uri: String,

    /// Sleep between retries when the destination makes no progress
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,

    /// Maximum number of events per submission
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Request timeout
    #[serde(default = "default_destination_timeout")]
    pub timeout_secs: u64,
}

fn default_destination_uri() -> String {
    "http://localhost:8080/v1/events".to_string()
}

fn default_backoff_ms() -> u64 {
    1000
}

fn default_batch_size() -> usize {
    16
}

fn default_destination_timeout() -> u64 {
    30
}

impl Default for DestinationConfig {
    fn default() -> Self {
        Self {
            uri: default_destination_uri(),
            backoff_ms: default_backoff_ms(),
            batch_size: default_batch_size(),
            timeout_secs: default_destination_timeout(),
        }
    }
}

impl DestinationConfig {
    /// Backoff as a std duration
    pub fn backoff(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.backoff_ms)
    }
}

/// Feed sources and refresh policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedsConfig {
    /// Feed urls listed inline
    #[serde(default)]
    pub urls: Vec<String>,

    /// File with one feed url per line (`#` starts a comment)
    #[serde(default)]
    pub urls_file: Option<PathBuf>,

    /// Lower bound for the next refresh of a feed
    #[serde(default = "default_update_interval_min")]
    pub update_interval_min_secs: u64,

    /// Upper bound for the next refresh of a feed
    #[serde(default = "default_update_interval_max")]
    pub update_interval_max_secs: u64,

    /// Feed download timeout
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,

    /// User agent sent to feed servers
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Accept invalid TLS certificates from feed servers
    #[serde(default)]
    pub tls_skip_verify: bool,
}

fn default_update_interval_min() -> u64 {
    10
}

fn default_update_interval_max() -> u64 {
    24 * 60 * 60
}

fn default_fetch_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("feedrelay/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for FeedsConfig {
    fn default() -> Self {
        Self {
            urls: Vec::new(),
            urls_file: None,
            update_interval_min_secs: default_update_interval_min(),
            update_interval_max_secs: default_update_interval_max(),
            fetch_timeout_secs: default_fetch_timeout(),
            user_agent: default_user_agent(),
            tls_skip_verify: false,
        }
    }
}

impl FeedsConfig {
    /// Minimum refresh interval
    pub fn update_interval_min(&self) -> chrono::Duration {
        interval(self.update_interval_min_secs)
    }

    /// Maximum refresh interval
    pub fn update_interval_max(&self) -> chrono::Duration {
        interval(self.update_interval_max_secs)
    }

    /// Resolve the configured feed urls.
    ///
    /// Inline urls come first, followed by the lines of `urls_file`. Blank
    /// lines and `#` comments are skipped and duplicates are removed while
    /// keeping first-seen order.
    ///
    /// # Errors
    ///
    /// Returns `FeedRelayError::FeedList` if `urls_file` cannot be read.
    pub fn feed_urls(&self) -> Result<Vec<String>> {
        let mut candidates: Vec<String> = self.urls.clone();

        if let Some(path) = &self.urls_file {
            let contents = std::fs::read_to_string(path).map_err(|e| {
                FeedRelayError::FeedList(format!("{}: {}", path.display(), e))
            })?;
            candidates.extend(contents.lines().map(str::to_string));
        }

        let mut seen = HashSet::new();
        Ok(candidates
            .into_iter()
            .map(|line| line.trim().to_string())
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .filter(|url| seen.insert(url.clone()))
            .collect())
    }
}

fn interval(secs: u64) -> chrono::Duration {
    chrono::Duration::seconds(secs.min(MAX_INTERVAL_SECS) as i64)
}

/// Canonical event shape
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageConfig {
    /// CloudEvents spec version
    #[serde(default = "default_spec_version")]
    pub spec_version: String,

    /// Event type attribute
    #[serde(default = "default_event_type")]
    pub event_type: String,

    /// MIME type of the event body
    #[serde(default = "default_content_type")]
    pub content_type: String,

    /// Names of the metadata attributes
    #[serde(default)]
    pub metadata: MetadataKeys,
}

fn default_spec_version() -> String {
    "1.0".to_string()
}

fn default_event_type() -> String {
    "com.github.feedrelay.rss".to_string()
}

fn default_content_type() -> String {
    "text/plain".to_string()
}

impl Default for MessageConfig {
    fn default() -> Self {
        Self {
            spec_version: default_spec_version(),
            event_type: default_event_type(),
            content_type: default_content_type(),
            metadata: MetadataKeys::default(),
        }
    }
}

/// Metadata attribute names written by the converter
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataKeys {
    /// Feed author
    pub key_author: String,
    /// Item categories
    pub key_categories: String,
    /// Feed categories
    pub key_feed_categories: String,
    /// Feed description
    pub key_feed_description: String,
    /// Feed image caption
    pub key_feed_image_title: String,
    /// Feed image location
    pub key_feed_image_url: String,
    /// Feed title
    pub key_feed_title: String,
    /// Item id
    pub key_guid: String,
    /// Item image caption
    pub key_image_title: String,
    /// Item image location
    pub key_image_url: String,
    /// Feed language
    pub key_language: String,
    /// Item summary
    pub key_summary: String,
    /// Item title
    pub key_title: String,
}

impl Default for MetadataKeys {
    fn default() -> Self {
        Self {
            key_author: "author".to_string(),
            key_categories: "categories".to_string(),
            key_feed_categories: "feedcategories".to_string(),
            key_feed_description: "feeddescription".to_string(),
            key_feed_image_title: "feedimagetitle".to_string(),
            key_feed_image_url: "feedimageurl".to_string(),
            key_feed_title: "feedtitle".to_string(),
            key_guid: "guid".to_string(),
            key_image_title: "imagetitle".to_string(),
            key_image_url: "imageurl".to_string(),
            key_language: "language".to_string(),
            key_summary: "summary".to_string(),
            key_title: "title".to_string(),
        }
    }
}

impl MetadataKeys {
    /// Every key paired with its configuration field name.
    fn named(&self) -> [(&'static str, &str); 13] {
        [
            ("key_author", &self.key_author),
            ("key_categories", &self.key_categories),
            ("key_feed_categories", &self.key_feed_categories),
            ("key_feed_description", &self.key_feed_description),
            ("key_feed_image_title", &self.key_feed_image_title),
            ("key_feed_image_url", &self.key_feed_image_url),
            ("key_feed_title", &self.key_feed_title),
            ("key_guid", &self.key_guid),
            ("key_image_title", &self.key_image_title),
            ("key_image_url", &self.key_image_url),
            ("key_language", &self.key_language),
            ("key_summary", &self.key_summary),
            ("key_title", &self.key_title),
        ]
    }

    fn field_mut(&mut self, name: &str) -> Option<&mut String> {
        match name {
            "AUTHOR" => Some(&mut self.key_author),
            "CATEGORIES" => Some(&mut self.key_categories),
            "FEED_CATEGORIES" => Some(&mut self.key_feed_categories),
            "FEED_DESCRIPTION" => Some(&mut self.key_feed_description),
            "FEED_IMAGE_TITLE" => Some(&mut self.key_feed_image_title),
            "FEED_IMAGE_URL" => Some(&mut self.key_feed_image_url),
            "FEED_TITLE" => Some(&mut self.key_feed_title),
            "GUID" => Some(&mut self.key_guid),
            "IMAGE_TITLE" => Some(&mut self.key_image_title),
            "IMAGE_URL" => Some(&mut self.key_image_url),
            "LANGUAGE" => Some(&mut self.key_language),
            "SUMMARY" => Some(&mut self.key_summary),
            "TITLE" => Some(&mut self.key_title),
            _ => None,
        }
    }
}

const METADATA_ENV_SUFFIXES: [&str; 13] = [
    "AUTHOR",
    "CATEGORIES",
    "FEED_CATEGORIES",
    "FEED_DESCRIPTION",
    "FEED_IMAGE_TITLE",
    "FEED_IMAGE_URL",
    "FEED_TITLE",
    "GUID",
    "IMAGE_TITLE",
    "IMAGE_URL",
    "LANGUAGE",
    "SUMMARY",
    "TITLE",
];

/// Watermark persistence
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite database file; defaults to the platform data directory
    #[serde(default)]
    pub db_path: Option<PathBuf>,
}

/// Cycle execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Number of feeds processed at the same time
    #[serde(default = "default_max_concurrent_feeds")]
    pub max_concurrent_feeds: usize,
}

fn default_max_concurrent_feeds() -> usize {
    1
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_feeds: default_max_concurrent_feeds(),
        }
    }
}

/// Logging output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error); `RUST_LOG` wins
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json_format: bool,

    /// Also append logs to this file
    #[serde(default)]
    pub file_path: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
            file_path: None,
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str, target: &mut T) {
    if let Ok(raw) = std::env::var(name) {
        match raw.trim().parse() {
            Ok(value) => {
                *target = value;
                tracing::debug!("Env override: {}", name);
            }
            Err(_) => tracing::warn!("Invalid {}: {}", name, raw),
        }
    }
}

fn env_string(name: &str, target: &mut String) {
    if let Ok(value) = std::env::var(name) {
        *target = value;
        tracing::debug!("Env override: {}", name);
    }
}

fn env_path(name: &str, target: &mut Option<PathBuf>) {
    if let Ok(value) = std::env::var(name) {
        *target = Some(PathBuf::from(value));
        tracing::debug!("Env override: {}", name);
    }
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// A missing file is not an error: defaults are used instead.
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str, cli: &Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| FeedRelayError::Config(format!("Failed to read config file: {}", e)))?;
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        let config = serde_yaml::from_str(&contents).map_err(FeedRelayError::Yaml)?;
        Ok(config)
    }

    fn apply_env_vars(&mut self) {
        // Destination
        env_string("FEEDRELAY_DESTINATION_URI", &mut self.destination.uri);
        env_parse(
            "FEEDRELAY_DESTINATION_BACKOFF_MS",
            &mut self.destination.backoff_ms,
        );
        env_parse(
            "FEEDRELAY_DESTINATION_BATCH_SIZE",
            &mut self.destination.batch_size,
        );
        env_parse(
            "FEEDRELAY_DESTINATION_TIMEOUT_SECS",
            &mut self.destination.timeout_secs,
        );

        // Feeds
        if let Ok(urls) = std::env::var("FEEDRELAY_FEED_URLS") {
            self.feeds.urls = urls
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            tracing::debug!(count = self.feeds.urls.len(), "Env override: FEEDRELAY_FEED_URLS");
        }
        env_path("FEEDRELAY_FEED_URLS_FILE", &mut self.feeds.urls_file);
        env_parse(
            "FEEDRELAY_FEED_UPDATE_INTERVAL_MIN_SECS",
            &mut self.feeds.update_interval_min_secs,
        );
        env_parse(
            "FEEDRELAY_FEED_UPDATE_INTERVAL_MAX_SECS",
            &mut self.feeds.update_interval_max_secs,
        );
        env_parse(
            "FEEDRELAY_FEED_FETCH_TIMEOUT_SECS",
            &mut self.feeds.fetch_timeout_secs,
        );
        env_string("FEEDRELAY_FEED_USER_AGENT", &mut self.feeds.user_agent);
        env_parse(
            "FEEDRELAY_FEED_TLS_SKIP_VERIFY",
            &mut self.feeds.tls_skip_verify,
        );

        // Message
        env_string("FEEDRELAY_MSG_SPEC_VERSION", &mut self.message.spec_version);
        env_string("FEEDRELAY_MSG_EVENT_TYPE", &mut self.message.event_type);
        env_string("FEEDRELAY_MSG_CONTENT_TYPE", &mut self.message.content_type);
        for suffix in METADATA_ENV_SUFFIXES {
            let name = format!("FEEDRELAY_MSG_MD_KEY_{}", suffix);
            if let Some(field) = self.message.metadata.field_mut(suffix) {
                env_string(&name, field);
            }
        }

        // Storage, scheduler, logging
        env_path("FEEDRELAY_WATERMARK_DB", &mut self.storage.db_path);
        env_parse(
            "FEEDRELAY_MAX_CONCURRENT_FEEDS",
            &mut self.scheduler.max_concurrent_feeds,
        );
        env_string("FEEDRELAY_LOG_LEVEL", &mut self.logging.level);
        env_parse("FEEDRELAY_LOG_JSON", &mut self.logging.json_format);
        env_path("FEEDRELAY_LOG_FILE", &mut self.logging.file_path);
    }

    fn apply_cli_overrides(&mut self, cli: &Cli) {
        if cli.verbose {
            self.logging.level = "debug".to_string();
        }

        if let Commands::Run {
            feeds_file: Some(path),
            ..
        } = &cli.command
        {
            self.feeds.urls_file = Some(path.clone());
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns `FeedRelayError::Config` describing the first invalid value
    pub fn validate(&self) -> Result<()> {
        let uri = url::Url::parse(&self.destination.uri).map_err(|e| {
            FeedRelayError::Config(format!(
                "destination.uri '{}' is not a valid URL: {}",
                self.destination.uri, e
            ))
        })?;
        if !matches!(uri.scheme(), "http" | "https") {
            return Err(FeedRelayError::Config(format!(
                "destination.uri must use http or https, got {}",
                uri.scheme()
            ))
            .into());
        }

        if self.destination.batch_size == 0 {
            return Err(FeedRelayError::Config(
                "destination.batch_size must be greater than 0".to_string(),
            )
            .into());
        }

        if self.feeds.update_interval_min_secs == 0 {
            return Err(FeedRelayError::Config(
                "feeds.update_interval_min_secs must be greater than 0".to_string(),
            )
            .into());
        }

        if self.feeds.update_interval_min_secs > self.feeds.update_interval_max_secs {
            return Err(FeedRelayError::Config(format!(
                "feeds.update_interval_min_secs ({}) must not exceed feeds.update_interval_max_secs ({})",
                self.feeds.update_interval_min_secs, self.feeds.update_interval_max_secs
            ))
            .into());
        }

        if self.feeds.update_interval_max_secs > MAX_INTERVAL_SECS {
            return Err(FeedRelayError::Config(format!(
                "feeds.update_interval_max_secs must be at most {}",
                MAX_INTERVAL_SECS
            ))
            .into());
        }

        if self.scheduler.max_concurrent_feeds == 0 {
            return Err(FeedRelayError::Config(
                "scheduler.max_concurrent_feeds must be greater than 0".to_string(),
            )
            .into());
        }

        let mut seen = HashSet::new();
        for (field, key) in self.message.metadata.named() {
            if key.trim().is_empty() {
                return Err(FeedRelayError::Config(format!(
                    "message.metadata.{} cannot be empty",
                    field
                ))
                .into());
            }
            if RESERVED_ATTRIBUTES.contains(&key) {
                return Err(FeedRelayError::Config(format!(
                    "message.metadata.{} '{}' collides with a CloudEvents attribute",
                    field, key
                ))
                .into());
            }
            if !seen.insert(key) {
                return Err(FeedRelayError::Config(format!(
                    "message.metadata.{} '{}' is used by more than one key",
                    field, key
                ))
                .into());
            }
        }

        Ok(())
    }
}
