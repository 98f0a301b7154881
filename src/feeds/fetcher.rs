//! Feed retrieval.
//!
//! [`FeedFetcher`] is the seam between the producer and the network. The
//! HTTP implementation downloads a document and hands it to
//! [`parse_feed`](super::parse_feed).

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use thiserror::Error;
use tracing::debug;

use super::model::Feed;
use super::parser::{parse_feed, ParseError};
use crate::config::FeedsConfig;

/// Errors that can occur while retrieving a feed.
#[derive(Error, Debug)]
pub enum FetchError {
    /// Transport failure (DNS, TLS, timeout, connection reset).
    #[error("HTTP error fetching {url}: {source}")]
    Http {
        /// Feed url.
        url: String,
        /// Underlying client error.
        #[source]
        source: reqwest::Error,
    },

    /// Server answered with a non-success status.
    #[error("feed {url} returned status {status}")]
    Status {
        /// Feed url.
        url: String,
        /// HTTP status code.
        status: u16,
    },

    /// Document could not be parsed as RSS or Atom.
    #[error("failed to parse feed {url}: {source}")]
    Parse {
        /// Feed url.
        url: String,
        /// Parser error.
        #[source]
        source: ParseError,
    },
}

/// Retrieves a fresh snapshot of a feed.
#[async_trait]
pub trait FeedFetcher: Send + Sync {
    /// Fetch and parse the feed at `url`.
    async fn fetch(&self, url: &str) -> Result<Feed, FetchError>;
}

/// HTTP(S) feed fetcher backed by `reqwest`.
pub struct HttpFeedFetcher {
    client: Client,
}

impl HttpFeedFetcher {
    /// Creates a fetcher using the timeout, user agent and TLS settings
    /// from `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &FeedsConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.fetch_timeout_secs))
            .user_agent(config.user_agent.clone())
            .danger_accept_invalid_certs(config.tls_skip_verify)
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl FeedFetcher for HttpFeedFetcher {
    async fn fetch(&self, url: &str) -> Result<Feed, FetchError> {
        let http_err = |source| FetchError::Http {
            url: url.to_string(),
            source,
        };

        let response = self.client.get(url).send().await.map_err(http_err)?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(http_err)?;
        debug!(url = %url, bytes = body.len(), "Fetched feed document");

        parse_feed(url, &body, Utc::now()).map_err(|source| FetchError::Parse {
            url: url.to_string(),
            source,
        })
    }
}
