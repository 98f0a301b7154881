//! HTTP event destination.
//!
//! Batches are POSTed as a JSON array of CloudEvents. The response status
//! and optional `{"count": n, "error": "..."}` body are mapped onto
//! [`BatchResponse`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::debug;

use super::{BatchResponse, DestinationError, EventSink};
use crate::config::DestinationConfig;
use crate::event::CanonicalEvent;

/// Content type of a CloudEvents JSON batch.
pub const BATCH_CONTENT_TYPE: &str = "application/cloudevents-batch+json";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct BatchResponseBody {
    count: usize,
    error: String,
}

/// Destination reached over HTTP.
pub struct HttpEventSink {
    client: Client,
    uri: String,
}

impl HttpEventSink {
    /// Creates a sink posting to `config.uri`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: &DestinationConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            uri: config.uri.clone(),
        })
    }
}

fn status_error(status: StatusCode, body: String) -> DestinationError {
    let message = if body.trim().is_empty() {
        format!("status {}", status.as_u16())
    } else {
        format!("status {}: {}", status.as_u16(), body.trim())
    };
    match status {
        StatusCode::NOT_FOUND | StatusCode::GONE => DestinationError::TargetMissing(message),
        StatusCode::TOO_MANY_REQUESTS | StatusCode::SERVICE_UNAVAILABLE => {
            DestinationError::TransientCapacity(message)
        }
        _ => DestinationError::Internal(message),
    }
}

#[async_trait]
impl EventSink for HttpEventSink {
    async fn submit_batch(&self, events: &[CanonicalEvent]) -> BatchResponse {
        let payload = match serde_json::to_vec(events) {
            Ok(payload) => payload,
            Err(e) => {
                return BatchResponse::failed(DestinationError::Internal(format!(
                    "failed to serialize batch: {}",
                    e
                )))
            }
        };

        let response = match self
            .client
            .post(&self.uri)
            .header(CONTENT_TYPE, BATCH_CONTENT_TYPE)
            .body(payload)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                return BatchResponse::failed(DestinationError::Internal(format!(
                    "request to {} failed: {}",
                    self.uri, e
                )))
            }
        };

        let status = response.status();
        let body = response.text().await;
        debug!(
            status = status.as_u16(),
            offered = events.len(),
            "Destination responded"
        );

        if !status.is_success() {
            return BatchResponse::failed(status_error(status, body.unwrap_or_default()));
        }

        // A 2xx whose body was cut off acknowledges nothing.
        let body = match body {
            Ok(body) => body,
            Err(e) => {
                return BatchResponse::failed(DestinationError::Internal(format!(
                    "failed to read response from {}: {}",
                    self.uri, e
                )))
            }
        };

        if body.trim().is_empty() {
            return BatchResponse::acked(events.len());
        }

        match serde_json::from_str::<BatchResponseBody>(&body) {
            Ok(parsed) => BatchResponse {
                ack_count: parsed.count,
                error: DestinationError::from_message(&parsed.error),
            },
            Err(e) => BatchResponse::failed(DestinationError::Internal(format!(
                "unreadable batch response: {}",
                e
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_mapping() {
        assert!(matches!(
            status_error(StatusCode::NOT_FOUND, String::new()),
            DestinationError::TargetMissing(_)
        ));
        assert!(matches!(
            status_error(StatusCode::GONE, String::new()),
            DestinationError::TargetMissing(_)
        ));
        assert!(matches!(
            status_error(StatusCode::TOO_MANY_REQUESTS, String::new()),
            DestinationError::TransientCapacity(_)
        ));
        assert!(matches!(
            status_error(StatusCode::SERVICE_UNAVAILABLE, String::new()),
            DestinationError::TransientCapacity(_)
        ));
        assert!(matches!(
            status_error(StatusCode::BAD_REQUEST, "bad".to_string()),
            DestinationError::Internal(ref m) if m == "status 400: bad"
        ));
    }

    #[test]
    fn test_response_body_defaults() {
        let body: BatchResponseBody = serde_json::from_str("{}").unwrap();
        assert_eq!(body.count, 0);
        assert!(body.error.is_empty());

        let body: BatchResponseBody =
            serde_json::from_str(r#"{"count": 3, "error": "queue full"}"#).unwrap();
        assert_eq!(body.count, 3);
        assert_eq!(body.error, "queue full");
    }
}
