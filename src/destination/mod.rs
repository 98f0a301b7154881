//! Event destination seam.
//!
//! An [`EventSink`] accepts an ordered batch and answers with the length
//! of the acknowledged prefix. The batch submitter builds its retry policy
//! on top of that contract.

use async_trait::async_trait;
use thiserror::Error;

use crate::event::CanonicalEvent;

pub mod http;

pub use http::HttpEventSink;

/// Failures reported by the destination.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DestinationError {
    /// Temporary inability to accept more events.
    #[error("destination capacity exhausted: {0}")]
    TransientCapacity(String),

    /// The destination endpoint or queue does not exist.
    #[error("destination target missing: {0}")]
    TargetMissing(String),

    /// Any other failure.
    #[error("destination internal failure: {0}")]
    Internal(String),
}

impl DestinationError {
    /// Classify an error message returned in a batch response body.
    ///
    /// Returns `None` for an empty message.
    pub fn from_message(message: &str) -> Option<Self> {
        let message = message.trim();
        if message.is_empty() {
            return None;
        }
        let text = message.to_string();
        let lower = message.to_ascii_lowercase();
        Some(if lower.starts_with("queue full") || lower.starts_with("capacity exhausted") {
            DestinationError::TransientCapacity(text)
        } else if lower.starts_with("missing queue") || lower.starts_with("target missing") {
            DestinationError::TargetMissing(text)
        } else {
            DestinationError::Internal(text)
        })
    }

    /// Short label used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            DestinationError::TransientCapacity(_) => "transient_capacity",
            DestinationError::TargetMissing(_) => "target_missing",
            DestinationError::Internal(_) => "internal",
        }
    }
}

/// Outcome of one batch submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchResponse {
    /// Number of leading events the destination accepted.
    pub ack_count: usize,
    /// Error reported alongside (or instead of) the acknowledgment.
    pub error: Option<DestinationError>,
}

impl BatchResponse {
    /// Every offered event was accepted.
    pub fn acked(ack_count: usize) -> Self {
        Self {
            ack_count,
            error: None,
        }
    }

    /// Nothing was accepted because of `error`.
    pub fn failed(error: DestinationError) -> Self {
        Self {
            ack_count: 0,
            error: Some(error),
        }
    }
}

/// Receives ordered event batches.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Submit `events` in order. The acknowledged events are exactly the
    /// first `ack_count` of the batch.
    async fn submit_batch(&self, events: &[CanonicalEvent]) -> BatchResponse;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_message_classifies_by_prefix() {
        assert_eq!(DestinationError::from_message(""), None);
        assert_eq!(DestinationError::from_message("   "), None);
        assert!(matches!(
            DestinationError::from_message("queue full: try later"),
            Some(DestinationError::TransientCapacity(_))
        ));
        assert!(matches!(
            DestinationError::from_message("capacity exhausted"),
            Some(DestinationError::TransientCapacity(_))
        ));
        assert!(matches!(
            DestinationError::from_message("missing queue: rss"),
            Some(DestinationError::TargetMissing(_))
        ));
        assert!(matches!(
            DestinationError::from_message("target missing"),
            Some(DestinationError::TargetMissing(_))
        ));
        assert!(matches!(
            DestinationError::from_message("internal failure: db down"),
            Some(DestinationError::Internal(_))
        ));
        assert!(matches!(
            DestinationError::from_message("something odd"),
            Some(DestinationError::Internal(_))
        ));
    }

    #[test]
    fn test_kind_labels() {
        assert_eq!(
            DestinationError::TransientCapacity(String::new()).kind(),
            "transient_capacity"
        );
        assert_eq!(
            DestinationError::TargetMissing(String::new()).kind(),
            "target_missing"
        );
        assert_eq!(DestinationError::Internal(String::new()).kind(), "internal");
    }
}
