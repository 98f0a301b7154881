//! Ordered batch submission with prefix acknowledgment.
//!
//! Events are offered in windows of at most `batch_size`. The destination
//! acknowledges a prefix of each window and the next window starts at the
//! first unacknowledged event. A window that makes no progress is retried
//! after the configured backoff until it does, a hard error occurs or the
//! cancellation token fires.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::destination::{DestinationError, EventSink};
use crate::event::CanonicalEvent;

/// Why a submission stopped before every event was acknowledged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    /// The destination reported a non-retryable failure.
    #[error(transparent)]
    Destination(DestinationError),

    /// Submission was cancelled.
    #[error("submission cancelled")]
    Cancelled,
}

/// Result of submitting a sequence of events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitReport {
    /// Number of leading events acknowledged by the destination.
    pub acked: usize,
    /// Set when submission stopped early.
    pub error: Option<SubmitError>,
}

/// Submits events to an [`EventSink`] honouring prefix acknowledgments.
#[derive(Clone)]
pub struct BatchSubmitter {
    sink: Arc<dyn EventSink>,
    batch_size: usize,
    backoff: Duration,
}

impl BatchSubmitter {
    /// Creates a submitter. A `batch_size` of zero is treated as one.
    pub fn new(sink: Arc<dyn EventSink>, batch_size: usize, backoff: Duration) -> Self {
        Self {
            sink,
            batch_size: batch_size.max(1),
            backoff,
        }
    }

    /// Submit `events` in order.
    ///
    /// The report's `acked` count is exact: the first `acked` events were
    /// accepted and nothing after them was. Transient capacity errors and
    /// zero-progress responses are retried after the backoff.
    pub async fn submit(
        &self,
        events: &[CanonicalEvent],
        cancel: &CancellationToken,
    ) -> SubmitReport {
        let total = events.len();
        let mut acked = 0;

        while acked < total {
            if cancel.is_cancelled() {
                return SubmitReport {
                    acked,
                    error: Some(SubmitError::Cancelled),
                };
            }

            let end = total.min(acked + self.batch_size);
            let window = &events[acked..end];
            let response = self.sink.submit_batch(window).await;

            let mut n = response.ack_count;
            if n > window.len() {
                warn!(
                    ack_count = n,
                    offered = window.len(),
                    "Destination acknowledged more events than offered"
                );
                n = window.len();
            }
            acked += n;

            match response.error {
                None | Some(DestinationError::TransientCapacity(_)) => {}
                Some(error) => {
                    return SubmitReport {
                        acked,
                        error: Some(SubmitError::Destination(error)),
                    }
                }
            }

            if n == 0 {
                debug!(
                    remaining = total - acked,
                    backoff_ms = self.backoff.as_millis() as u64,
                    "Destination made no progress, backing off"
                );
                tokio::select! {
                    _ = cancel.cancelled() => {
                        return SubmitReport {
                            acked,
                            error: Some(SubmitError::Cancelled),
                        };
                    }
                    _ = tokio::time::sleep(self.backoff) => {}
                }
            }
        }

        SubmitReport { acked, error: None }
    }
}
