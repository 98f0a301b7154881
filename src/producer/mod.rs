//! Per-feed production pipeline.
//!
//! [`FeedProcessor`] turns one feed snapshot into delivered events and a
//! new watermark, using [`BatchSubmitter`] for ordered, resumable
//! delivery.

pub mod processor;
pub mod submitter;

pub use processor::{FeedError, FeedOutcome, FeedProcessor, FeedReport};
pub use submitter::{BatchSubmitter, SubmitError, SubmitReport};
