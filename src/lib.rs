//! feedrelay - RSS/Atom feed relay library
//!
//! Polls RSS and Atom feeds, converts items that have not been delivered
//! yet into CloudEvents and submits them to an HTTP destination with
//! at-least-once semantics. Per-feed progress is tracked with a durable
//! publish-time watermark.
//!
//! # Architecture
//!
//! - `feeds`: feed model, RSS/Atom parsing, HTTP fetching, refresh timing
//! - `watermark`: per-feed watermark stores (SQLite, in-memory)
//! - `converter`: feed item to CloudEvent mapping
//! - `destination`: event sink seam and HTTP implementation
//! - `producer`: batch submitter and per-feed processor
//! - `scheduler`: cycle loop over all feeds
//! - `observer`: outcome logging and metrics
//! - `config`, `cli`, `logging`, `error`: application plumbing
//!
//! # Example
//!
//! ```no_run
//! use feedrelay::cli::Cli;
//! use feedrelay::Config;
//!
//! # fn main() -> anyhow::Result<()> {
//! let cli = Cli::parse_args();
//! let config = Config::load("config/feedrelay.yaml", &cli)?;
//! config.validate()?;
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod converter;
pub mod destination;
pub mod error;
pub mod event;
pub mod feeds;
pub mod logging;
pub mod observer;
pub mod producer;
pub mod scheduler;
pub mod watermark;

// Re-export commonly used types
pub use config::Config;
pub use error::{FeedRelayError, Result};
pub use event::CanonicalEvent;
pub use scheduler::{CycleReport, Scheduler};
