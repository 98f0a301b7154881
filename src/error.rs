//! Error types for feedrelay
//!
//! Crate-level errors raised while loading configuration and wiring the
//! pipeline together. Pipeline components (watermark store, converter,
//! destination, producer) define their own error enums next to the code
//! that raises them, using `thiserror` in the same way.

use thiserror::Error;

/// Main error type for feedrelay setup and operator commands
#[derive(Error, Debug)]
pub enum FeedRelayError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Feed URL list could not be loaded
    #[error("Feed list error: {0}")]
    FeedList(String),

    /// Watermark database errors surfaced to operator commands
    #[error("Storage error: {0}")]
    Storage(String),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP client construction errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for feedrelay setup operations
///
/// Uses `anyhow::Error` so wiring code can attach context while
/// propagating any of the component errors.
pub type Result<T> = anyhow::Result<T>;
