//! Canonical event representation.
//!
//! Events are shaped after CloudEvents 1.0 and serialised in its JSON
//! format: extension attributes are flattened next to the context
//! attributes and the body travels in `data` with `datacontenttype`.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use url::Url;

/// A metadata attribute value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum MetadataValue {
    /// Plain text.
    String(String),
    /// Validated absolute URI.
    Uri(Url),
}

impl MetadataValue {
    /// Textual form of the value.
    pub fn as_str(&self) -> &str {
        match self {
            MetadataValue::String(s) => s,
            MetadataValue::Uri(u) => u.as_str(),
        }
    }
}

/// Optional event payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventBody {
    /// MIME type of `data`.
    #[serde(rename = "datacontenttype")]
    pub content_type: String,
    /// Payload text.
    pub data: String,
}

/// Destination-agnostic event produced from one feed item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalEvent {
    /// Freshly generated identifier.
    pub id: String,

    /// CloudEvents spec version.
    #[serde(rename = "specversion")]
    pub spec_version: String,

    /// Event type.
    #[serde(rename = "type")]
    pub event_type: String,

    /// Feed link.
    pub source: String,

    /// Item link.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub subject: String,

    /// Item publish time; the epoch when the item carries none.
    pub time: DateTime<Utc>,

    /// Payload, absent when the item has no content.
    #[serde(flatten)]
    pub body: Option<EventBody>,

    /// Extension attributes keyed by configured names.
    #[serde(flatten)]
    pub metadata: BTreeMap<String, MetadataValue>,
}

impl CanonicalEvent {
    /// Metadata value under `key` as text.
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(MetadataValue::as_str)
    }
}
