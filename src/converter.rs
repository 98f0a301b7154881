//! Feed item to canonical event conversion.
//!
//! Conversion is pure apart from the generated event id: the same feed and
//! item always yield the same attributes and metadata.

use std::collections::BTreeMap;

use tracing::debug;
use url::Url;
use uuid::Uuid;

use crate::config::MessageConfig;
use crate::event::{CanonicalEvent, EventBody, MetadataValue};
use crate::feeds::{Feed, Item};
use crate::watermark::ZERO;

/// Builds canonical events from feed items.
#[derive(Debug, Clone)]
pub struct EventConverter {
    config: MessageConfig,
}

impl EventConverter {
    /// Creates a converter using the configured event shape and key names.
    pub fn new(config: MessageConfig) -> Self {
        Self { config }
    }

    /// Convert one item of `feed` into an event.
    ///
    /// Empty source fields produce no metadata entry. A feed image url that
    /// is not a valid absolute URI is left out instead of failing the item.
    /// The event source is the feed link, or the fetch url when the feed
    /// advertises none.
    pub fn convert(&self, feed: &Feed, item: &Item) -> CanonicalEvent {
        let source = match feed.link.trim() {
            "" => feed.url.clone(),
            link => link.to_string(),
        };

        let keys = &self.config.metadata;
        let mut metadata = BTreeMap::new();

        put_text(&mut metadata, &keys.key_author, &feed.author);
        put_text(
            &mut metadata,
            &keys.key_feed_categories,
            &feed.categories.join(" "),
        );
        put_text(&mut metadata, &keys.key_feed_description, &feed.description);
        if let Some(image) = &feed.image {
            put_text(&mut metadata, &keys.key_feed_image_title, &image.title);
            put_uri(&mut metadata, &keys.key_feed_image_url, &image.url);
        }
        put_text(&mut metadata, &keys.key_language, &feed.language);
        put_text(&mut metadata, &keys.key_feed_title, &feed.title);

        if let Some(id) = &item.id {
            put_text(&mut metadata, &keys.key_guid, id);
        }
        put_text(
            &mut metadata,
            &keys.key_categories,
            &item.categories.join(" "),
        );
        match &item.image {
            Some(image) => {
                put_text(&mut metadata, &keys.key_image_title, &image.title);
                put_text(&mut metadata, &keys.key_image_url, &image.url);
            }
            None => {
                if let Some(enclosure) = item.enclosures.iter().find(|e| e.is_image()) {
                    put_text(&mut metadata, &keys.key_image_url, &enclosure.url);
                }
            }
        }
        put_text(&mut metadata, &keys.key_summary, &item.summary);
        put_text(&mut metadata, &keys.key_title, &item.title);

        let body = (!item.content.is_empty()).then(|| EventBody {
            content_type: self.config.content_type.clone(),
            data: item.content.clone(),
        });

        CanonicalEvent {
            id: Uuid::new_v4().to_string(),
            spec_version: self.config.spec_version.clone(),
            event_type: self.config.event_type.clone(),
            source,
            subject: item.link.clone(),
            time: item.published.unwrap_or(ZERO),
            body,
            metadata,
        }
    }
}

fn put_text(metadata: &mut BTreeMap<String, MetadataValue>, key: &str, value: &str) {
    if !value.is_empty() {
        metadata.insert(key.to_string(), MetadataValue::String(value.to_string()));
    }
}

fn put_uri(metadata: &mut BTreeMap<String, MetadataValue>, key: &str, value: &str) {
    if value.is_empty() {
        return;
    }
    match Url::parse(value) {
        Ok(uri) => {
            metadata.insert(key.to_string(), MetadataValue::Uri(uri));
        }
        Err(e) => debug!(key = %key, value = %value, error = %e, "Skipping invalid URI attribute"),
    }
}
