//! Feed snapshot types.
//!
//! A [`Feed`] is a fresh snapshot of one source as returned by a
//! [`FeedFetcher`](super::FeedFetcher). Nothing here is cached between
//! cycles.

use chrono::{DateTime, Utc};

/// A feed snapshot, identified by the url it was fetched from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Feed {
    /// Url the snapshot was fetched from (feed identity).
    pub url: String,

    /// Site link advertised by the feed; becomes the event source.
    pub link: String,

    /// Feed title.
    pub title: String,

    /// Feed author or managing editor.
    pub author: String,

    /// Feed description or subtitle.
    pub description: String,

    /// Language tag (e.g. `en-us`).
    pub language: String,

    /// Feed-level categories in document order.
    pub categories: Vec<String>,

    /// Feed image or logo.
    pub image: Option<Image>,

    /// Items in document order (not necessarily chronological).
    pub items: Vec<Item>,

    /// Advisory instant after which the publisher suggests re-fetching.
    pub refresh_hint: Option<DateTime<Utc>>,
}

impl Feed {
    /// Latest known publish time across all items, ignoring items without one.
    pub fn max_published(&self) -> Option<DateTime<Utc>> {
        self.items.iter().filter_map(|item| item.published).max()
    }
}

/// A single entry of a feed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Item {
    /// Publisher-assigned id (RSS guid / Atom id).
    pub id: Option<String>,

    /// Item title.
    pub title: String,

    /// Short description.
    pub summary: String,

    /// Full content, if the feed carries one.
    pub content: String,

    /// Item link; becomes the event subject.
    pub link: String,

    /// Publish time. `None` when the feed omits it or it cannot be parsed.
    pub published: Option<DateTime<Utc>>,

    /// Item-level categories in document order.
    pub categories: Vec<String>,

    /// Explicit item image.
    pub image: Option<Image>,

    /// Attached media in document order.
    pub enclosures: Vec<Enclosure>,
}

/// Image reference with an optional caption.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Image {
    /// Caption or alt text; may be empty.
    pub title: String,

    /// Image location; may be empty.
    pub url: String,
}

/// Media attachment of an item.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Enclosure {
    /// MIME type as declared by the feed (e.g. `image/jpeg`).
    pub mime_type: String,

    /// Attachment location.
    pub url: String,
}

impl Enclosure {
    /// Whether the declared MIME type is an image type.
    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }
}
