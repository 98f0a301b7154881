//! RSS and Atom parsing into [`Feed`] snapshots.
//!
//! Documents are read with `feed-rs`, which covers RSS 0.9x/1.0/2.0, Atom
//! and JSON Feed together with their common namespaces. This module only
//! maps its model onto the fields the relay carries.

use chrono::{DateTime, Duration, Utc};
use feed_rs::model;
use feed_rs::parser::ParseFeedError;
use thiserror::Error;

use super::model::{Enclosure, Feed, Image, Item};

/// Errors raised while turning a document into a [`Feed`].
#[derive(Error, Debug)]
pub enum ParseError {
    /// The document is blank.
    #[error("document is empty")]
    Empty,

    /// The document is not a recognised feed.
    #[error("invalid feed document: {0}")]
    Invalid(#[from] ParseFeedError),
}

/// Parse a feed document fetched from `url`.
///
/// `fetched_at` anchors the refresh hint derived from RSS `<ttl>`.
pub fn parse_feed(url: &str, body: &str, fetched_at: DateTime<Utc>) -> Result<Feed, ParseError> {
    if body.trim().is_empty() {
        return Err(ParseError::Empty);
    }
    let parsed = feed_rs::parser::parse(body.as_bytes())?;
    Ok(map_feed(url, parsed, fetched_at))
}

fn map_feed(url: &str, feed: model::Feed, fetched_at: DateTime<Utc>) -> Feed {
    let refresh_hint = feed
        .ttl
        .filter(|minutes| *minutes > 0)
        .and_then(|minutes| Duration::try_minutes(i64::from(minutes)))
        .and_then(|ttl| fetched_at.checked_add_signed(ttl));
    let author = feed
        .authors
        .iter()
        .chain(feed.contributors.iter())
        .map(person_name)
        .find(|name| !name.is_empty())
        .unwrap_or_default();
    let image = feed
        .logo
        .as_ref()
        .or(feed.icon.as_ref())
        .and_then(feed_image);

    Feed {
        url: url.to_string(),
        link: alternate_link(&feed.links),
        title: text(&feed.title),
        author,
        description: text(&feed.description),
        language: feed.language.map(|l| l.trim().to_string()).unwrap_or_default(),
        categories: categories(&feed.categories),
        image,
        items: feed.entries.into_iter().map(map_entry).collect(),
        refresh_hint,
    }
}

fn map_entry(entry: model::Entry) -> Item {
    let id = Some(entry.id.trim().to_string()).filter(|id| !id.is_empty());
    let content = entry
        .content
        .as_ref()
        .and_then(|c| c.body.as_deref())
        .map(|body| body.trim().to_string())
        .unwrap_or_default();

    let mut enclosures: Vec<Enclosure> = entry
        .media
        .iter()
        .flat_map(|media| media.content.iter())
        .filter_map(|content| {
            let url = content.url.as_ref()?.to_string();
            Some(Enclosure {
                mime_type: content
                    .content_type
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_default(),
                url,
            })
        })
        .collect();
    for link in entry
        .links
        .iter()
        .filter(|l| l.rel.as_deref() == Some("enclosure"))
    {
        let url = link.href.trim();
        if !enclosures.iter().any(|e| e.url == url) {
            enclosures.push(Enclosure {
                mime_type: link.media_type.clone().unwrap_or_default(),
                url: url.to_string(),
            });
        }
    }

    let image = entry
        .media
        .iter()
        .flat_map(|media| media.thumbnails.iter())
        .map(|thumbnail| thumbnail.image.uri.trim().to_string())
        .find(|uri| !uri.is_empty())
        .map(|url| Image {
            title: String::new(),
            url,
        });

    Item {
        id,
        title: text(&entry.title),
        summary: text(&entry.summary),
        content,
        link: alternate_link(&entry.links),
        published: entry.published.or(entry.updated),
        categories: categories(&entry.categories),
        image,
        enclosures,
    }
}

fn text(value: &Option<model::Text>) -> String {
    value
        .as_ref()
        .map(|t| t.content.trim().to_string())
        .unwrap_or_default()
}

fn alternate_link(links: &[model::Link]) -> String {
    links
        .iter()
        .filter(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
        .map(|l| l.href.trim())
        .find(|href| !href.is_empty())
        .unwrap_or_default()
        .to_string()
}

fn categories(categories: &[model::Category]) -> Vec<String> {
    categories
        .iter()
        .map(|c| c.term.trim())
        .filter(|term| !term.is_empty())
        .map(str::to_string)
        .collect()
}

fn person_name(person: &model::Person) -> String {
    let name = person.name.trim();
    if name.is_empty() {
        person.email.as_deref().unwrap_or_default().trim().to_string()
    } else {
        name.to_string()
    }
}

fn feed_image(image: &model::Image) -> Option<Image> {
    let url = image.uri.trim().to_string();
    let title = image
        .title
        .as_deref()
        .map(str::trim)
        .unwrap_or_default()
        .to_string();
    if url.is_empty() && title.is_empty() {
        None
    } else {
        Some(Image { title, url })
    }
}
