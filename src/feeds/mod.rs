//! Feed snapshots, parsing, retrieval and refresh scheduling.

pub mod fetcher;
pub mod model;
pub mod parser;
pub mod refresh;

pub use fetcher::{FeedFetcher, FetchError, HttpFeedFetcher};
pub use model::{Enclosure, Feed, Image, Item};
pub use parser::{parse_feed, ParseError};
pub use refresh::{next_refresh, FeedSchedule};
