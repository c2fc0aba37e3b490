//! The feed parser port.
//!
//! The store only ever sees [`FeedParser`]; [`HttpParser`] is the production
//! implementation and tests substitute a scripted mock.

pub mod http;
#[cfg(test)]
pub(crate) mod mock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use crate::app::Result;

pub use http::HttpParser;

/// A fetched and decoded feed document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedFeed {
    pub title: String,
    /// The feed's own URL as advertised by the document; may be empty.
    pub feed_link: String,
    pub description: String,
    pub site_link: String,
    pub updated: Option<DateTime<Utc>>,
    pub items: Vec<ParsedItem>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedItem {
    pub external_id: String,
    pub link: String,
    pub title: String,
    pub description: String,
    pub content: String,
    pub published: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
}

impl ParsedFeed {
    /// Advertised update time, else the latest item time, else `None`.
    pub fn effective_update_time(&self) -> Option<DateTime<Utc>> {
        self.updated
            .or_else(|| self.items.iter().filter_map(|i| i.effective_update_time()).max())
    }
}

impl ParsedItem {
    pub fn effective_update_time(&self) -> Option<DateTime<Utc>> {
        self.updated.or(self.published)
    }

    pub fn effective_pub_time(&self) -> Option<DateTime<Utc>> {
        self.published
    }
}

#[async_trait]
pub trait FeedParser: Send + Sync {
    /// Fetch and decode the feed at `url`.
    ///
    /// Must return [`BrookError::Canceled`](crate::app::BrookError::Canceled)
    /// promptly once `cancel` fires.
    async fn parse(&self, url: &str, cancel: &CancellationToken) -> Result<ParsedFeed>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> Option<DateTime<Utc>> {
        Some(s.parse().unwrap())
    }

    #[test]
    fn test_feed_update_time_prefers_advertised() {
        let feed = ParsedFeed {
            updated: at("2022-01-01T00:00:00Z"),
            items: vec![ParsedItem {
                updated: at("2023-01-01T00:00:00Z"),
                ..Default::default()
            }],
            ..Default::default()
        };
        assert_eq!(feed.effective_update_time(), at("2022-01-01T00:00:00Z"));
    }

    #[test]
    fn test_feed_update_time_falls_back_to_latest_item() {
        let feed = ParsedFeed {
            items: vec![
                ParsedItem {
                    published: at("2022-03-01T00:00:00Z"),
                    ..Default::default()
                },
                ParsedItem {
                    updated: at("2022-02-01T00:00:00Z"),
                    published: at("2022-05-01T00:00:00Z"),
                    ..Default::default()
                },
                ParsedItem::default(),
            ],
            ..Default::default()
        };
        assert_eq!(feed.effective_update_time(), at("2022-03-01T00:00:00Z"));
    }

    #[test]
    fn test_feed_update_time_none_without_times() {
        let feed = ParsedFeed {
            items: vec![ParsedItem::default()],
            ..Default::default()
        };
        assert_eq!(feed.effective_update_time(), None);
    }

    #[test]
    fn test_item_times() {
        let item = ParsedItem {
            published: at("2022-07-01T00:00:00Z"),
            ..Default::default()
        };
        assert_eq!(item.effective_update_time(), at("2022-07-01T00:00:00Z"));
        assert_eq!(item.effective_pub_time(), at("2022-07-01T00:00:00Z"));

        let item = ParsedItem {
            updated: at("2022-07-16T23:39:07Z"),
            ..Default::default()
        };
        assert_eq!(item.effective_update_time(), at("2022-07-16T23:39:07Z"));
        assert_eq!(item.effective_pub_time(), None);
    }
}
