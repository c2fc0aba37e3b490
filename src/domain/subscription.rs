use serde::{Deserialize, Serialize};

use super::NewFeed;

/// The portable subscription list used by import and export.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub title: Option<String>,
    pub feeds: Vec<SubscriptionFeed>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionFeed {
    pub feed_url: String,
    pub title: String,
    pub site_url: Option<String>,
    pub description: Option<String>,
    /// `None` when the source cannot express starring.
    pub is_starred: Option<bool>,
    pub tags: Vec<String>,
}

impl SubscriptionFeed {
    pub fn new(feed_url: impl Into<String>) -> Self {
        Self {
            feed_url: feed_url.into(),
            ..Default::default()
        }
    }
}

impl From<&SubscriptionFeed> for NewFeed {
    fn from(feed: &SubscriptionFeed) -> Self {
        NewFeed {
            url: feed.feed_url.clone(),
            title: (!feed.title.is_empty()).then(|| feed.title.clone()),
            description: feed.description.clone(),
            site_url: feed.site_url.clone(),
            is_starred: feed.is_starred,
            tags: feed.tags.clone(),
        }
    }
}

/// Counts of feeds and entries by status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub feeds: i64,
    pub starred_feeds: i64,
    pub entries: i64,
    pub unread_entries: i64,
    pub read_entries: i64,
    pub bookmarked_entries: i64,
    pub tags: i64,
}
