use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Entry, FeedId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feed {
    pub id: FeedId,
    pub feed_url: String,
    pub title: String,
    pub description: Option<String>,
    pub site_url: Option<String>,
    pub is_starred: bool,
    pub sub_time: DateTime<Utc>,
    pub update_time: Option<DateTime<Utc>>,
    pub last_pull_time: DateTime<Utc>,
    pub tags: Vec<String>,
    /// Inlined by `list_feeds`, `get_feed` and pull results; empty otherwise.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entries: Vec<Entry>,
}

impl Feed {
    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            &self.feed_url
        } else {
            &self.title
        }
    }

    pub fn unread_count(&self) -> usize {
        self.entries.iter().filter(|e| !e.is_read).count()
    }
}

/// Input of `add_feed` and of each document feed during import.
///
/// `None` fields fall back to what the parser reported on insert and leave the
/// stored value untouched when the feed already exists.
#[derive(Debug, Clone, Default)]
pub struct NewFeed {
    pub url: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub site_url: Option<String>,
    pub is_starred: Option<bool>,
    /// Replaces the feed's tags; an empty list clears them.
    pub tags: Vec<String>,
}

impl NewFeed {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(title: &str) -> Feed {
        let now = Utc::now();
        Feed {
            id: 1,
            feed_url: "https://example.com/feed.xml".into(),
            title: title.into(),
            description: None,
            site_url: None,
            is_starred: false,
            sub_time: now,
            update_time: None,
            last_pull_time: now,
            tags: vec![],
            entries: vec![],
        }
    }

    #[test]
    fn test_display_title_with_title() {
        assert_eq!(feed("My Blog").display_title(), "My Blog");
    }

    #[test]
    fn test_display_title_falls_back_to_url() {
        assert_eq!(feed("").display_title(), "https://example.com/feed.xml");
    }
}
