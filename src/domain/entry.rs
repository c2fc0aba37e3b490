use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{EntryId, FeedId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub id: EntryId,
    pub feed_id: FeedId,
    pub external_id: String,
    pub title: String,
    pub url: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub pub_time: Option<DateTime<Utc>>,
    pub update_time: Option<DateTime<Utc>>,
    pub is_read: bool,
    pub is_bookmarked: bool,
}

impl Entry {
    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            "(Untitled)"
        } else {
            &self.title
        }
    }

    /// Get the best available content for display
    pub fn display_content(&self) -> &str {
        self.content
            .as_deref()
            .or(self.description.as_deref())
            .unwrap_or("")
    }

    /// The time entries are ordered by: last update, else publication.
    pub fn sort_time(&self) -> Option<DateTime<Utc>> {
        self.update_time.or(self.pub_time)
    }
}
