use super::{EntryId, FeedId};

/// A partial update of one feed. Absent fields leave the row unchanged.
#[derive(Debug, Clone, Default)]
pub struct FeedEdit {
    pub id: FeedId,
    pub title: Option<String>,
    pub feed_url: Option<String>,
    pub description: Option<String>,
    pub site_url: Option<String>,
    pub is_starred: Option<bool>,
    /// Replaces the whole tag set when present.
    pub tags: Option<Vec<String>>,
}

impl FeedEdit {
    pub fn new(id: FeedId) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }
}

/// A partial update of one entry's annotations.
#[derive(Debug, Clone, Default)]
pub struct EntryEdit {
    pub id: EntryId,
    pub is_read: Option<bool>,
    pub is_bookmarked: Option<bool>,
}

impl EntryEdit {
    pub fn new(id: EntryId) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }

    pub fn read(id: EntryId, is_read: bool) -> Self {
        Self {
            id,
            is_read: Some(is_read),
            is_bookmarked: None,
        }
    }
}
