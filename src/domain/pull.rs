use std::fmt;

use crate::app::BrookError;

use super::Feed;

/// Where a feed stands within one pull batch. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullStatus {
    Idle,
    Pulling,
    Success,
    Fail,
}

impl fmt::Display for PullStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PullStatus::Idle => "idle",
            PullStatus::Pulling => "pulling",
            PullStatus::Success => "success",
            PullStatus::Fail => "fail",
        };
        f.write_str(s)
    }
}

/// One element of the `pull_feeds` stream.
///
/// `feed` is set only when the pull produced unread entries; those entries
/// are inlined in `feed.entries`.
#[derive(Debug)]
pub struct PullResult {
    pub feed_url: Option<String>,
    pub feed: Option<Feed>,
    pub error: Option<BrookError>,
    pub status: PullStatus,
}

impl PullResult {
    /// Emitted alone when the working set is empty.
    pub fn sentinel() -> Self {
        Self {
            feed_url: None,
            feed: None,
            error: None,
            status: PullStatus::Idle,
        }
    }

    pub fn success(feed_url: String, feed: Option<Feed>) -> Self {
        Self {
            feed_url: Some(feed_url),
            feed,
            error: None,
            status: PullStatus::Success,
        }
    }

    pub fn failed(feed_url: String, error: BrookError) -> Self {
        Self {
            feed_url: Some(feed_url),
            feed: None,
            error: Some(error),
            status: PullStatus::Fail,
        }
    }

    pub fn is_sentinel(&self) -> bool {
        self.feed_url.is_none() && self.feed.is_none() && self.error.is_none()
    }
}
