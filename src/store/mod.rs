mod entries;
mod feeds;
mod migrations;
mod pull;
mod record;
pub mod sqlite;
mod stats;
mod subscription;
mod tags;


use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::app::Result;
use crate::domain::{
    Entry, EntryEdit, EntryId, Feed, FeedEdit, FeedId, NewFeed, PullResult, Stats, Subscription,
};

pub use sqlite::SqliteStore;

/// The datastore operations exposed to front ends.
///
/// Every operation takes the caller's cancellation token and runs under the
/// store's single writer lock. An empty id list means "every feed" wherever a
/// list of feed ids selects feeds.
#[async_trait]
pub trait Store: Send + Sync {
    // Feed operations

    /// Fetches `feed.url`, then creates the feed or edits the existing one.
    /// Returns the stored feed and whether it was newly created.
    async fn add_feed(&self, cancel: &CancellationToken, feed: NewFeed) -> Result<(Feed, bool)>;
    async fn edit_feeds(&self, cancel: &CancellationToken, edits: Vec<FeedEdit>) -> Result<Vec<Feed>>;
    async fn delete_feeds(&self, cancel: &CancellationToken, ids: Vec<FeedId>) -> Result<()>;
    async fn get_feed(&self, cancel: &CancellationToken, id: FeedId) -> Result<Feed>;
    async fn list_feeds(&self, cancel: &CancellationToken) -> Result<Vec<Feed>>;
    async fn list_tags(&self, cancel: &CancellationToken) -> Result<Vec<String>>;

    // Entry operations
    async fn edit_entries(
        &self,
        cancel: &CancellationToken,
        edits: Vec<EntryEdit>,
    ) -> Result<Vec<Entry>>;
    async fn get_entry(&self, cancel: &CancellationToken, id: EntryId) -> Result<Entry>;
    async fn list_entries(
        &self,
        cancel: &CancellationToken,
        feed_ids: Vec<FeedId>,
        is_read: Option<bool>,
    ) -> Result<Vec<Entry>>;

    // Refresh

    /// Refreshes the working set concurrently and streams one result per feed
    /// (a single sentinel when there is nothing to pull). The stream closes
    /// once every feed has reported.
    async fn pull_feeds(
        &self,
        cancel: CancellationToken,
        ids: Vec<FeedId>,
    ) -> Result<mpsc::Receiver<PullResult>>;

    // Subscription I/O

    /// Returns `(processed, imported)`.
    async fn import_subscription(
        &self,
        cancel: &CancellationToken,
        subscription: Subscription,
    ) -> Result<(usize, usize)>;
    async fn export_subscription(&self, cancel: &CancellationToken) -> Result<Subscription>;

    async fn stats(&self, cancel: &CancellationToken) -> Result<Stats>;
}
