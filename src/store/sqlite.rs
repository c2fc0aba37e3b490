use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{Connection, Transaction};
use tokio::sync::{mpsc, OwnedMutexGuard};
use tokio_util::sync::CancellationToken;
use tracing::Span;

use crate::app::{BrookError, Result, ResultExt};
use crate::domain::{
    Entry, EntryEdit, EntryId, Feed, FeedEdit, FeedId, NewFeed, PullResult, Stats, Subscription,
};
use crate::parser::FeedParser;
use crate::store::{entries, feeds, migrations, stats, subscription, tags, Store};

pub const DEFAULT_WORKERS: usize = 10;
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// A feed store backed by a single SQLite file.
///
/// Cloning is cheap; clones share the connection and the writer lock.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Option<Connection>>>,
    writer: Arc<tokio::sync::Mutex<()>>,
    pub(crate) parser: Arc<dyn FeedParser>,
    pub(crate) workers: usize,
    pub(crate) span: Span,
}

impl SqliteStore {
    /// Open (or create) the store at `path` and migrate it to the latest schema.
    pub fn open<P: AsRef<Path>>(path: P, parser: Arc<dyn FeedParser>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path).op("Open")?;
        let span = tracing::info_span!("store", path = %path.display());
        Self::init(conn, parser, span).op("Open")
    }

    pub fn in_memory(parser: Arc<dyn FeedParser>) -> Result<Self> {
        let conn = Connection::open_in_memory().op("Open")?;
        let span = tracing::info_span!("store", path = ":memory:");
        Self::init(conn, parser, span).op("Open")
    }

    fn init(mut conn: Connection, parser: Arc<dyn FeedParser>, span: Span) -> Result<Self> {
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get::<_, String>(0))?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        migrations::run(&mut conn)?;

        tracing::debug!(parent: &span, "Store opened");
        Ok(Self {
            conn: Arc::new(Mutex::new(Some(conn))),
            writer: Arc::new(tokio::sync::Mutex::new(())),
            parser,
            workers: DEFAULT_WORKERS,
            span,
        })
    }

    /// Replace the span store log events are recorded under.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Maximum number of concurrent parses within one pull batch.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Waits for in-flight operations, then closes the connection.
    ///
    /// Every later operation on this store or its clones fails.
    pub async fn close(&self) -> Result<()> {
        let _writer = self.writer.lock().await;
        let conn = self
            .conn
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(conn) = conn {
            conn.close().map_err(|(_, e)| e).op("Close")?;
            tracing::debug!(parent: &self.span, "Store closed");
        }
        Ok(())
    }

    /// Takes the writer lock, giving up if `cancel` fires first.
    pub(crate) async fn acquire(&self, cancel: &CancellationToken) -> Result<OwnedMutexGuard<()>> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(BrookError::Canceled),
            guard = self.writer.clone().lock_owned() => Ok(guard),
        }
    }

    pub(crate) fn with_conn<T>(&self, f: impl FnOnce(&mut Connection) -> Result<T>) -> Result<T> {
        // A panic inside `with_tx` has already rolled its transaction back, so
        // a poisoned connection is still consistent.
        let mut guard = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        let conn = guard
            .as_mut()
            .ok_or_else(|| BrookError::Internal("store is closed".into()))?;
        f(conn)
    }

    /// Runs `f` inside one transaction.
    ///
    /// Commits when `f` returns `Ok` and the token is still live; any error,
    /// cancellation or panic rolls back, because an uncommitted
    /// [`Transaction`] rolls back when dropped.
    pub(crate) fn with_tx<T>(
        &self,
        cancel: &CancellationToken,
        f: impl FnOnce(&Transaction<'_>) -> Result<T>,
    ) -> Result<T> {
        self.with_conn(|conn| {
            if cancel.is_cancelled() {
                return Err(BrookError::Canceled);
            }
            let tx = conn.transaction()?;
            let out = f(&tx)?;
            if cancel.is_cancelled() {
                return Err(BrookError::Canceled);
            }
            tx.commit()?;
            Ok(out)
        })
    }

    async fn add_feed_inner(&self, cancel: &CancellationToken, feed: NewFeed) -> Result<(Feed, bool)> {
        url::Url::parse(&feed.url)
            .map_err(|e| BrookError::Invalid(format!("feed url {:?}: {}", feed.url, e)))?;

        let _writer = self.acquire(cancel).await?;
        let parsed = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(BrookError::Canceled),
            parsed = self.parser.parse(&feed.url, cancel) => parsed,
        }?;

        let mut feed = feed;
        if let Some(link) = canonical_link(&parsed.feed_link) {
            feed.url = link;
        }

        let now = Utc::now();
        let (stored, added) = self.with_tx(cancel, |tx| {
            let (id, added) = feeds::upsert_feed(tx, &feed, Some(&parsed), now)?;
            entries::upsert_entries(tx, id, &parsed.items)?;
            tags::set_feed_tags(tx, id, &feed.tags)?;
            Ok((feeds::get_feed_with_entries(tx, id)?, added))
        })?;

        tracing::info!(
            parent: &self.span,
            "{} feed {} ({} entries)",
            if added { "Added" } else { "Updated" },
            stored.feed_url,
            stored.entries.len()
        );
        Ok((stored, added))
    }
}

/// The document's self link when it is a usable absolute URL.
fn canonical_link(feed_link: &str) -> Option<String> {
    let link = feed_link.trim();
    if link.is_empty() {
        return None;
    }
    url::Url::parse(link).ok().map(|_| link.to_string())
}

#[async_trait]
impl Store for SqliteStore {
    async fn add_feed(&self, cancel: &CancellationToken, feed: NewFeed) -> Result<(Feed, bool)> {
        self.add_feed_inner(cancel, feed).await.op("AddFeed")
    }

    async fn edit_feeds(&self, cancel: &CancellationToken, edits: Vec<FeedEdit>) -> Result<Vec<Feed>> {
        async {
            let _writer = self.acquire(cancel).await?;
            self.with_tx(cancel, |tx| feeds::edit_feeds(tx, &edits))
        }
        .await
        .op("EditFeeds")
    }

    async fn delete_feeds(&self, cancel: &CancellationToken, ids: Vec<FeedId>) -> Result<()> {
        async {
            let _writer = self.acquire(cancel).await?;
            let deleted = self.with_tx(cancel, |tx| feeds::delete_feeds(tx, &ids))?;
            tracing::info!(parent: &self.span, "Deleted {} feeds", deleted);
            Ok::<_, BrookError>(())
        }
        .await
        .op("DeleteFeeds")
    }

    async fn get_feed(&self, cancel: &CancellationToken, id: FeedId) -> Result<Feed> {
        async {
            let _writer = self.acquire(cancel).await?;
            self.with_tx(cancel, |tx| feeds::get_feed_with_entries(tx, id))
        }
        .await
        .op("GetFeed")
    }

    async fn list_feeds(&self, cancel: &CancellationToken) -> Result<Vec<Feed>> {
        async {
            let _writer = self.acquire(cancel).await?;
            self.with_tx(cancel, |tx| feeds::list_feeds_with_entries(tx))
        }
        .await
        .op("ListFeeds")
    }

    async fn list_tags(&self, cancel: &CancellationToken) -> Result<Vec<String>> {
        async {
            let _writer = self.acquire(cancel).await?;
            self.with_tx(cancel, |tx| tags::list_tags(tx))
        }
        .await
        .op("ListTags")
    }

    async fn edit_entries(
        &self,
        cancel: &CancellationToken,
        edits: Vec<EntryEdit>,
    ) -> Result<Vec<Entry>> {
        async {
            let _writer = self.acquire(cancel).await?;
            self.with_tx(cancel, |tx| entries::edit_entries(tx, &edits))
        }
        .await
        .op("EditEntries")
    }

    async fn get_entry(&self, cancel: &CancellationToken, id: EntryId) -> Result<Entry> {
        async {
            let _writer = self.acquire(cancel).await?;
            self.with_tx(cancel, |tx| entries::get_entry(tx, id))
        }
        .await
        .op("GetEntry")
    }

    async fn list_entries(
        &self,
        cancel: &CancellationToken,
        feed_ids: Vec<FeedId>,
        is_read: Option<bool>,
    ) -> Result<Vec<Entry>> {
        async {
            let _writer = self.acquire(cancel).await?;
            self.with_tx(cancel, |tx| entries::list_entries(tx, &feed_ids, is_read))
        }
        .await
        .op("ListEntries")
    }

    async fn pull_feeds(
        &self,
        cancel: CancellationToken,
        ids: Vec<FeedId>,
    ) -> Result<mpsc::Receiver<PullResult>> {
        self.pull(cancel, ids).await.op("PullFeeds")
    }

    async fn import_subscription(
        &self,
        cancel: &CancellationToken,
        document: Subscription,
    ) -> Result<(usize, usize)> {
        async {
            let _writer = self.acquire(cancel).await?;
            let now = Utc::now();
            let (processed, imported) = self.with_tx(cancel, |tx| {
                subscription::import(tx, &document, now)
            })?;
            tracing::info!(
                parent: &self.span,
                "Imported {} of {} subscribed feeds",
                imported,
                processed
            );
            Ok::<_, BrookError>((processed, imported))
        }
        .await
        .op("ImportSubscription")
    }

    async fn export_subscription(&self, cancel: &CancellationToken) -> Result<Subscription> {
        async {
            let _writer = self.acquire(cancel).await?;
            self.with_tx(cancel, |tx| subscription::export(tx))
        }
        .await
        .op("ExportSubscription")
    }

    async fn stats(&self, cancel: &CancellationToken) -> Result<Stats> {
        async {
            let _writer = self.acquire(cancel).await?;
            self.with_tx(cancel, |tx| stats::stats(tx))
        }
        .await
        .op("Stats")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::mock::MockParser;

    #[test]
    fn test_canonical_link() {
        assert_eq!(canonical_link(""), None);
        assert_eq!(canonical_link("/feed.xml"), None);
        assert_eq!(
            canonical_link(" https://example.com/feed.xml "),
            Some("https://example.com/feed.xml".into())
        );
    }

    #[test]
    fn test_with_tx_rolls_back_on_error() {
        let store = SqliteStore::in_memory(Arc::new(MockParser::new())).unwrap();
        let cancel = CancellationToken::new();

        let result: Result<()> = store.with_tx(&cancel, |tx| {
            tx.execute("INSERT INTO tags (name) VALUES ('kept?')", [])?;
            Err(BrookError::Invalid("boom".into()))
        });
        assert!(result.is_err());

        let count: i64 = store
            .with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM tags", [], |r| r.get(0))?))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_with_tx_rolls_back_on_panic() {
        let store = SqliteStore::in_memory(Arc::new(MockParser::new())).unwrap();
        let panicking = store.clone();

        let caught = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _: Result<()> = panicking.with_tx(&CancellationToken::new(), |tx| {
                tx.execute("INSERT INTO tags (name) VALUES ('lost')", [])?;
                panic!("fault inside transaction");
            });
        }));
        assert!(caught.is_err());

        let count: i64 = store
            .with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM tags", [], |r| r.get(0))?))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_with_tx_canceled_does_not_commit() {
        let store = SqliteStore::in_memory(Arc::new(MockParser::new())).unwrap();
        let cancel = CancellationToken::new();

        let result = store.with_tx(&cancel, |tx| {
            tx.execute("INSERT INTO tags (name) VALUES ('late')", [])?;
            cancel.cancel();
            Ok(())
        });
        assert!(result.unwrap_err().is_canceled());

        let count: i64 = store
            .with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM tags", [], |r| r.get(0))?))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_foreign_keys_enabled() {
        let store = SqliteStore::in_memory(Arc::new(MockParser::new())).unwrap();
        let enabled: i64 = store
            .with_conn(|conn| Ok(conn.query_row("PRAGMA foreign_keys", [], |r| r.get(0))?))
            .unwrap();
        assert_eq!(enabled, 1);
    }

    #[tokio::test]
    async fn test_operations_fail_after_close() {
        let store = SqliteStore::in_memory(Arc::new(MockParser::new())).unwrap();
        store.close().await.unwrap();
        // Closing twice is harmless.
        store.close().await.unwrap();

        let err = store.list_feeds(&CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err.root(), BrookError::Internal(_)));
    }

    #[tokio::test]
    async fn test_canceled_token_rejects_operation() {
        let store = SqliteStore::in_memory(Arc::new(MockParser::new())).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = store.stats(&cancel).await.unwrap_err();
        assert!(err.is_canceled());
        assert!(err.to_string().starts_with("Stats: "));
    }
}
