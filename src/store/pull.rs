//! The pull engine: concurrent refresh of a working set of feeds.
//!
//! One task per feed parses and commits in its own transaction; a merger task
//! forwards their results into the caller's channel as they complete. The
//! writer lock is held by the merger until the last task has reported, so the
//! whole batch is serialized against every other store operation.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;

use crate::app::{BrookError, Result, ResultExt};
use crate::domain::{Feed, FeedId, PullResult, PullStatus};
use crate::parser::ParsedFeed;
use crate::store::{entries, feeds, SqliteStore};

impl SqliteStore {
    pub(crate) async fn pull(
        &self,
        cancel: CancellationToken,
        ids: Vec<FeedId>,
    ) -> Result<mpsc::Receiver<PullResult>> {
        // Cancellation while queued behind another operation still reports
        // one failure per feed rather than failing the call.
        let writer = self.acquire(&cancel).await.ok();
        let batch_start = Utc::now();
        let targets = self.with_conn(|conn| feeds::pull_targets(conn, &ids))?;

        let (tx, rx) = mpsc::channel(targets.len().max(1));
        if targets.is_empty() {
            tracing::debug!(parent: &self.span, "Nothing to pull");
            let _ = tx.try_send(PullResult::sentinel());
            return Ok(rx);
        }

        let Some(writer) = writer else {
            tracing::debug!(parent: &self.span, "Pull canceled before taking the writer lock");
            for (_, url) in targets {
                let _ = tx.try_send(PullResult::failed(url, BrookError::Canceled));
            }
            return Ok(rx);
        };

        tracing::info!(parent: &self.span, "Pulling {} feeds", targets.len());

        let semaphore = Arc::new(Semaphore::new(self.workers));
        let tasks = FuturesUnordered::new();
        for (id, url) in targets {
            let store = self.clone();
            let cancel = cancel.clone();
            let semaphore = semaphore.clone();
            let task_url = url.clone();

            let handle = tokio::spawn(async move {
                store
                    .pull_one(id, task_url, batch_start, &cancel, &semaphore)
                    .await
            });

            tasks.push(async move {
                match handle.await {
                    Ok(result) => result,
                    Err(e) => PullResult::failed(
                        url,
                        BrookError::Internal(format!("pull task failed: {e}")),
                    ),
                }
            });
        }

        let span = self.span.clone();
        tokio::spawn(merge(tasks, tx, writer, span));

        Ok(rx)
    }

    async fn pull_one(
        &self,
        id: FeedId,
        url: String,
        batch_start: DateTime<Utc>,
        cancel: &CancellationToken,
        semaphore: &Semaphore,
    ) -> PullResult {
        let _permit = tokio::select! {
            biased;
            _ = cancel.cancelled() => return PullResult::failed(url, BrookError::Canceled),
            permit = semaphore.acquire() => match permit {
                Ok(permit) => permit,
                Err(e) => return PullResult::failed(url, BrookError::Internal(e.to_string())),
            },
        };

        let parsed = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(BrookError::Canceled),
            parsed = self.parser.parse(&url, cancel) => parsed,
        };

        let outcome = parsed.and_then(|parsed| self.commit_pull(id, &parsed, batch_start, cancel));
        match outcome.op("PullFeeds") {
            Ok(feed) => {
                tracing::debug!(
                    parent: &self.span,
                    "Pulled {} ({} new entries)",
                    url,
                    feed.as_ref().map_or(0, |f| f.entries.len())
                );
                PullResult::success(url, feed)
            }
            Err(e) => {
                tracing::warn!(parent: &self.span, "Failed to pull {}: {}", url, e);
                PullResult::failed(url, e)
            }
        }
    }

    /// Writes one feed's pull in a single transaction.
    ///
    /// Returns the feed with the entries this pull created or reset to unread,
    /// or `None` when nothing new arrived.
    fn commit_pull(
        &self,
        id: FeedId,
        parsed: &ParsedFeed,
        batch_start: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> Result<Option<Feed>> {
        self.with_tx(cancel, |tx| {
            feeds::record_pull(tx, id, parsed.effective_update_time(), batch_start)?;

            let changed: Vec<_> = entries::upsert_entries(tx, id, &parsed.items)?
                .into_iter()
                .filter_map(|u| u.changed())
                .collect();
            let fresh = entries::unread_among(tx, &changed)?;
            if fresh.is_empty() {
                return Ok(None);
            }

            let mut feed = feeds::get_feed(tx, id)?;
            feed.entries = fresh;
            Ok(Some(feed))
        })
    }
}

/// Forwards task results to `tx` until every task has finished, then releases
/// the writer lock. The channel closes when `tx` drops here.
async fn merge<F>(
    mut tasks: FuturesUnordered<F>,
    tx: mpsc::Sender<PullResult>,
    writer: tokio::sync::OwnedMutexGuard<()>,
    span: tracing::Span,
) where
    F: std::future::Future<Output = PullResult>,
{
    let (mut succeeded, mut failed) = (0usize, 0usize);
    let mut receiver_gone = false;

    while let Some(result) = tasks.next().await {
        match result.status {
            PullStatus::Success => succeeded += 1,
            PullStatus::Fail => failed += 1,
            PullStatus::Idle | PullStatus::Pulling => {}
        }
        // Keep draining after the receiver hangs up so the lock is only
        // released once every task is done writing.
        if !receiver_gone && tx.send(result).await.is_err() {
            tracing::debug!(parent: &span, "Pull receiver dropped");
            receiver_gone = true;
        }
    }

    drop(writer);
    tracing::info!(
        parent: &span,
        "Pull finished: {} succeeded, {} failed",
        succeeded,
        failed
    );
}
