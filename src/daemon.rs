//! Periodic refresh of every feed.

use std::time::{Duration, Instant};

use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::app::{BrookError, Result};
use crate::domain::PullStatus;
use crate::store::Store;

/// Parse interval string like "1h", "30m", "6h", "1d", "45s" or bare seconds.
pub fn parse_interval(s: &str) -> Result<Duration> {
    let s = s.trim().to_lowercase();
    let invalid = || {
        BrookError::Invalid(format!(
            "interval {s:?}: use a form like '30s', '15m', '1h' or '1d'"
        ))
    };

    let (digits, unit) = match s.char_indices().last() {
        Some((i, c)) if c.is_ascii_alphabetic() => (&s[..i], c),
        _ => (s.as_str(), 's'),
    };
    let scale = match unit {
        's' => 1,
        'm' => 60,
        'h' => 3600,
        'd' => 86400,
        _ => return Err(invalid()),
    };

    let count: u64 = digits.parse().map_err(|_| invalid())?;
    let secs = count.checked_mul(scale).ok_or_else(invalid)?;
    if secs == 0 {
        return Err(BrookError::Invalid("interval must be positive".into()));
    }
    Ok(Duration::from_secs(secs))
}

/// Format interval for display
pub fn format_interval(interval: Duration) -> String {
    let secs = interval.as_secs();
    if secs >= 86400 && secs.is_multiple_of(86400) {
        format!("{}d", secs / 86400)
    } else if secs >= 3600 && secs.is_multiple_of(3600) {
        format!("{}h", secs / 3600)
    } else if secs >= 60 && secs.is_multiple_of(60) {
        format!("{}m", secs / 60)
    } else {
        format!("{}s", secs)
    }
}

/// Outcome of one scheduled pull batch.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub new_entries: usize,
}

/// Pulls every feed on a fixed interval until canceled.
pub struct Daemon<S> {
    store: S,
    interval: Duration,
    pull_on_start: bool,
}

impl<S: Store> Daemon<S> {
    pub fn new(store: S, interval: Duration) -> Self {
        Self {
            store,
            interval,
            pull_on_start: true,
        }
    }

    /// Whether the first batch runs immediately rather than after one interval.
    pub fn pull_on_start(mut self, yes: bool) -> Self {
        self.pull_on_start = yes;
        self
    }

    /// Runs until `cancel` fires. A batch in flight when that happens is
    /// drained (its remaining feeds report `Canceled`) before returning.
    pub async fn run(&self, cancel: CancellationToken) -> Result<()> {
        tracing::info!(
            "Daemon started (pull interval: {})",
            format_interval(self.interval)
        );

        let mut timer = interval(self.interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        if !self.pull_on_start {
            // The first tick completes immediately.
            timer.tick().await;
        }

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = timer.tick() => {}
            }

            match self.pull_once(&cancel).await {
                Ok(_) => {}
                Err(e) if e.is_canceled() => break,
                Err(e) => tracing::error!("Scheduled pull failed: {}", e),
            }
        }

        tracing::info!("Daemon shutting down");
        Ok(())
    }

    /// Pulls every feed once and waits for the batch to finish.
    pub async fn pull_once(&self, cancel: &CancellationToken) -> Result<BatchSummary> {
        let start = Instant::now();
        let mut results = self.store.pull_feeds(cancel.clone(), Vec::new()).await?;

        let mut summary = BatchSummary::default();
        while let Some(result) = results.recv().await {
            match result.status {
                PullStatus::Success => {
                    summary.succeeded += 1;
                    summary.new_entries += result.feed.map_or(0, |f| f.entries.len());
                }
                PullStatus::Fail => {
                    summary.failed += 1;
                    if let (Some(url), Some(err)) = (result.feed_url, result.error) {
                        if !err.is_canceled() {
                            tracing::warn!("Error pulling {}: {}", url, err);
                        }
                    }
                }
                PullStatus::Idle | PullStatus::Pulling => {
                    tracing::info!("No feeds to pull");
                }
            }
        }

        tracing::info!(
            "Pull complete: {} new entries, {} succeeded, {} failed ({:.1}s)",
            summary.new_entries,
            summary.succeeded,
            summary.failed,
            start.elapsed().as_secs_f64()
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::domain::NewFeed;
    use crate::parser::mock::{MockParser, Script};
    use crate::parser::{ParsedFeed, ParsedItem};
    use crate::store::SqliteStore;

    #[test]
    fn test_parse_interval() {
        assert_eq!(parse_interval("1h").unwrap(), Duration::from_secs(3600));
        assert_eq!(parse_interval("30m").unwrap(), Duration::from_secs(1800));
        assert_eq!(parse_interval("1d").unwrap(), Duration::from_secs(86400));
        assert_eq!(parse_interval("60s").unwrap(), Duration::from_secs(60));
        assert_eq!(parse_interval("3600").unwrap(), Duration::from_secs(3600));
        assert_eq!(parse_interval(" 6H ").unwrap(), Duration::from_secs(21600));
        assert!(parse_interval("invalid").is_err());
        assert!(parse_interval("5w").is_err());
        assert!(parse_interval("0m").is_err());
        assert!(parse_interval("").is_err());
    }

    #[test]
    fn test_format_interval() {
        assert_eq!(format_interval(Duration::from_secs(3600)), "1h");
        assert_eq!(format_interval(Duration::from_secs(1800)), "30m");
        assert_eq!(format_interval(Duration::from_secs(86400)), "1d");
        assert_eq!(format_interval(Duration::from_secs(90)), "90s");
        assert_eq!(format_interval(Duration::from_secs(7200)), "2h");
    }

    async fn store_with_feed(parser: &Arc<MockParser>) -> SqliteStore {
        let url = "http://a.com/feed.xml";
        parser.set_feed(
            url,
            ParsedFeed {
                title: "A".into(),
                ..Default::default()
            },
        );
        let store = SqliteStore::in_memory(parser.clone()).unwrap();
        store
            .add_feed(&CancellationToken::new(), NewFeed::new(url))
            .await
            .unwrap();
        parser.set_feed(
            url,
            ParsedFeed {
                title: "A".into(),
                items: vec![ParsedItem {
                    external_id: "1".into(),
                    title: "first".into(),
                    ..Default::default()
                }],
                ..Default::default()
            },
        );
        store
    }

    #[tokio::test]
    async fn test_pull_once_summarizes_batch() {
        let parser = Arc::new(MockParser::new());
        let store = store_with_feed(&parser).await;

        let daemon = Daemon::new(store, Duration::from_secs(60));
        let summary = tokio_test::assert_ok!(daemon.pull_once(&CancellationToken::new()).await);
        assert_eq!(
            summary,
            BatchSummary {
                succeeded: 1,
                failed: 0,
                new_entries: 1
            }
        );
    }

    #[tokio::test]
    async fn test_run_stops_on_cancel() {
        let parser = Arc::new(MockParser::new());
        let store = store_with_feed(&parser).await;
        parser.set("http://a.com/feed.xml", Script::Hang);

        let daemon = Daemon::new(store.clone(), Duration::from_secs(3600));
        let cancel = CancellationToken::new();
        let canceler = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            canceler.cancel();
        });

        let done = tokio::time::timeout(Duration::from_secs(5), daemon.run(cancel)).await;
        tokio_test::assert_ok!(done.expect("daemon exits after cancel"));

        // The hung batch was drained and released the writer lock.
        let stats = store.stats(&CancellationToken::new()).await.unwrap();
        assert_eq!(stats.entries, 0);
    }
}
