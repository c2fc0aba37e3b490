//! Scripted parser used by the store tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::app::{BrookError, Result};
use crate::parser::{FeedParser, ParsedFeed};

#[derive(Debug, Clone)]
pub(crate) enum Script {
    Feed(ParsedFeed),
    Fail(String),
    /// Never completes on its own; only cancellation ends it.
    Hang,
}

#[derive(Default)]
pub(crate) struct MockParser {
    scripts: Mutex<HashMap<String, Script>>,
    calls: AtomicUsize,
}

impl MockParser {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn set(&self, url: &str, script: Script) {
        self.scripts
            .lock()
            .unwrap()
            .insert(url.to_string(), script);
    }

    pub(crate) fn set_feed(&self, url: &str, feed: ParsedFeed) {
        self.set(url, Script::Feed(feed));
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FeedParser for MockParser {
    async fn parse(&self, url: &str, cancel: &CancellationToken) -> Result<ParsedFeed> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let script = self.scripts.lock().unwrap().get(url).cloned();

        let outcome = async move {
            match script {
                Some(Script::Feed(feed)) => Ok(feed),
                Some(Script::Fail(reason)) => Err(BrookError::parse_failed(url, reason)),
                Some(Script::Hang) => std::future::pending().await,
                None => Err(BrookError::parse_failed(url, "no script for url")),
            }
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(BrookError::Canceled),
            parsed = outcome => parsed,
        }
    }
}
