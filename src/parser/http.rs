use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tokio_util::sync::CancellationToken;

use crate::app::{BrookError, Result};
use crate::normalizer::Normalizer;
use crate::parser::{FeedParser, ParsedFeed};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_USER_AGENT: &str = concat!("brook/", env!("CARGO_PKG_VERSION"));

/// Fetches feeds over HTTP and decodes them with the [`Normalizer`].
pub struct HttpParser {
    client: Client,
    normalizer: Normalizer,
}

impl HttpParser {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .gzip(true)
            .brotli(true)
            .user_agent(user_agent)
            .build()?;

        Ok(Self {
            client,
            normalizer: Normalizer::new(),
        })
    }

    async fn fetch(&self, url: &str) -> Result<ParsedFeed> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| BrookError::parse_failed(url, e))?;

        let response = response
            .error_for_status()
            .map_err(|e| BrookError::parse_failed(url, e))?;

        let body = response
            .bytes()
            .await
            .map_err(|e| BrookError::parse_failed(url, e))?;

        tracing::debug!("Fetched {} bytes from {}", body.len(), url);
        self.normalizer.normalize(url, &body)
    }
}

#[async_trait]
impl FeedParser for HttpParser {
    async fn parse(&self, url: &str, cancel: &CancellationToken) -> Result<ParsedFeed> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(BrookError::Canceled),
            parsed = self.fetch(url) => parsed,
        }
    }
}
