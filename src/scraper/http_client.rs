use super::{ExtractionError, PageSource};
use crate::config::ScraperConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;
use tokio_retry::RetryIf;
use tokio_retry::strategy::{FixedInterval, jitter};
use tracing::{debug, warn};

/// One HTTP page session, reused for every product in a run.
pub struct HttpClient {
    inner: reqwest::Client,
    max_retries: usize,
    retry_backoff: Duration,
}

impl HttpClient {
    pub fn new(config: &ScraperConfig) -> Result<Self> {
        Self::from_builder(config, Self::builder(config))
    }

    fn builder(config: &ScraperConfig) -> reqwest::ClientBuilder {
        reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .gzip(true)
            // Accept cookies so session-based pages work
            .cookie_store(true)
    }

    fn from_builder(config: &ScraperConfig, builder: reqwest::ClientBuilder) -> Result<Self> {
        let inner = builder.build().context("Failed to build HTTP client")?;

        Ok(Self {
            inner,
            max_retries: config.max_retries,
            retry_backoff: Duration::from_millis(config.retry_backoff_ms),
        })
    }

    async fn get_once(&self, url: &str) -> Result<String, ExtractionError> {
        debug!("GET {}", url);

        let resp = self
            .inner
            .get(url)
            .send()
            .await
            .map_err(|e| ExtractionError::from_reqwest(url, e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ExtractionError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = resp
            .text()
            .await
            .map_err(|e| ExtractionError::from_reqwest(url, e))?;

        if body.trim().is_empty() {
            return Err(ExtractionError::EmptyDocument {
                url: url.to_string(),
            });
        }

        Ok(body)
    }
}

#[async_trait]
impl PageSource for HttpClient {
    /// Fetch a product page, retrying transient failures with a jittered back-off.
    async fn load(&self, url: &str) -> Result<String, ExtractionError> {
        let strategy = FixedInterval::new(self.retry_backoff)
            .map(jitter)
            .take(self.max_retries);

        RetryIf::start(
            strategy,
            || self.get_once(url),
            |e: &ExtractionError| {
                let retry = e.is_transient();
                if retry {
                    warn!("Transient failure, will retry: {}", e);
                }
                retry
            },
        )
        .await
    }
}
