pub mod cleaner;
pub mod http_client;
pub mod parsers;

use crate::models::{RawExtraction, SiteProfile};
use async_trait::async_trait;
use scraper::Html;
use thiserror::Error;
use tracing::debug;

// ── Errors ────────────────────────────────────────────────────────────────────

/// Why a product page could not be turned into a `RawExtraction`.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("navigation to {url} timed out")]
    Timeout { url: String },

    #[error("network error loading {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("empty document returned by {url}")]
    EmptyDocument { url: String },

    #[error("selector for '{field}' does not parse ({selector}): {reason}")]
    InvalidSelector {
        field: String,
        selector: String,
        reason: String,
    },
}

impl ExtractionError {
    pub fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout { url: url.to_string() }
        } else {
            Self::Network {
                url: url.to_string(),
                source: err,
            }
        }
    }

    /// Worth another attempt: timeouts, connection trouble, throttling.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::Network { .. } => true,
            Self::Status { status, .. } => *status == 429 || *status == 503,
            Self::EmptyDocument { .. } | Self::InvalidSelector { .. } => false,
        }
    }
}

pub type ExtractionResult = Result<RawExtraction, ExtractionError>;

// ── Source trait ──────────────────────────────────────────────────────────────

/// Navigation half of the browser boundary: load a URL, hand back the document.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn load(&self, url: &str) -> Result<String, ExtractionError>;
}

// ── Scraper ───────────────────────────────────────────────────────────────────

/// A page source paired with the site profile used to read its pages.
pub struct Scraper<S> {
    source: S,
    profile: SiteProfile,
}

impl<S: PageSource> Scraper<S> {
    pub fn new(source: S, profile: SiteProfile) -> Self {
        Self { source, profile }
    }

    pub fn profile(&self) -> &SiteProfile {
        &self.profile
    }

    pub async fn scrape(&self, url: &str) -> ExtractionResult {
        let html = self.source.load(url).await?;

        // Html is !Send; keep it out of any await.
        let doc = Html::parse_document(&html);
        let raw = parsers::extract(&doc, &self.profile)?;

        debug!(
            "{}: price={:?} mrp={:?} availability={:?}",
            self.profile.site_name, raw.current_price_text, raw.mrp_text, raw.availability_text
        );
        Ok(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StaticPage(&'static str);

    #[async_trait]
    impl PageSource for StaticPage {
        async fn load(&self, _url: &str) -> Result<String, ExtractionError> {
            Ok(self.0.to_string())
        }
    }

    struct Throttled;

    #[async_trait]
    impl PageSource for Throttled {
        async fn load(&self, url: &str) -> Result<String, ExtractionError> {
            Err(ExtractionError::Status { url: url.to_string(), status: 503 })
        }
    }

    #[tokio::test]
    async fn test_scrape_reads_profile_fields() {
        let page = StaticPage(
            r#"<span class="a-price"><span class="a-offscreen">$12.50</span></span>"#,
        );
        let scraper = Scraper::new(page, SiteProfile::amazon());
        let raw = tokio_test::assert_ok!(scraper.scrape("https://example.com/dp/1").await);
        assert_eq!(raw.current_price_text.as_deref(), Some("$12.50"));
        assert!(raw.mrp_text.is_none());
    }

    #[tokio::test]
    async fn test_scrape_propagates_navigation_failure() {
        let scraper = Scraper::new(Throttled, SiteProfile::amazon());
        let err = tokio_test::assert_err!(scraper.scrape("https://example.com/dp/1").await);
        assert!(err.is_transient());
    }

    #[test]
    fn test_transient_classification() {
        let url = "https://example.com".to_string();
        assert!(ExtractionError::Timeout { url: url.clone() }.is_transient());
        assert!(ExtractionError::Status { url: url.clone(), status: 429 }.is_transient());
        assert!(!ExtractionError::Status { url: url.clone(), status: 404 }.is_transient());
        assert!(!ExtractionError::EmptyDocument { url }.is_transient());
    }
}
