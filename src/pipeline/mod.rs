//! Scrape run orchestrator: catalog → scraper → price parser → price history.
//!
//! ## Run shape
//!
//! `run_once()` — one daily run (cron / `schedule` use):
//!   1. Open the store, apply migrations, read tracked products. Any failure here is
//!      fatal and aborts before a single page is loaded.
//!   2. For each product, strictly one at a time: load the page, extract the price
//!      fields, parse them, append a price-history record.
//!   3. Sleep a random polite delay between products.
//!
//! A product that fails (navigation, parse, or insert) is logged and counted; it never
//! stops the rest of the run.

pub mod record;

use crate::config::{AppConfig, ScraperConfig};
use crate::models::{PriceHistoryRecord, TrackedProduct};
use crate::scraper::cleaner::parse_price;
use crate::scraper::http_client::HttpClient;
use crate::scraper::{ExtractionError, PageSource, Scraper};
use crate::storage::{CatalogStore, HistoryStore, Repository};
use crate::utils;
use anyhow::{Context, Result};
use chrono::Utc;
use rand::Rng;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use self::record::RecordBuilder;

// ── Outcomes ──────────────────────────────────────────────────────────────────

/// Terminal state of one product within a run.
#[derive(Debug)]
pub enum ProductOutcome {
    Succeeded(PriceHistoryRecord),
    SkippedNoPrice,
    FailedExtraction(ExtractionError),
    FailedPersistence(anyhow::Error),
}

impl ProductOutcome {
    /// One progress line per product.
    fn log(&self, product_id: &str) {
        match self {
            Self::Succeeded(rec) => info!(
                "{}: price {:?} (MRP: {:?}){} saved as {}",
                product_id,
                rec.current_price,
                rec.original_price,
                if rec.is_deal_active { " deal active," } else { "" },
                rec.record_id
            ),
            Self::SkippedNoPrice => {
                warn!("{}: no price found (anti-bot page or stale selector?)", product_id)
            }
            Self::FailedExtraction(e) => warn!("{}: error scraping: {}", product_id, e),
            Self::FailedPersistence(e) => error!("{}: failed to save record: {:#}", product_id, e),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub attempted: usize,
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl RunSummary {
    fn record(&mut self, outcome: &ProductOutcome) {
        self.attempted += 1;
        match outcome {
            ProductOutcome::Succeeded(_) => self.succeeded += 1,
            ProductOutcome::SkippedNoPrice => self.skipped += 1,
            ProductOutcome::FailedExtraction(_) | ProductOutcome::FailedPersistence(_) => {
                self.failed += 1
            }
        }
    }
}

// ── Pacing ────────────────────────────────────────────────────────────────────

/// Random delay between page loads.
#[derive(Debug, Clone, Copy)]
pub struct Pacer {
    min_ms: u64,
    max_ms: u64,
}

impl Pacer {
    pub fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms: min_ms.min(max_ms), max_ms }
    }

    pub fn from_config(config: &ScraperConfig) -> Self {
        Self::new(config.min_delay_ms, config.max_delay_ms)
    }

    pub fn next_delay(&self) -> Duration {
        let ms = rand::rng().random_range(self.min_ms..=self.max_ms);
        Duration::from_millis(ms)
    }

    async fn pause(&self) {
        let delay = self.next_delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

// ── Pipeline ──────────────────────────────────────────────────────────────────

pub struct Pipeline<'a, S, R> {
    scraper: Scraper<S>,
    store: &'a R,
    pacer: Pacer,
    builder: RecordBuilder,
}

impl<'a, S, R> Pipeline<'a, S, R>
where
    S: PageSource,
    R: CatalogStore + HistoryStore,
{
    pub fn new(scraper: Scraper<S>, store: &'a R, pacer: Pacer) -> Self {
        Self {
            scraper,
            store,
            pacer,
            builder: RecordBuilder::new(),
        }
    }

    pub async fn run(&mut self) -> Result<RunSummary> {
        info!("Fetching tracked products…");
        let products = self
            .store
            .tracked_products()
            .context("Failed to fetch tracked products")?;

        info!(
            "{} tracked products, site profile '{}'",
            products.len(),
            self.scraper.profile().site_name
        );

        let mut summary = RunSummary::default();

        for (i, product) in products.iter().enumerate() {
            let outcome = self.process(product).await;
            outcome.log(&product.product_id);
            summary.record(&outcome);

            if i + 1 < products.len() {
                self.pacer.pause().await;
            }
        }

        info!(
            "Scraping run complete: {} attempted | {} saved | {} no price | {} failed",
            summary.attempted, summary.succeeded, summary.skipped, summary.failed
        );
        Ok(summary)
    }

    async fn process(&mut self, product: &TrackedProduct) -> ProductOutcome {
        let id = &product.product_id;
        info!("Scraping {}: {}", id, utils::truncate(&product.product_url, 60));

        let raw = match self.scraper.scrape(&product.product_url).await {
            Ok(raw) => raw,
            Err(e) => return ProductOutcome::FailedExtraction(e),
        };

        // A zero price is a placeholder, not an observation.
        let current = parse_price(raw.current_price_text.as_deref()).filter(|p| *p > 0.0);
        let original = parse_price(raw.mrp_text.as_deref());

        let Some(current) = current else {
            debug!("{}: raw price text {:?}", id, raw.current_price_text);
            return ProductOutcome::SkippedNoPrice;
        };

        let mut record = self.builder.build(id, current, original, Utc::now());

        match self.store.insert_price_record(&record) {
            Ok(scraped_at) => {
                record.scraped_at = scraped_at;
                ProductOutcome::Succeeded(record)
            }
            Err(e) => ProductOutcome::FailedPersistence(e),
        }
    }
}

/// One full scrape run against the configured store and site.
pub async fn run_once(config: &AppConfig) -> Result<RunSummary> {
    let profile = config.active_profile()?;

    let repo = Repository::open(&config.storage.db_path).context("Failed to open DuckDB")?;
    if config.storage.run_migrations {
        repo.run_migrations()?;
    }

    let client = HttpClient::new(&config.scraper).context("Failed to build page client")?;
    let run_id = repo.begin_scrape_run().context("Failed to log scrape run")?;

    let mut pipeline = Pipeline::new(
        Scraper::new(client, profile),
        &repo,
        Pacer::from_config(&config.scraper),
    );
    let result = pipeline.run().await;

    let logged = match &result {
        Ok(s) => {
            let err = (s.failed > 0).then(|| format!("{} products failed", s.failed));
            repo.finish_scrape_run(run_id, s.attempted, s.succeeded, err.as_deref())
        }
        Err(e) => repo.finish_scrape_run(run_id, 0, 0, Some(&format!("{:#}", e))),
    };
    if let Err(e) = logged {
        warn!("Could not close scrape run {}: {:#}", run_id, e);
    }

    result
}
