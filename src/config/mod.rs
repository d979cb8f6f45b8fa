use crate::models::{SelectorSet, SiteProfile};
use crate::scraper::parsers::check_selectors;
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Top-level application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub scraper: ScraperConfig,
    /// Extra or overriding site profiles, keyed by site name.
    pub sites: HashMap<String, SelectorSet>,
    pub storage: StorageConfig,
    pub schedule: ScheduleConfig,
}

/// Scraper configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScraperConfig {
    /// Name of the active site profile.
    #[serde(default = "default_site")]
    pub site: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_min_delay_ms")]
    pub min_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    #[serde(default = "default_true")]
    pub run_migrations: bool,
}

/// Daily trigger configuration for `price-tracker schedule`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScheduleConfig {
    /// UTC hour of the daily run.
    #[serde(default = "default_hour")]
    pub hour: u32,

    #[serde(default)]
    pub minute: u32,

    #[serde(default = "default_schedule_retries")]
    pub retries: usize,

    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
}

// ── Defaults ─────────────────────────────────────────────────────────────────

fn default_site() -> String {
    "amazon".to_string()
}
fn default_timeout_secs() -> u64 {
    60
}
fn default_min_delay_ms() -> u64 {
    2000
}
fn default_max_delay_ms() -> u64 {
    5000
}
fn default_max_retries() -> usize {
    2
}
fn default_retry_backoff_ms() -> u64 {
    3000
}
fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36".to_string()
}
fn default_db_path() -> PathBuf {
    PathBuf::from("data/prices.duckdb")
}
fn default_true() -> bool {
    true
}
fn default_hour() -> u32 {
    8
}
fn default_schedule_retries() -> usize {
    1
}
fn default_retry_delay_secs() -> u64 {
    300
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            site: default_site(),
            timeout_secs: default_timeout_secs(),
            min_delay_ms: default_min_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            run_migrations: true,
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            hour: default_hour(),
            minute: 0,
            retries: default_schedule_retries(),
            retry_delay_secs: default_retry_delay_secs(),
        }
    }
}

// ── Loader ───────────────────────────────────────────────────────────────────

impl AppConfig {
    /// Load configuration from file + environment overrides
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        let cfg = config::Config::builder()
            .add_source(
                config::File::with_name("config/default")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(
                config::File::with_name("config/local")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(
                config::Environment::with_prefix("PRICE_TRACKER")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to read configuration sources")?;

        let app_cfg: AppConfig = cfg
            .try_deserialize()
            .context("Invalid configuration")?;
        app_cfg.validate()?;
        Ok(app_cfg)
    }

    fn validate(&self) -> Result<()> {
        if self.scraper.min_delay_ms > self.scraper.max_delay_ms {
            bail!(
                "scraper.min_delay_ms ({}) exceeds scraper.max_delay_ms ({})",
                self.scraper.min_delay_ms,
                self.scraper.max_delay_ms
            );
        }
        if self.schedule.hour > 23 || self.schedule.minute > 59 {
            bail!(
                "schedule time {:02}:{:02} is not a valid time of day",
                self.schedule.hour,
                self.schedule.minute
            );
        }
        Ok(())
    }

    /// Resolve the profile named by `scraper.site`, configured sites first, then built-ins.
    /// Every selector of the profile must parse.
    pub fn active_profile(&self) -> Result<SiteProfile> {
        let name = self.scraper.site.to_lowercase();

        let profile = match self.sites.get(&name) {
            Some(selectors) => SiteProfile {
                site_name: name,
                selectors: selectors.clone(),
            },
            None => match SiteProfile::builtin(&name) {
                Some(profile) => profile,
                None => bail!("Unknown site profile '{}'", self.scraper.site),
            },
        };

        check_selectors(&profile)
            .with_context(|| format!("Site profile '{}' is invalid", profile.site_name))?;
        Ok(profile)
    }
}
