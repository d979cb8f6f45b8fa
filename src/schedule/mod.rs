//! Daily trigger for the scrape run, with a fixed number of retries per slot.

use crate::config::{AppConfig, ScheduleConfig};
use crate::pipeline::{self, RunSummary};
use anyhow::{Result, bail};
use chrono::{DateTime, Duration as ChronoDuration, NaiveTime, Utc};
use std::time::Duration;
use tokio_retry::Retry;
use tokio_retry::strategy::FixedInterval;
use tracing::{error, info, warn};

/// First instant strictly after `now` whose UTC wall-clock time is `at`.
pub fn next_run_after(now: DateTime<Utc>, at: NaiveTime) -> DateTime<Utc> {
    let today = now.date_naive().and_time(at).and_utc();
    if today > now {
        today
    } else {
        today + ChronoDuration::days(1)
    }
}

fn slot_time(config: &ScheduleConfig) -> Result<NaiveTime> {
    match NaiveTime::from_hms_opt(config.hour, config.minute, 0) {
        Some(t) => Ok(t),
        None => bail!("invalid schedule time {:02}:{:02}", config.hour, config.minute),
    }
}

/// Run once, retrying a fatal failure `schedule.retries` more times.
pub async fn run_with_retries(config: &AppConfig) -> Result<RunSummary> {
    let strategy = FixedInterval::new(Duration::from_secs(config.schedule.retry_delay_secs))
        .take(config.schedule.retries);

    let mut attempt = 0u32;
    Retry::start(strategy, || {
        attempt += 1;
        if attempt > 1 {
            warn!("Retrying scrape run (attempt {})", attempt);
        }
        pipeline::run_once(config)
    })
    .await
}

/// Sleep until each daily slot and run. Only returns on a configuration error.
pub async fn run_daily(config: &AppConfig) -> Result<()> {
    let at = slot_time(&config.schedule)?;
    info!("Scheduler started: daily at {} UTC", at.format("%H:%M"));

    loop {
        let now = Utc::now();
        let next = next_run_after(now, at);
        let wait = (next - now).to_std().unwrap_or_default();
        info!("Next run at {} (in {:.0?})", next, wait);
        tokio::time::sleep(wait).await;

        match run_with_retries(config).await {
            Ok(s) => info!(
                "Scheduled run done: {} saved, {} no price, {} failed",
                s.succeeded, s.skipped, s.failed
            ),
            Err(e) => error!("Scheduled run failed after retries: {:#}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_next_run_later_today() {
        let now = Utc.with_ymd_and_hms(2026, 10, 17, 6, 30, 0).unwrap();
        assert_eq!(
            next_run_after(now, at(8, 0)),
            Utc.with_ymd_and_hms(2026, 10, 17, 8, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_next_run_rolls_to_tomorrow() {
        let now = Utc.with_ymd_and_hms(2026, 12, 31, 8, 0, 0).unwrap();
        assert_eq!(
            next_run_after(now, at(8, 0)),
            Utc.with_ymd_and_hms(2027, 1, 1, 8, 0, 0).unwrap()
        );

        let late = Utc.with_ymd_and_hms(2026, 10, 17, 23, 59, 59).unwrap();
        assert_eq!(
            next_run_after(late, at(8, 0)),
            Utc.with_ymd_and_hms(2026, 10, 18, 8, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_slot_time_validation() {
        assert!(slot_time(&ScheduleConfig::default()).is_ok());
        let bad = ScheduleConfig { hour: 24, ..ScheduleConfig::default() };
        assert!(slot_time(&bad).is_err());
    }

    #[tokio::test]
    async fn test_retries_give_up_on_persistent_setup_failure() {
        let mut config = AppConfig::default();
        config.scraper.site = "unknown-site".into();
        config.schedule.retries = 2;
        config.schedule.retry_delay_secs = 0;

        assert!(run_with_retries(&config).await.is_err());
    }
}
