mod config;
mod loader;
mod models;
mod pipeline;
mod schedule;
mod scraper;
mod seeder;
mod storage;
mod utils;

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::AppConfig;
use crate::storage::Repository;

#[derive(Parser)]
#[command(name = "price-tracker", about = "Daily e-commerce price tracker", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Merge the tracked-product list into the catalog (insert-only)
    Seed {
        /// CSV seed file (product_id,name,category,url); defaults to the built-in list
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Scrape current prices for every tracked product once
    Run,

    /// Stay resident and run once a day at the configured UTC time
    Schedule,

    /// List catalog products
    Products,

    /// Turn tracking on or off for a product
    Track {
        product_id: String,

        /// Stop tracking instead
        #[arg(long)]
        off: bool,
    },

    /// Show the price history of one product
    History { product_id: String },

    /// Show database statistics
    Stats,

    /// Apply schema migrations without loading data
    Migrate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "price_tracker=info,warn",
        1 => "price_tracker=debug,info",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_target(false))
        .with(EnvFilter::new(filter))
        .init();

    let config = AppConfig::load()?;

    match cli.command {
        Command::Seed { file } => {
            let entries = match &file {
                Some(path) => loader::load_seed_file(path)?,
                None => seeder::default_entries(),
            };
            let repo = open_repo(&config)?;
            seeder::seed(&repo, &entries)?;
        }

        Command::Run => {
            let _t = utils::Timer::start("Scrape run");
            let summary = pipeline::run_once(&config).await?;
            info!(
                "Done: {} products, {} saved, {} no price, {} failed",
                summary.attempted, summary.succeeded, summary.skipped, summary.failed
            );
        }

        Command::Schedule => {
            schedule::run_daily(&config).await?;
        }

        Command::Products => {
            let products = open_repo(&config)?.list_products()?;
            if products.is_empty() {
                println!("No products — run `price-tracker seed` first.");
            } else {
                println!("{} products:", products.len());
                for p in &products {
                    println!(
                        "  {} {} {:<40} {}",
                        if p.tracked { "●" } else { "○" },
                        p.product_id,
                        p.name.as_deref().unwrap_or("—"),
                        p.product_url
                    );
                }
            }
        }

        Command::Track { product_id, off } => {
            if !open_repo(&config)?.set_tracked(&product_id, !off)? {
                bail!("No product '{}' in the catalog", product_id);
            }
            println!("{}: tracking {}", product_id, if off { "off" } else { "on" });
        }

        Command::History { product_id } => {
            let rows = open_repo(&config)?.history_for(&product_id)?;
            if rows.is_empty() {
                println!("No price history for {}.", product_id);
            }
            for r in &rows {
                println!(
                    "  {}  {:>12}  MRP {:>12}{}",
                    r.scraped_at.format("%Y-%m-%d %H:%M:%S"),
                    fmt_price(r.current_price),
                    fmt_price(r.original_price),
                    if r.is_deal_active { "  deal" } else { "" }
                );
            }
        }

        Command::Stats => {
            let repo = open_repo(&config)?;
            let products = repo.product_count()?;
            let records = repo.record_count()?;
            let deals = repo.active_deal_count()?;
            let (min, max) = repo.history_range().unwrap_or((None, None));
            let last_run = repo.last_run_status().unwrap_or(None);
            println!("─────────────────────────────────");
            println!("  Price Tracker — Database Stats");
            println!("─────────────────────────────────");
            println!("  Products : {}", utils::fmt_number(products));
            println!("  Records  : {}", utils::fmt_number(records));
            println!("  Deals    : {}", utils::fmt_number(deals));
            println!("  From     : {}", min.map(|d| d.to_string()).unwrap_or("—".into()));
            println!("  To       : {}", max.map(|d| d.to_string()).unwrap_or("—".into()));
            println!(
                "  Last run : {}",
                last_run.map(|(id, s)| format!("#{} {}", id, s)).unwrap_or("—".into())
            );
            println!("─────────────────────────────────");
        }

        Command::Migrate => {
            Repository::open(&config.storage.db_path)?.run_migrations()?;
            println!("Migrations applied.");
        }
    }

    Ok(())
}

fn open_repo(config: &AppConfig) -> Result<Repository> {
    let repo = Repository::open(&config.storage.db_path)?;
    if config.storage.run_migrations {
        repo.run_migrations()?;
    }
    Ok(repo)
}

fn fmt_price(p: Option<f64>) -> String {
    p.map(|v| format!("{:.2}", v)).unwrap_or_else(|| "—".into())
}
