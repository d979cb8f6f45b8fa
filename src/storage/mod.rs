use crate::models::{CatalogEntry, CatalogProduct, PriceHistoryRecord, TrackedProduct};
use anyhow::{Context, Result};
use chrono::{NaiveDateTime, Utc};
use duckdb::{Connection, params};
use std::path::Path;
use tracing::{debug, info};

// ── Schema ────────────────────────────────────────────────────────────────────

const DDL: &str = r#"
CREATE TABLE IF NOT EXISTS products (
    product_id      VARCHAR PRIMARY KEY,
    product_name    VARCHAR,
    category        VARCHAR,
    product_url     VARCHAR NOT NULL,
    track_product   BOOLEAN NOT NULL DEFAULT TRUE,
    created_at      TIMESTAMP NOT NULL
);

CREATE TABLE IF NOT EXISTS price_history (
    record_id       VARCHAR PRIMARY KEY,
    product_id      VARCHAR NOT NULL,
    current_price   DOUBLE,
    original_price  DOUBLE,
    scraped_at      TIMESTAMP NOT NULL DEFAULT current_timestamp,
    is_deal_active  BOOLEAN NOT NULL
);

CREATE SEQUENCE IF NOT EXISTS scrape_run_seq START 1;

CREATE TABLE IF NOT EXISTS scrape_runs (
    id                  BIGINT PRIMARY KEY,
    started_at          TIMESTAMP NOT NULL,
    finished_at         TIMESTAMP,
    status              VARCHAR NOT NULL DEFAULT 'running',
    products_attempted  INTEGER DEFAULT 0,
    records_inserted    INTEGER DEFAULT 0,
    error_msg           VARCHAR
);

CREATE TABLE IF NOT EXISTS schema_version (
    version     INTEGER PRIMARY KEY,
    applied_at  TIMESTAMP NOT NULL
);
"#;

const INDEXES: &str = r#"
CREATE INDEX IF NOT EXISTS idx_history_product ON price_history (product_id);
CREATE INDEX IF NOT EXISTS idx_history_scraped ON price_history (scraped_at);
"#;

// ── Store traits ──────────────────────────────────────────────────────────────

/// Read side of the product catalog, as the scrape run needs it.
pub trait CatalogStore {
    fn tracked_products(&self) -> Result<Vec<TrackedProduct>>;
}

/// Append-only price history.
pub trait HistoryStore {
    /// Persist a record; the store stamps `scraped_at` and returns the stamp.
    /// The record's own `scraped_at` is ignored.
    fn insert_price_record(&self, record: &PriceHistoryRecord) -> Result<NaiveDateTime>;
}

// ── Repository ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub inserted: usize,
    pub existing: usize,
}

pub struct Repository {
    conn: Connection,
}

impl Repository {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Could not create dir {:?}", parent))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open DuckDB at {:?}", path))?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self { conn: Connection::open_in_memory()? })
    }

    pub fn run_migrations(&self) -> Result<()> {
        info!("Running migrations…");
        self.conn.execute_batch(DDL).context("DDL failed")?;
        self.conn.execute_batch(INDEXES).context("Index creation failed")?;
        self.conn.execute(
            "INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (1, ?)",
            params![Utc::now().naive_utc()],
        )?;
        info!("Migrations done.");
        Ok(())
    }

    // ── Products ──────────────────────────────────────────────────────────────

    /// Insert entries whose product_id is not yet in the catalog; existing rows are
    /// left untouched. All-or-nothing: an error rolls the whole batch back.
    pub fn insert_products_if_absent(&self, entries: &[CatalogEntry]) -> Result<SeedReport> {
        let tx = self.conn.unchecked_transaction()?;
        let now = Utc::now().naive_utc();
        let mut report = SeedReport { inserted: 0, existing: 0 };

        for e in entries {
            let present: i64 = tx
                .query_row(
                    "SELECT COUNT(*) FROM products WHERE product_id = ?",
                    params![e.product_id],
                    |r| r.get(0),
                )
                .with_context(|| format!("lookup product {}", e.product_id))?;

            if present > 0 {
                debug!("{} already in catalog", e.product_id);
                report.existing += 1;
                continue;
            }

            tx.execute(
                r#"INSERT INTO products
                       (product_id, product_name, category, product_url, track_product, created_at)
                   VALUES (?, ?, ?, ?, TRUE, ?)
                   ON CONFLICT (product_id) DO NOTHING"#,
                params![e.product_id, e.name, e.category, e.url, now],
            )
            .with_context(|| format!("insert product {}", e.product_id))?;
            report.inserted += 1;
        }

        tx.commit()?;
        Ok(report)
    }

    /// Returns false when no such product exists.
    pub fn set_tracked(&self, product_id: &str, tracked: bool) -> Result<bool> {
        let n = self.conn.execute(
            "UPDATE products SET track_product = ? WHERE product_id = ?",
            params![tracked, product_id],
        )?;
        Ok(n > 0)
    }

    pub fn list_products(&self) -> Result<Vec<CatalogProduct>> {
        let mut stmt = self.conn.prepare(
            r#"SELECT product_id, product_name, category, product_url, track_product
               FROM products ORDER BY product_id"#,
        )?;
        let rows = stmt
            .query_map([], |r| {
                Ok(CatalogProduct {
                    product_id: r.get(0)?,
                    name: r.get(1)?,
                    category: r.get(2)?,
                    product_url: r.get(3)?,
                    tracked: r.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn product_count(&self) -> Result<i64> {
        let mut s = self.conn.prepare("SELECT COUNT(*) FROM products")?;
        Ok(s.query_row([], |r| r.get(0))?)
    }

    // ── Price history ─────────────────────────────────────────────────────────

    pub fn history_for(&self, product_id: &str) -> Result<Vec<PriceHistoryRecord>> {
        let mut stmt = self.conn.prepare(
            r#"SELECT record_id, product_id, current_price, original_price, scraped_at, is_deal_active
               FROM price_history WHERE product_id = ?
               ORDER BY scraped_at, record_id"#,
        )?;
        let rows = stmt
            .query_map(params![product_id], |r| {
                Ok(PriceHistoryRecord {
                    record_id: r.get(0)?,
                    product_id: r.get(1)?,
                    current_price: r.get(2)?,
                    original_price: r.get(3)?,
                    scraped_at: r.get(4)?,
                    is_deal_active: r.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn record_count(&self) -> Result<i64> {
        let mut s = self.conn.prepare("SELECT COUNT(*) FROM price_history")?;
        Ok(s.query_row([], |r| r.get(0))?)
    }

    pub fn active_deal_count(&self) -> Result<i64> {
        let mut s = self
            .conn
            .prepare("SELECT COUNT(*) FROM price_history WHERE is_deal_active")?;
        Ok(s.query_row([], |r| r.get(0))?)
    }

    pub fn history_range(&self) -> Result<(Option<NaiveDateTime>, Option<NaiveDateTime>)> {
        let mut s = self
            .conn
            .prepare("SELECT MIN(scraped_at), MAX(scraped_at) FROM price_history")?;
        Ok(s.query_row([], |r| Ok((r.get(0)?, r.get(1)?)))?)
    }

    // ── Scrape run log ────────────────────────────────────────────────────────

    pub fn begin_scrape_run(&self) -> Result<i64> {
        let id: i64 = self
            .conn
            .query_row("SELECT nextval('scrape_run_seq')", [], |r| r.get(0))?;
        self.conn.execute(
            "INSERT INTO scrape_runs (id, started_at, status) VALUES (?, ?, 'running')",
            params![id, Utc::now().naive_utc()],
        )?;
        Ok(id)
    }

    pub fn finish_scrape_run(
        &self, run_id: i64, attempted: usize, inserted: usize, error: Option<&str>,
    ) -> Result<()> {
        self.conn.execute(
            r#"UPDATE scrape_runs SET
               finished_at = ?, status = ?,
               products_attempted = ?, records_inserted = ?, error_msg = ?
               WHERE id = ?"#,
            params![
                Utc::now().naive_utc(),
                if error.is_none() { "success" } else { "error" },
                attempted as i64, inserted as i64, error, run_id,
            ],
        )?;
        Ok(())
    }

    pub fn last_run_status(&self) -> Result<Option<(i64, String)>> {
        let mut s = self
            .conn
            .prepare("SELECT id, status FROM scrape_runs ORDER BY id DESC LIMIT 1")?;
        let mut rows = s.query_map([], |r| Ok((r.get(0)?, r.get(1)?)))?;
        Ok(rows.next().transpose()?)
    }
}

impl CatalogStore for Repository {
    fn tracked_products(&self) -> Result<Vec<TrackedProduct>> {
        let mut stmt = self.conn.prepare(
            r#"SELECT product_id, product_url, track_product
               FROM products WHERE track_product = TRUE
               ORDER BY product_id"#,
        )?;
        let rows = stmt
            .query_map([], |r| {
                Ok(TrackedProduct {
                    product_id: r.get(0)?,
                    product_url: r.get(1)?,
                    tracked: r.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to read tracked products")?;
        Ok(rows)
    }
}

impl HistoryStore for Repository {
    fn insert_price_record(&self, rec: &PriceHistoryRecord) -> Result<NaiveDateTime> {
        self.conn
            .execute(
                r#"INSERT INTO price_history
                       (record_id, product_id, current_price, original_price, is_deal_active)
                   VALUES (?, ?, ?, ?, ?)"#,
                params![
                    rec.record_id,
                    rec.product_id,
                    rec.current_price,
                    rec.original_price,
                    rec.is_deal_active,
                ],
            )
            .with_context(|| format!("insert price record {}", rec.record_id))?;

        let scraped_at = self
            .conn
            .query_row(
                "SELECT scraped_at FROM price_history WHERE record_id = ?",
                params![rec.record_id],
                |r| r.get(0),
            )
            .with_context(|| format!("read back price record {}", rec.record_id))?;
        Ok(scraped_at)
    }
}
