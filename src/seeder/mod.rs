//! Catalog seeding: merge a fixed product list into the `products` table.
//!
//! Insert-only: rows already present (by product_id) are never updated, so running
//! the seed twice leaves the catalog exactly as after the first run.

use crate::models::CatalogEntry;
use crate::storage::{Repository, SeedReport};
use anyhow::{Context, Result, bail};
use tracing::info;
use url::Url;

/// The products tracked out of the box.
const DEFAULT_PRODUCTS: &[(&str, &str, &str, &str)] = &[
    (
        "B09XS7JWHH",
        "Sony WH-1000XM5 Wireless Headphones",
        "Electronics",
        "https://www.amazon.in/Sony-WH-1000XM5-Wireless-Cancelling-Headphones/dp/B09XS7JWHH",
    ),
    (
        "B0CHX1W1XY",
        "Apple iPhone 15 (128 GB) - Black",
        "Electronics",
        "https://www.amazon.in/Apple-iPhone-15-128-GB/dp/B0CHX1W1XY",
    ),
    (
        "B0B11LJ69K",
        "Logitech MX Master 3S",
        "Electronics",
        "https://www.amazon.in/Logitech-MX-Master-3S-Chrome-Graphite/dp/B0B11LJ69K",
    ),
    (
        "B0CY5HVDS2",
        "Sony PlayStation5 Gaming Console",
        "Electronics",
        "https://www.amazon.in/Sony-CFI-2008A01X-PlayStation%C2%AE5-Console-slim/dp/B0CY5HVDS2",
    ),
    (
        "B0B3MNYGTW",
        "OnePlus Bullets Z2 Bluetooth Wireless in Ear Earphones",
        "Electronics",
        "https://www.amazon.in/Oneplus-Bluetooth-Wireless-Earphones-Bombastic/dp/B0B3MNYGTW",
    ),
];

pub fn default_entries() -> Vec<CatalogEntry> {
    DEFAULT_PRODUCTS
        .iter()
        .map(|(id, name, cat, url)| CatalogEntry {
            product_id: id.to_string(),
            name: name.to_string(),
            category: cat.to_string(),
            url: url.to_string(),
        })
        .collect()
}

/// Reject entries that could never be scraped: blank ids, non-http(s) URLs.
pub fn validate_entry(entry: &CatalogEntry) -> Result<()> {
    if entry.product_id.trim().is_empty() {
        bail!("empty product_id for {:?}", entry.name);
    }
    let url = Url::parse(&entry.url)
        .with_context(|| format!("{}: malformed URL {:?}", entry.product_id, entry.url))?;
    if !matches!(url.scheme(), "http" | "https") {
        bail!("{}: unsupported URL scheme '{}'", entry.product_id, url.scheme());
    }
    Ok(())
}

/// Seed the catalog. Entries are validated up front; nothing is written unless the
/// whole batch is valid and inserts cleanly.
pub fn seed(repo: &Repository, entries: &[CatalogEntry]) -> Result<SeedReport> {
    info!("Seeding {} products…", entries.len());

    for e in entries {
        validate_entry(e)?;
    }

    let report = repo
        .insert_products_if_absent(entries)
        .context("Seeding failed, no products were written")?;

    info!(
        "Seeding complete: {} inserted, {} already present",
        report.inserted, report.existing
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo() -> Repository {
        let repo = Repository::open_in_memory().unwrap();
        repo.run_migrations().unwrap();
        repo
    }

    #[test]
    fn test_seed_twice_is_idempotent() {
        let repo = repo();
        let entries = default_entries();

        let first = seed(&repo, &entries).unwrap();
        assert_eq!(first, SeedReport { inserted: 5, existing: 0 });

        let second = seed(&repo, &entries).unwrap();
        assert_eq!(second, SeedReport { inserted: 0, existing: 5 });

        assert_eq!(repo.product_count().unwrap(), entries.len() as i64);
    }

    #[test]
    fn test_seed_does_not_update_existing_rows() {
        let repo = repo();
        let mut entries = default_entries();
        seed(&repo, &entries[..1]).unwrap();

        entries[0].name = "Renamed".into();
        seed(&repo, &entries).unwrap();

        let products = repo.list_products().unwrap();
        let sony = products.iter().find(|p| p.product_id == "B09XS7JWHH").unwrap();
        assert_eq!(sony.name.as_deref(), Some("Sony WH-1000XM5 Wireless Headphones"));
        assert!(sony.tracked);
    }

    #[test]
    fn test_invalid_entry_aborts_whole_batch() {
        let repo = repo();
        let mut entries = default_entries();
        entries.push(CatalogEntry {
            product_id: "BAD".into(),
            name: "Broken".into(),
            category: "Misc".into(),
            url: "ftp://example.com/file".into(),
        });

        assert!(seed(&repo, &entries).is_err());
        assert_eq!(repo.product_count().unwrap(), 0);
    }

    #[test]
    fn test_validate_entry() {
        let ok = &default_entries()[0];
        assert!(validate_entry(ok).is_ok());

        let mut blank = ok.clone();
        blank.product_id = "  ".into();
        assert!(validate_entry(&blank).is_err());

        let mut bad_url = ok.clone();
        bad_url.url = "not a url".into();
        assert!(validate_entry(&bad_url).is_err());
    }
}
