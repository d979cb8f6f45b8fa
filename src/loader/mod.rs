//! CSV loader for seed files: `product_id,name,category,url` with a header row.

use crate::models::CatalogEntry;
use anyhow::{Context, Result};
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};

pub fn load_seed_file(path: &Path) -> Result<Vec<CatalogEntry>> {
    debug!("Loading seed entries from {:?}", path);
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open seed file {:?}", path))?;
    let entries = read_seed_entries(file)?;
    info!("{:?}: {} entries loaded", path, entries.len());
    Ok(entries)
}

/// Rows missing a product_id or url are skipped with a warning.
pub fn read_seed_entries<R: Read>(input: R) -> Result<Vec<CatalogEntry>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(input);

    let mut entries = Vec::new();

    for (i, result) in reader.records().enumerate() {
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                warn!("Seed row {}: {}", i + 1, e);
                continue;
            }
        };

        let field = |idx: usize| record.get(idx).unwrap_or_default().to_string();
        let entry = CatalogEntry {
            product_id: field(0),
            name: field(1),
            category: field(2),
            url: field(3),
        };

        if entry.product_id.is_empty() || entry.url.is_empty() {
            warn!("Seed row {}: missing product_id or url, skipped", i + 1);
            continue;
        }

        entries.push(entry);
    }

    Ok(entries)
}
