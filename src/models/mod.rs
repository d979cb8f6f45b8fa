use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ── Catalog ───────────────────────────────────────────────────────────────────

/// A catalog product flagged for recurring price observation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrackedProduct {
    pub product_id: String,
    pub product_url: String,
    pub tracked: bool,
}

/// One row of seed input: product_id, name, category, url
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogEntry {
    pub product_id: String,
    pub name: String,
    pub category: String,
    pub url: String,
}

/// Full catalog row, as listed by `price-tracker products`.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogProduct {
    pub product_id: String,
    pub name: Option<String>,
    pub category: Option<String>,
    pub product_url: String,
    pub tracked: bool,
}

// ── Site profile ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SelectorSet {
    pub price: String,
    pub mrp: String,
    #[serde(default)]
    pub availability: Option<String>,
}

/// Selector expressions locating the price fields on one retailer's page layout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SiteProfile {
    pub site_name: String,
    pub selectors: SelectorSet,
}

impl SiteProfile {
    pub fn amazon() -> Self {
        Self {
            site_name: "amazon".to_string(),
            selectors: SelectorSet {
                price: "span.a-price > span.a-offscreen".to_string(),
                mrp: "span.a-text-price > span.a-offscreen".to_string(),
                availability: Some("#availability span, span.a-color-success".to_string()),
            },
        }
    }

    pub fn builtin(name: &str) -> Option<Self> {
        match name {
            "amazon" => Some(Self::amazon()),
            _ => None,
        }
    }
}

// ── Extraction ────────────────────────────────────────────────────────────────

/// Raw field text pulled off a product page. `None` = element not on the page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawExtraction {
    pub current_price_text: Option<String>,
    pub mrp_text: Option<String>,
    pub availability_text: Option<String>,
}

// ── Price history ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceHistoryRecord {
    pub record_id: String,
    pub product_id: String,
    pub current_price: Option<f64>,
    pub original_price: Option<f64>,
    pub scraped_at: NaiveDateTime,
    pub is_deal_active: bool,
}

/// True iff both prices are known and the current one undercuts the original.
pub fn is_deal_active(current: Option<f64>, original: Option<f64>) -> bool {
    matches!((current, original), (Some(c), Some(o)) if c < o)
}
