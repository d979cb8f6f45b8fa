// ── Price cleaning ────────────────────────────────────────────────────────────

/// Currency markers stripped before parsing. Extend as new storefronts are added.
pub const CURRENCY_SYMBOLS: &[&str] = &["₹", "Rs.", "$", "€", "£"];

/// Parse a storefront price string.
/// "₹1,999.00" → 1999.0 | "$12.50" → 12.5 | "N/A" → None
///
/// Unparseable text yields `None`: a bad price is an expected outcome of a scrape,
/// never an error.
pub fn parse_price(raw: Option<&str>) -> Option<f64> {
    let mut s = raw?.to_string();
    for sym in CURRENCY_SYMBOLS {
        s = s.replace(sym, "");
    }
    let cleaned = s.replace(',', "");
    let cleaned = cleaned.trim();

    if cleaned.is_empty() {
        return None;
    }

    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
