use crate::models::{PriceHistoryRecord, is_deal_active};
use chrono::{DateTime, Utc};

/// Builds price-history records for one run.
///
/// `record_id` is `{product_id}_{unix micros}_{seq}`; the per-builder sequence keeps ids
/// distinct even when the clock hands out the same instant twice.
#[derive(Debug, Default)]
pub struct RecordBuilder {
    seq: u64,
}

impl RecordBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn build(
        &mut self,
        product_id: &str,
        current_price: f64,
        original_price: Option<f64>,
        now: DateTime<Utc>,
    ) -> PriceHistoryRecord {
        self.seq += 1;
        let record_id = format!("{}_{}_{}", product_id, now.timestamp_micros(), self.seq);

        PriceHistoryRecord {
            record_id,
            product_id: product_id.to_string(),
            current_price: Some(current_price),
            original_price,
            scraped_at: now.naive_utc(),
            is_deal_active: is_deal_active(Some(current_price), original_price),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_build_computes_deal_flag() {
        let now = Utc::now();
        let mut b = RecordBuilder::new();

        let deal = b.build("B09XS7JWHH", 1000.0, Some(1500.0), now);
        assert!(deal.is_deal_active);
        assert_eq!(deal.current_price, Some(1000.0));
        assert_eq!(deal.original_price, Some(1500.0));

        assert!(!b.build("B09XS7JWHH", 1500.0, Some(1500.0), now).is_deal_active);
        assert!(!b.build("B09XS7JWHH", 1000.0, None, now).is_deal_active);
    }

    #[test]
    fn test_record_ids_unique_for_same_instant() {
        let now = Utc::now();
        let mut b = RecordBuilder::new();

        let ids: HashSet<String> = (0..100)
            .map(|_| b.build("B0CHX1W1XY", 10.0, None, now).record_id)
            .collect();
        assert_eq!(ids.len(), 100);
    }

    #[test]
    fn test_record_id_starts_with_product_id() {
        let mut b = RecordBuilder::new();
        let rec = b.build("B0B11LJ69K", 9.99, None, Utc::now());
        assert!(rec.record_id.starts_with("B0B11LJ69K_"));
        assert_eq!(rec.product_id, "B0B11LJ69K");
    }
}
