//! Import run statistics
//!
//! Mutable run context threaded explicitly through the pipeline stages.
//! Everything the operator report needs accumulates here.

use std::collections::HashMap;
use std::path::PathBuf;

/// Cap on sample order ids kept per unmatched item (display only)
const UNMATCHED_SAMPLE_CAP: usize = 3;

/// One de-duplicated unmatched catalog item.
#[derive(Debug, Clone)]
pub struct UnmatchedProduct {
    pub item_name: String,
    pub price_cents: i64,
    pub count: u32,
    pub sample_order_ids: Vec<String>,
}

/// Aggregate counters and findings for one import run.
#[derive(Debug, Default)]
pub struct ImportRunStats {
    /// Parsed rows (rows failing column validation are not counted)
    pub total_items: u32,
    /// Rows classified as adjustments (not purchases)
    pub skipped_adjustment: u32,
    pub skipped_no_product_match: u32,
    pub users_created: u32,
    pub memberships_created: u32,
    pub memberships_updated: u32,
    pub couple_memberships: u32,
    pub adjustments_applied: u32,
    pub adjustments_failed: u32,
    pub warnings: Vec<String>,
    unmatched: HashMap<(String, i64), UnmatchedProduct>,
    pub log_path: PathBuf,
}

impl ImportRunStats {
    /// Record a row-level warning with its 1-based CSV line number.
    pub fn warn(&mut self, line: usize, message: impl std::fmt::Display) {
        let warning = format!("line {}: {}", line, message);
        tracing::warn!("{}", warning);
        self.warnings.push(warning);
    }

    /// Fold an unmatched item into the de-duplicated tally.
    pub fn record_unmatched(&mut self, item_name: &str, price_cents: i64, order_id: &str) {
        let entry = self
            .unmatched
            .entry((item_name.to_string(), price_cents))
            .or_insert_with(|| UnmatchedProduct {
                item_name: item_name.to_string(),
                price_cents,
                count: 0,
                sample_order_ids: Vec::new(),
            });
        entry.count += 1;
        if entry.sample_order_ids.len() < UNMATCHED_SAMPLE_CAP {
            entry.sample_order_ids.push(order_id.to_string());
        }
    }

    /// Unmatched items, most frequent first.
    pub fn unmatched_products(&self) -> Vec<&UnmatchedProduct> {
        let mut items: Vec<_> = self.unmatched.values().collect();
        items.sort_by(|a, b| {
            b.count
                .cmp(&a.count)
                .then_with(|| a.item_name.cmp(&b.item_name))
        });
        items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unmatched_items_deduplicate_by_name_and_price() {
        let mut stats = ImportRunStats::default();
        stats.record_unmatched("Mystery Item", 12300, "1");
        stats.record_unmatched("Mystery Item", 12300, "2");
        // Same name, different price: separate entry
        stats.record_unmatched("Mystery Item", 9900, "3");

        let items = stats.unmatched_products();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].count, 2);
        assert_eq!(items[0].sample_order_ids, vec!["1", "2"]);
    }

    #[test]
    fn sample_order_ids_are_capped() {
        let mut stats = ImportRunStats::default();
        for i in 0..10 {
            stats.record_unmatched("Mystery Item", 500, &i.to_string());
        }
        let items = stats.unmatched_products();
        assert_eq!(items[0].count, 10);
        assert_eq!(items[0].sample_order_ids.len(), UNMATCHED_SAMPLE_CAP);
    }

    #[test]
    fn warnings_carry_line_numbers() {
        let mut stats = ImportRunStats::default();
        stats.warn(7, "expected 16 columns, found 17");
        assert_eq!(stats.warnings.len(), 1);
        assert!(stats.warnings[0].starts_with("line 7:"));
    }
}
