//! Product matching
//!
//! Resolves a free-text order-item name to a catalog product through a
//! cascade of increasingly fuzzy strategies. A failed match is a normal
//! business outcome, not an error; the caller tallies it for the
//! operator's catalog-mapping follow-up.

use crate::import::cache::ReferenceCache;
use crate::mapping::ItemMapping;
use hogline_common::db::Product;

/// Which strategy produced a match (for the audit trail).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStrategy {
    ExplicitMapping,
    NormalizedName,
    Price,
}

impl MatchStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExplicitMapping => "explicit-mapping",
            Self::NormalizedName => "normalized-name",
            Self::Price => "price",
        }
    }
}

/// Outcome of a resolution attempt.
#[derive(Debug, Clone)]
pub enum MatchOutcome {
    Matched {
        product: Product,
        strategy: MatchStrategy,
    },
    NoMatch,
}

pub struct ProductMatcher {
    mapping: ItemMapping,
}

impl ProductMatcher {
    pub fn new(mapping: ItemMapping) -> Self {
        Self { mapping }
    }

    /// Try each strategy in order and return the first hit.
    ///
    /// 1. Explicit mapping: known item name → external id → catalog.
    /// 2. Normalized name: casefolded/stripped name lookup.
    /// 3. Price: the row total in cents against the price index.
    pub fn resolve(
        &self,
        cache: &ReferenceCache,
        item_name: &str,
        total_cents: i64,
    ) -> MatchOutcome {
        if let Some(external_id) = self.mapping.external_id_for(item_name) {
            if let Some(product) = cache.product_by_external_id(external_id) {
                tracing::debug!(
                    item = item_name,
                    external_id = external_id,
                    product = %product.name,
                    strategy = MatchStrategy::ExplicitMapping.as_str(),
                    "Product matched"
                );
                return MatchOutcome::Matched {
                    product: product.clone(),
                    strategy: MatchStrategy::ExplicitMapping,
                };
            }
            tracing::warn!(
                item = item_name,
                external_id = external_id,
                "Mapped external id has no available product this season"
            );
        }

        let normalized = normalize_name(item_name);
        if let Some(product) = cache.product_by_normalized_name(&normalized) {
            tracing::debug!(
                item = item_name,
                normalized = %normalized,
                product = %product.name,
                strategy = MatchStrategy::NormalizedName.as_str(),
                "Product matched"
            );
            return MatchOutcome::Matched {
                product: product.clone(),
                strategy: MatchStrategy::NormalizedName,
            };
        }

        if let Some(product) = cache.product_by_price(total_cents) {
            tracing::debug!(
                item = item_name,
                total_cents = total_cents,
                product = %product.name,
                strategy = MatchStrategy::Price.as_str(),
                "Product matched"
            );
            return MatchOutcome::Matched {
                product: product.clone(),
                strategy: MatchStrategy::Price,
            };
        }

        tracing::debug!(
            item = item_name,
            total_cents = total_cents,
            "No product match"
        );
        MatchOutcome::NoMatch
    }
}

/// Normalize a product/item name for fuzzy comparison: casefold, turn
/// punctuation into spaces, collapse runs of whitespace. Deterministic and
/// idempotent.
pub fn normalize_name(name: &str) -> String {
    let lowered: String = name
        .chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                ' '
            }
        })
        .collect();
    lowered.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use hogline_common::db::{ProductType, Season};
    use sqlx::SqlitePool;
    use uuid::Uuid;

    fn test_product(name: &str, external_id: Option<&str>, price_cents: i64) -> Product {
        Product {
            guid: Uuid::new_v4(),
            season_guid: Uuid::new_v4(),
            external_id: external_id.map(|s| s.to_string()),
            slug: normalize_name(name).replace(' ', "-"),
            name: name.to_string(),
            product_type: ProductType::Membership,
            membership_tier: None,
            price_cents,
            is_available: true,
            metadata: serde_json::json!({}),
        }
    }

    async fn cache_with(products: Vec<Product>) -> ReferenceCache {
        let pool = SqlitePool::connect("sqlite::memory:")
            .await
            .expect("Failed to create in-memory database");
        hogline_common::db::init::create_all_tables(&pool).await.unwrap();

        let season = Season {
            guid: Uuid::new_v4(),
            name: "2025-2026".to_string(),
            slug: "2025-2026".to_string(),
            start_date: NaiveDate::from_ymd_opt(2025, 9, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 4, 30).unwrap(),
            is_current: true,
        };
        crate::db::seasons::insert_season(&pool, &season).await.unwrap();
        for mut product in products {
            product.season_guid = season.guid;
            crate::db::products::insert_product(&pool, &product).await.unwrap();
        }
        ReferenceCache::build(&pool, season).await.unwrap()
    }

    #[test]
    fn normalization_is_deterministic_and_idempotent() {
        let cases = [
            ("2025-2026 Membership: Active", "2025 2026 membership active"),
            ("  Learn   to Curl!  ", "learn to curl"),
            ("LOCKER-RENTAL", "locker rental"),
        ];
        for (input, expected) in cases {
            let once = normalize_name(input);
            assert_eq!(once, expected);
            assert_eq!(normalize_name(&once), once);
        }
    }

    #[tokio::test]
    async fn explicit_mapping_beats_normalized_name() {
        // The item name normalizes onto product B, but the explicit mapping
        // points at product A; the mapping must win.
        let a = test_product("Premier Membership", Some("cio-mem-active"), 60000);
        let b = test_product("2025-2026 Membership: Active", None, 57500);
        let cache = cache_with(vec![a.clone(), b]).await;

        let matcher = ProductMatcher::new(ItemMapping::builtin());
        match matcher.resolve(&cache, "2025-2026 Membership: Active", 57500) {
            MatchOutcome::Matched { product, strategy } => {
                assert_eq!(strategy, MatchStrategy::ExplicitMapping);
                assert_eq!(product.guid, a.guid);
            }
            MatchOutcome::NoMatch => panic!("expected a match"),
        }
    }

    #[tokio::test]
    async fn normalized_name_beats_price() {
        let a = test_product("Friday Night League", None, 20000);
        let b = test_product("Saturday League", None, 20000);
        let cache = cache_with(vec![a.clone(), b]).await;

        let matcher = ProductMatcher::new(ItemMapping::builtin());
        match matcher.resolve(&cache, "FRIDAY NIGHT LEAGUE", 20000) {
            MatchOutcome::Matched { product, strategy } => {
                assert_eq!(strategy, MatchStrategy::NormalizedName);
                assert_eq!(product.guid, a.guid);
            }
            MatchOutcome::NoMatch => panic!("expected a match"),
        }
    }

    #[tokio::test]
    async fn price_fallback_then_no_match() {
        let a = test_product("Sunday Doubles League", None, 15000);
        let cache = cache_with(vec![a.clone()]).await;

        let matcher = ProductMatcher::new(ItemMapping::builtin());
        match matcher.resolve(&cache, "Sun. mixed doubles (late reg)", 15000) {
            MatchOutcome::Matched { product, strategy } => {
                assert_eq!(strategy, MatchStrategy::Price);
                assert_eq!(product.guid, a.guid);
            }
            MatchOutcome::NoMatch => panic!("expected a price match"),
        }

        assert!(matches!(
            matcher.resolve(&cache, "Sun. mixed doubles (late reg)", 15550),
            MatchOutcome::NoMatch
        ));
    }
}
