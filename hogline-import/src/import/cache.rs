//! Reference data cache
//!
//! Read-through snapshot of the current season's products, users, and
//! memberships, built once per import run and indexed for O(1) lookups.
//! Entities created mid-run are written through so later rows see earlier
//! rows' effects without a database round-trip.

use crate::db;
use crate::import::matcher::normalize_name;
use anyhow::Result;
use hogline_common::db::{Product, Season, User, UserProduct};
use sqlx::SqlitePool;
use std::collections::HashMap;
use uuid::Uuid;

pub struct ReferenceCache {
    pub season: Season,
    products_by_external_id: HashMap<String, Product>,
    products_by_name: HashMap<String, Product>,
    products_by_price: HashMap<i64, Product>,
    users_by_email: HashMap<String, User>,
    users_by_external_id: HashMap<String, User>,
    /// Keyed by (user, product, season)
    memberships: HashMap<(Uuid, Uuid, Uuid), UserProduct>,
}

impl ReferenceCache {
    /// Snapshot the season's reference data.
    pub async fn build(pool: &SqlitePool, season: Season) -> Result<Self> {
        let mut cache = Self {
            season,
            products_by_external_id: HashMap::new(),
            products_by_name: HashMap::new(),
            products_by_price: HashMap::new(),
            users_by_email: HashMap::new(),
            users_by_external_id: HashMap::new(),
            memberships: HashMap::new(),
        };

        // Available products only; products are ordered by name, and on a
        // price collision the first product keeps the slot (known
        // limitation of price-based matching, kept deterministic).
        let products =
            db::products::available_products_for_season(pool, cache.season.guid).await?;
        for product in products {
            if let Some(external_id) = &product.external_id {
                cache
                    .products_by_external_id
                    .insert(external_id.clone(), product.clone());
            }
            cache
                .products_by_name
                .entry(normalize_name(&product.name))
                .or_insert_with(|| product.clone());
            cache
                .products_by_price
                .entry(product.price_cents)
                .or_insert(product);
        }

        for user in db::users::all_users(pool).await? {
            cache.index_user(user);
        }

        for membership in db::memberships::memberships_for_season(pool, cache.season.guid).await? {
            cache.index_membership(membership);
        }

        tracing::debug!(
            season = %cache.season.name,
            products = cache.products_by_name.len(),
            users = cache.users_by_email.len(),
            memberships = cache.memberships.len(),
            "Reference cache built"
        );

        Ok(cache)
    }

    pub fn product_by_external_id(&self, external_id: &str) -> Option<&Product> {
        self.products_by_external_id.get(external_id)
    }

    /// Lookup by pre-normalized name (see [`normalize_name`]).
    pub fn product_by_normalized_name(&self, normalized: &str) -> Option<&Product> {
        self.products_by_name.get(normalized)
    }

    pub fn product_by_price(&self, price_cents: i64) -> Option<&Product> {
        self.products_by_price.get(&price_cents)
    }

    pub fn user_by_email(&self, email: &str) -> Option<&User> {
        self.users_by_email.get(&email.to_lowercase())
    }

    pub fn user_by_external_id(&self, external_id: &str) -> Option<&User> {
        self.users_by_external_id.get(external_id)
    }

    pub fn membership(&self, user_guid: Uuid, product_guid: Uuid) -> Option<&UserProduct> {
        self.memberships
            .get(&(user_guid, product_guid, self.season.guid))
    }

    /// Write a created or updated user through to the cache so subsequent
    /// rows resolve it without a query.
    pub fn add_user(&mut self, user: User) {
        self.index_user(user);
    }

    /// Write a created or updated membership through to the cache.
    pub fn add_membership(&mut self, membership: UserProduct) {
        self.index_membership(membership);
    }

    fn index_user(&mut self, user: User) {
        if let Some(external_id) = &user.external_profile_id {
            self.users_by_external_id
                .insert(external_id.clone(), user.clone());
        }
        self.users_by_email.insert(user.email.to_lowercase(), user);
    }

    fn index_membership(&mut self, membership: UserProduct) {
        self.memberships.insert(
            (
                membership.user_guid,
                membership.product_guid,
                membership.season_guid,
            ),
            membership,
        );
    }
}
