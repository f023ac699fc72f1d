//! Product catalog database operations

use anyhow::Result;
use hogline_common::db::{Product, ProductType};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

fn product_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Product> {
    let guid_str: String = row.get("guid");
    let season_str: String = row.get("season_guid");
    let type_str: String = row.get("product_type");
    let metadata_str: String = row.get("metadata");

    Ok(Product {
        guid: Uuid::parse_str(&guid_str)?,
        season_guid: Uuid::parse_str(&season_str)?,
        external_id: row.get("external_id"),
        slug: row.get("slug"),
        name: row.get("name"),
        product_type: ProductType::parse(&type_str)
            .ok_or_else(|| anyhow::anyhow!("unknown product type: {}", type_str))?,
        membership_tier: row.get("membership_tier"),
        price_cents: row.get("price_cents"),
        is_available: row.get::<i64, _>("is_available") != 0,
        metadata: serde_json::from_str(&metadata_str).unwrap_or_else(|_| serde_json::json!({})),
    })
}

/// Available products for a season, ordered by name.
///
/// Ordering makes the price-index collision rule deterministic: when two
/// products share a price, the first by name wins.
pub async fn available_products_for_season(
    pool: &SqlitePool,
    season_guid: Uuid,
) -> Result<Vec<Product>> {
    let rows = sqlx::query(
        r#"
        SELECT guid, season_guid, external_id, slug, name, product_type,
               membership_tier, price_cents, is_available, metadata
        FROM products
        WHERE season_guid = ? AND is_available = 1
        ORDER BY name
        "#,
    )
    .bind(season_guid.to_string())
    .fetch_all(pool)
    .await?;

    rows.iter().map(product_from_row).collect()
}

/// All products for a season regardless of availability.
pub async fn list_products_for_season(pool: &SqlitePool, season_guid: Uuid) -> Result<Vec<Product>> {
    let rows = sqlx::query(
        r#"
        SELECT guid, season_guid, external_id, slug, name, product_type,
               membership_tier, price_cents, is_available, metadata
        FROM products
        WHERE season_guid = ?
        ORDER BY name
        "#,
    )
    .bind(season_guid.to_string())
    .fetch_all(pool)
    .await?;

    rows.iter().map(product_from_row).collect()
}

pub async fn insert_product(pool: &SqlitePool, product: &Product) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO products (guid, season_guid, external_id, slug, name, product_type,
                              membership_tier, price_cents, is_available, metadata)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(product.guid.to_string())
    .bind(product.season_guid.to_string())
    .bind(&product.external_id)
    .bind(&product.slug)
    .bind(&product.name)
    .bind(product.product_type.as_str())
    .bind(&product.membership_tier)
    .bind(product.price_cents)
    .bind(product.is_available as i64)
    .bind(product.metadata.to_string())
    .execute(pool)
    .await?;

    Ok(())
}
