//! Membership (user_products) database operations

use anyhow::Result;
use chrono::{DateTime, Utc};
use hogline_common::db::{AssignmentStatus, UserProduct};
use sqlx::{Row, SqliteConnection, SqlitePool};
use uuid::Uuid;

fn membership_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<UserProduct> {
    let guid_str: String = row.get("guid");
    let user_str: String = row.get("user_guid");
    let product_str: String = row.get("product_guid");
    let season_str: String = row.get("season_guid");
    let status_str: String = row.get("status");
    let assigned_str: String = row.get("assigned_at");
    let expires_str: Option<String> = row.get("expires_at");
    let refunded_str: Option<String> = row.get("refunded_at");
    let metadata_str: String = row.get("metadata");

    Ok(UserProduct {
        guid: Uuid::parse_str(&guid_str)?,
        user_guid: Uuid::parse_str(&user_str)?,
        product_guid: Uuid::parse_str(&product_str)?,
        season_guid: Uuid::parse_str(&season_str)?,
        price_paid_cents: row.get("price_paid_cents"),
        status: AssignmentStatus::parse(&status_str)
            .ok_or_else(|| anyhow::anyhow!("unknown assignment status: {}", status_str))?,
        assigned_at: DateTime::parse_from_rfc3339(&assigned_str)?.with_timezone(&Utc),
        expires_at: expires_str
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|t| t.with_timezone(&Utc)),
        purchase_reference: row.get("purchase_reference"),
        refund_amount_cents: row.get("refund_amount_cents"),
        refund_reason: row.get("refund_reason"),
        refunded_at: refunded_str
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|t| t.with_timezone(&Utc)),
        metadata: serde_json::from_str(&metadata_str).unwrap_or_else(|_| serde_json::json!({})),
    })
}

const MEMBERSHIP_COLUMNS: &str = "guid, user_guid, product_guid, season_guid, price_paid_cents, \
     status, assigned_at, expires_at, purchase_reference, refund_amount_cents, refund_reason, \
     refunded_at, metadata";

/// All memberships for one season (reference-cache build).
pub async fn memberships_for_season(pool: &SqlitePool, season_guid: Uuid) -> Result<Vec<UserProduct>> {
    let sql = format!(
        "SELECT {} FROM user_products WHERE season_guid = ?",
        MEMBERSHIP_COLUMNS
    );
    let rows = sqlx::query(&sql)
        .bind(season_guid.to_string())
        .fetch_all(pool)
        .await?;
    rows.iter().map(membership_from_row).collect()
}

/// Locate a membership by its idempotency key within a season.
pub async fn find_by_purchase_reference(
    pool: &SqlitePool,
    user_guid: Uuid,
    season_guid: Uuid,
    purchase_reference: &str,
) -> Result<Option<UserProduct>> {
    let sql = format!(
        "SELECT {} FROM user_products \
         WHERE user_guid = ? AND season_guid = ? AND purchase_reference = ? \
         LIMIT 1",
        MEMBERSHIP_COLUMNS
    );
    let row = sqlx::query(&sql)
        .bind(user_guid.to_string())
        .bind(season_guid.to_string())
        .bind(purchase_reference)
        .fetch_optional(pool)
        .await?;

    match row {
        Some(row) => Ok(Some(membership_from_row(&row)?)),
        None => Ok(None),
    }
}

/// Insert a new assignment inside the caller's transaction.
pub async fn insert_membership(conn: &mut SqliteConnection, membership: &UserProduct) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO user_products (guid, user_guid, product_guid, season_guid, price_paid_cents,
                                   status, assigned_at, expires_at, purchase_reference,
                                   refund_amount_cents, refund_reason, refunded_at, metadata)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(membership.guid.to_string())
    .bind(membership.user_guid.to_string())
    .bind(membership.product_guid.to_string())
    .bind(membership.season_guid.to_string())
    .bind(membership.price_paid_cents)
    .bind(membership.status.as_str())
    .bind(membership.assigned_at.to_rfc3339())
    .bind(membership.expires_at.map(|t| t.to_rfc3339()))
    .bind(&membership.purchase_reference)
    .bind(membership.refund_amount_cents)
    .bind(&membership.refund_reason)
    .bind(membership.refunded_at.map(|t| t.to_rfc3339()))
    .bind(membership.metadata.to_string())
    .execute(conn)
    .await?;

    Ok(())
}

/// Refresh an existing assignment in place (re-import of the same purchase),
/// inside the caller's transaction. Refund fields are left untouched.
pub async fn update_assignment(conn: &mut SqliteConnection, membership: &UserProduct) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE user_products
        SET price_paid_cents = ?, status = ?, assigned_at = ?, expires_at = ?,
            purchase_reference = ?, metadata = ?, updated_at = CURRENT_TIMESTAMP
        WHERE guid = ?
        "#,
    )
    .bind(membership.price_paid_cents)
    .bind(membership.status.as_str())
    .bind(membership.assigned_at.to_rfc3339())
    .bind(membership.expires_at.map(|t| t.to_rfc3339()))
    .bind(&membership.purchase_reference)
    .bind(membership.metadata.to_string())
    .bind(membership.guid.to_string())
    .execute(conn)
    .await?;

    Ok(())
}

/// Record a refund against an assignment. Status is intentionally not
/// changed; a refunded membership stays in its current status.
pub async fn apply_refund(
    pool: &SqlitePool,
    membership_guid: Uuid,
    refund_amount_cents: i64,
    refund_reason: &str,
    refunded_at: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE user_products
        SET refund_amount_cents = ?, refund_reason = ?, refunded_at = ?,
            updated_at = CURRENT_TIMESTAMP
        WHERE guid = ?
        "#,
    )
    .bind(refund_amount_cents)
    .bind(refund_reason)
    .bind(refunded_at.to_rfc3339())
    .bind(membership_guid.to_string())
    .execute(pool)
    .await?;

    Ok(())
}

/// One membership-type assignment row, as the status recompute sees it.
#[derive(Debug, Clone)]
pub struct MembershipAssignment {
    pub status: AssignmentStatus,
    pub expires_at: Option<DateTime<Utc>>,
}

/// A user's membership-type assignments within a season.
pub async fn membership_assignments_for_user(
    pool: &SqlitePool,
    user_guid: Uuid,
    season_guid: Uuid,
) -> Result<Vec<MembershipAssignment>> {
    let rows = sqlx::query(
        r#"
        SELECT up.status, up.expires_at
        FROM user_products up
        JOIN products p ON p.guid = up.product_guid
        WHERE up.user_guid = ? AND up.season_guid = ? AND p.product_type = 'membership'
        "#,
    )
    .bind(user_guid.to_string())
    .bind(season_guid.to_string())
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            let status_str: String = row.get("status");
            let expires_str: Option<String> = row.get("expires_at");
            Ok(MembershipAssignment {
                status: AssignmentStatus::parse(&status_str)
                    .ok_or_else(|| anyhow::anyhow!("unknown assignment status: {}", status_str))?,
                expires_at: expires_str
                    .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
                    .map(|t| t.with_timezone(&Utc)),
            })
        })
        .collect()
}
