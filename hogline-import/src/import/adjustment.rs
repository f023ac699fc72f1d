//! Adjustment processing
//!
//! An adjustment row is a refund/cancellation against a prior purchase in
//! the same order. The original membership is located by the shared
//! purchase reference and its refund fields are set; its status is
//! intentionally left alone.

use crate::db;
use crate::import::cache::ReferenceCache;
use crate::import::row::OrderItemRow;
use anyhow::Result;
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

/// Outcome of applying one adjustment row. Failure to find the original
/// purchase is a reported business outcome, not an error.
#[derive(Debug, Clone)]
pub enum AdjustmentOutcome {
    Applied {
        email: String,
        membership_guid: Uuid,
        refund_cents: i64,
    },
    Failed {
        reason: String,
    },
}

/// Apply a refund to the membership created by the matching purchase row.
pub async fn apply_adjustment(
    pool: &SqlitePool,
    cache: &ReferenceCache,
    row: &OrderItemRow,
) -> Result<AdjustmentOutcome> {
    // Adjustments identify the member by the order's buyer email
    let user = match cache.user_by_email(&row.buyer_email) {
        Some(user) => user.clone(),
        None => {
            return Ok(AdjustmentOutcome::Failed {
                reason: format!("no user with email {}", row.buyer_email),
            });
        }
    };

    let purchase_reference = row.purchase_reference();
    let membership = match db::memberships::find_by_purchase_reference(
        pool,
        user.guid,
        cache.season.guid,
        &purchase_reference,
    )
    .await?
    {
        Some(membership) => membership,
        None => {
            return Ok(AdjustmentOutcome::Failed {
                reason: format!(
                    "no membership with purchase reference {} for {}",
                    purchase_reference, row.buyer_email
                ),
            });
        }
    };

    let refund_cents = row.total_cents.abs();
    let refunded_at = row.created_at.unwrap_or_else(Utc::now);
    db::memberships::apply_refund(
        pool,
        membership.guid,
        refund_cents,
        &row.item_name,
        refunded_at,
    )
    .await?;

    tracing::info!(
        order_id = %row.order_id,
        email = %user.email,
        refund_cents = refund_cents,
        "Adjustment applied"
    );

    Ok(AdjustmentOutcome::Applied {
        email: user.email,
        membership_guid: membership.guid,
        refund_cents,
    })
}
