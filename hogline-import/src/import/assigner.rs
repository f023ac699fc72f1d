//! Membership assignment
//!
//! The transactional core of the import: resolves the row's profile(s) to
//! users and creates or updates the user-product record(s), all inside one
//! transaction per row so a partially applied row cannot exist. Cache
//! write-through and status recomputation happen after commit.

use crate::import::cache::ReferenceCache;
use crate::import::resolver::{resolve_user, ResolvedUser};
use crate::import::row::OrderItemRow;
use crate::{db, status};
use anyhow::Result;
use chrono::Utc;
use hogline_common::db::{AssignmentStatus, Product, ProductType, UserProduct};
use sqlx::SqlitePool;
use uuid::Uuid;

/// What one row's assignment did, for counters and the audit block.
#[derive(Debug, Default)]
pub struct AssignmentResult {
    pub users_created: u32,
    pub memberships_created: u32,
    pub memberships_updated: u32,
    pub couple: bool,
    /// (email, user guid) per assigned member, primary first
    pub members: Vec<(String, Uuid)>,
}

enum AssignOp {
    Created,
    Updated { was_active: bool },
}

/// Assign a matched product to the row's member(s).
pub async fn assign(
    pool: &SqlitePool,
    cache: &mut ReferenceCache,
    row: &OrderItemRow,
    product: &Product,
) -> Result<AssignmentResult> {
    let mut tx = pool.begin().await?;

    // Resolve all profiles first so a resolution failure rolls back cleanly
    let mut resolved: Vec<(ResolvedUser, i64)> = Vec::new();
    match &row.second_member {
        Some(second) => {
            // Couple: split the total evenly, odd cent to the primary
            let second_share = row.total_cents / 2;
            let primary_share = row.total_cents - second_share;
            let primary = resolve_user(&mut tx, cache, &row.primary).await?;
            let partner = resolve_user(&mut tx, cache, second).await?;
            resolved.push((primary, primary_share));
            resolved.push((partner, second_share));
        }
        None => {
            let primary = resolve_user(&mut tx, cache, &row.primary).await?;
            resolved.push((primary, row.total_cents));
        }
    }

    let partner_guids: Vec<Uuid> = resolved.iter().map(|(r, _)| r.user.guid).collect();
    let mut written: Vec<(UserProduct, AssignOp)> = Vec::new();

    for (index, (member, price_cents)) in resolved.iter().enumerate() {
        let partner_guid = if resolved.len() > 1 {
            partner_guids.get(1 - index).copied()
        } else {
            None
        };
        let metadata = assignment_metadata(row, partner_guid);

        let op = match cache.membership(member.user.guid, product.guid) {
            Some(existing) => {
                let was_active = existing.status == AssignmentStatus::Active;
                let mut membership = existing.clone();
                membership.status = AssignmentStatus::Active;
                membership.assigned_at = Utc::now();
                membership.expires_at = Some(cache.season.membership_expiry());
                membership.purchase_reference = Some(row.purchase_reference());
                membership.price_paid_cents = *price_cents;
                membership.metadata = merge_metadata(&membership.metadata, &metadata);
                db::memberships::update_assignment(&mut tx, &membership).await?;
                (membership, AssignOp::Updated { was_active })
            }
            None => {
                let membership = UserProduct {
                    guid: Uuid::new_v4(),
                    user_guid: member.user.guid,
                    product_guid: product.guid,
                    season_guid: cache.season.guid,
                    price_paid_cents: *price_cents,
                    status: AssignmentStatus::Active,
                    assigned_at: Utc::now(),
                    expires_at: Some(cache.season.membership_expiry()),
                    purchase_reference: Some(row.purchase_reference()),
                    refund_amount_cents: None,
                    refund_reason: None,
                    refunded_at: None,
                    metadata,
                };
                db::memberships::insert_membership(&mut tx, &membership).await?;
                (membership, AssignOp::Created)
            }
        };
        written.push(op);
    }

    tx.commit().await?;

    // Committed: make this row's effects visible to subsequent rows
    let mut result = AssignmentResult {
        couple: resolved.len() > 1,
        ..Default::default()
    };
    for (member, _) in &resolved {
        if member.created {
            result.users_created += 1;
        }
        result
            .members
            .push((member.user.email.clone(), member.user.guid));
        cache.add_user(member.user.clone());
    }

    let mut recompute_needed: Vec<Uuid> = Vec::new();
    for (membership, op) in written {
        let initial_active = match op {
            AssignOp::Created => {
                result.memberships_created += 1;
                true
            }
            AssignOp::Updated { was_active } => {
                result.memberships_updated += 1;
                !was_active
            }
        };
        if initial_active && product.product_type == ProductType::Membership {
            recompute_needed.push(membership.user_guid);
        }
        cache.add_membership(membership);
    }

    // Refresh the cached aggregate status only on the initial Active
    // assignment; the recompute itself is idempotent.
    for user_guid in recompute_needed {
        status::recompute_user_status_in_season(pool, user_guid, Some(&cache.season)).await?;
    }

    tracing::info!(
        order_id = %row.order_id,
        product = %product.name,
        members = result.members.len(),
        created = result.memberships_created,
        updated = result.memberships_updated,
        "Membership assignment committed"
    );

    Ok(result)
}

fn assignment_metadata(row: &OrderItemRow, partner_guid: Option<Uuid>) -> serde_json::Value {
    let mut metadata = serde_json::json!({
        "source": "curlingio_order_import",
        "order_id": row.order_id,
        "item_name": row.item_name,
    });
    if let Some(partner) = partner_guid {
        metadata["couple"] = serde_json::json!(true);
        metadata["partner_user_guid"] = serde_json::json!(partner.to_string());
    }
    metadata
}

/// Shallow-merge JSON objects; incoming keys overwrite existing ones.
/// Non-object existing metadata is replaced wholesale.
fn merge_metadata(existing: &serde_json::Value, incoming: &serde_json::Value) -> serde_json::Value {
    match (existing.as_object(), incoming.as_object()) {
        (Some(existing), Some(incoming)) => {
            let mut merged = existing.clone();
            for (key, value) in incoming {
                merged.insert(key.clone(), value.clone());
            }
            serde_json::Value::Object(merged)
        }
        _ => incoming.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn couple_split_sums_to_total_with_odd_cent_on_primary() {
        for total in [85000i64, 57501, 1, 0] {
            let second = total / 2;
            let primary = total - second;
            assert_eq!(primary + second, total);
            assert!(primary >= second);
            assert!(primary - second <= 1);
        }
    }

    #[test]
    fn metadata_merge_keeps_unrelated_keys() {
        let existing = serde_json::json!({"note": "manual entry", "order_id": "old"});
        let incoming = serde_json::json!({"order_id": "12345", "source": "curlingio_order_import"});
        let merged = merge_metadata(&existing, &incoming);
        assert_eq!(merged["note"], "manual entry");
        assert_eq!(merged["order_id"], "12345");
        assert_eq!(merged["source"], "curlingio_order_import");
    }
}
