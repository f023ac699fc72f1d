//! Membership status recomputation
//!
//! The aggregate status cached on a user record is a pure function of that
//! user's membership-type assignments within the current season. The
//! precedence logic is storage-agnostic; the surrounding functions fetch
//! the rows and write the cache back.

use crate::db;
use crate::db::memberships::MembershipAssignment;
use anyhow::Result;
use chrono::{DateTime, Utc};
use hogline_common::db::{AssignmentStatus, MembershipStatus, Season};
use sqlx::SqlitePool;
use uuid::Uuid;

/// Users per chunk in the bulk sweep
const SWEEP_CHUNK_SIZE: i64 = 100;

/// Status precedence, first match wins:
///
/// 1. Active: any Active assignment with no expiry or a future expiry
/// 2. Pending: else any Pending assignment
/// 3. Expired: else any assignment at all
/// 4. Cancelled: no membership-type assignment exists
pub fn compute_status(
    assignments: &[MembershipAssignment],
    now: DateTime<Utc>,
) -> MembershipStatus {
    let has_live_active = assignments.iter().any(|a| {
        a.status == AssignmentStatus::Active && a.expires_at.map_or(true, |expiry| expiry > now)
    });
    if has_live_active {
        return MembershipStatus::Active;
    }

    if assignments
        .iter()
        .any(|a| a.status == AssignmentStatus::Pending)
    {
        return MembershipStatus::Pending;
    }

    if !assignments.is_empty() {
        return MembershipStatus::Expired;
    }

    MembershipStatus::Cancelled
}

/// Recompute one user's cached status against a known season.
///
/// With no current season the status is forced to Expired. Idempotent and
/// cheap: one query plus one update.
pub async fn recompute_user_status_in_season(
    pool: &SqlitePool,
    user_guid: Uuid,
    season: Option<&Season>,
) -> Result<MembershipStatus> {
    let status = match season {
        None => MembershipStatus::Expired,
        Some(season) => {
            let assignments =
                db::memberships::membership_assignments_for_user(pool, user_guid, season.guid)
                    .await?;
            compute_status(&assignments, Utc::now())
        }
    };

    db::users::update_membership_status(pool, user_guid, status).await?;

    tracing::debug!(
        user = %user_guid,
        status = status.as_str(),
        "Membership status recomputed"
    );
    Ok(status)
}

/// Recompute one user's cached status against the current season.
pub async fn recompute_user_status(pool: &SqlitePool, user_guid: Uuid) -> Result<MembershipStatus> {
    let season = db::seasons::current_season(pool).await?;
    recompute_user_status_in_season(pool, user_guid, season.as_ref()).await
}

/// Bulk sweep over every user, chunked to bound memory. Returns the number
/// of users recomputed.
pub async fn recompute_all(pool: &SqlitePool) -> Result<u64> {
    let season = db::seasons::current_season(pool).await?;
    let mut recomputed = 0u64;
    let mut after = None;

    loop {
        let guids = db::users::user_guids_after(pool, after, SWEEP_CHUNK_SIZE).await?;
        if guids.is_empty() {
            break;
        }
        for guid in &guids {
            recompute_user_status_in_season(pool, *guid, season.as_ref()).await?;
            recomputed += 1;
        }
        after = guids.last().copied();
    }

    tracing::info!(users = recomputed, "Membership status sweep complete");
    Ok(recomputed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn assignment(status: AssignmentStatus, expires_at: Option<DateTime<Utc>>) -> MembershipAssignment {
        MembershipAssignment { status, expires_at }
    }

    #[test]
    fn active_with_future_or_no_expiry_wins() {
        let now = Utc::now();
        let future = now + Duration::days(30);

        let status = compute_status(
            &[assignment(AssignmentStatus::Active, Some(future))],
            now,
        );
        assert_eq!(status, MembershipStatus::Active);

        let status = compute_status(&[assignment(AssignmentStatus::Active, None)], now);
        assert_eq!(status, MembershipStatus::Active);
    }

    #[test]
    fn expired_active_assignment_does_not_count_as_active() {
        let now = Utc::now();
        let past = now - Duration::days(1);

        let status = compute_status(&[assignment(AssignmentStatus::Active, Some(past))], now);
        assert_eq!(status, MembershipStatus::Expired);
    }

    #[test]
    fn pending_beats_expired() {
        let now = Utc::now();
        let past = now - Duration::days(1);

        let status = compute_status(
            &[
                assignment(AssignmentStatus::Expired, Some(past)),
                assignment(AssignmentStatus::Pending, None),
            ],
            now,
        );
        assert_eq!(status, MembershipStatus::Pending);
    }

    #[test]
    fn any_assignment_at_all_means_expired_not_cancelled() {
        let now = Utc::now();
        let status = compute_status(&[assignment(AssignmentStatus::Cancelled, None)], now);
        assert_eq!(status, MembershipStatus::Expired);
    }

    #[test]
    fn no_assignments_means_cancelled() {
        let status = compute_status(&[], Utc::now());
        assert_eq!(status, MembershipStatus::Cancelled);
    }
}
