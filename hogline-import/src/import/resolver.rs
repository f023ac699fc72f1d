//! User resolution
//!
//! Finds or creates a user from a parsed profile fragment. The external
//! profile id is the strongest key, then email; otherwise a new
//! placeholder-credentialed account is created. Runs inside the caller's
//! row transaction; the caller writes the result through to the cache
//! after commit.

use crate::db;
use crate::import::cache::ReferenceCache;
use crate::import::row::CurlerProfile;
use anyhow::Result;
use hogline_common::auth::{generate_placeholder_password, hash_password};
use hogline_common::db::{MembershipStatus, User};
use sqlx::SqliteConnection;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct ResolvedUser {
    pub user: User,
    pub created: bool,
}

/// Find-or-create a user for a profile fragment.
pub async fn resolve_user(
    conn: &mut SqliteConnection,
    cache: &ReferenceCache,
    profile: &CurlerProfile,
) -> Result<ResolvedUser> {
    // Strongest key first: the upstream profile id survives email changes
    if let Some(external_id) = &profile.external_id {
        if let Some(existing) = cache.user_by_external_id(external_id) {
            let mut user = existing.clone();
            if merge_profile(&mut user, profile) {
                db::users::update_user(conn, &user).await?;
            }
            return Ok(ResolvedUser {
                user,
                created: false,
            });
        }
    }

    if let Some(existing) = cache.user_by_email(&profile.email) {
        let mut user = existing.clone();
        if merge_profile(&mut user, profile) {
            db::users::update_user(conn, &user).await?;
        }
        return Ok(ResolvedUser {
            user,
            created: false,
        });
    }

    let user = user_from_profile(profile);
    db::users::insert_user(conn, &user).await?;

    tracing::info!(
        email = %user.email,
        external_id = ?user.external_profile_id,
        "Created user from import"
    );

    Ok(ResolvedUser {
        user,
        created: true,
    })
}

fn user_from_profile(profile: &CurlerProfile) -> User {
    User {
        guid: Uuid::new_v4(),
        name: profile.name.clone(),
        first_name: profile.first_name.clone(),
        last_name: profile.last_name.clone(),
        email: profile.email.clone(),
        // Throwaway secret; the member sets a real password through the
        // password-setup flow before first login.
        password_hash: hash_password(&generate_placeholder_password()),
        external_profile_id: profile.external_id.clone(),
        phone: profile.phone.clone(),
        address: profile.address.clone(),
        city: profile.city.clone(),
        province: profile.province.clone(),
        postal_code: profile.postal_code.clone(),
        date_of_birth: profile.date_of_birth,
        emergency_contact_name: profile.emergency_contact_name.clone(),
        emergency_contact_phone: profile.emergency_contact_phone.clone(),
        current_membership_status: MembershipStatus::Cancelled,
        email_verified_at: None,
    }
}

/// Merge incoming profile fields into an existing user. Non-destructive: a
/// blank incoming value never clears a stored one. Name fields are always
/// refreshed; the external profile id is first-write-wins.
///
/// Returns true when anything changed.
pub fn merge_profile(user: &mut User, profile: &CurlerProfile) -> bool {
    let mut changed = false;

    if !profile.name.is_empty() && user.name != profile.name {
        user.name = profile.name.clone();
        changed = true;
    }
    changed |= merge_field(&mut user.first_name, &profile.first_name);
    changed |= merge_field(&mut user.last_name, &profile.last_name);

    if user.external_profile_id.is_none() && profile.external_id.is_some() {
        user.external_profile_id = profile.external_id.clone();
        changed = true;
    }

    changed |= merge_field(&mut user.phone, &profile.phone);
    changed |= merge_field(&mut user.address, &profile.address);
    changed |= merge_field(&mut user.city, &profile.city);
    changed |= merge_field(&mut user.province, &profile.province);
    changed |= merge_field(&mut user.postal_code, &profile.postal_code);
    changed |= merge_field(
        &mut user.emergency_contact_name,
        &profile.emergency_contact_name,
    );
    changed |= merge_field(
        &mut user.emergency_contact_phone,
        &profile.emergency_contact_phone,
    );

    if let Some(dob) = profile.date_of_birth {
        if user.date_of_birth != Some(dob) {
            user.date_of_birth = Some(dob);
            changed = true;
        }
    }

    changed
}

fn merge_field(target: &mut Option<String>, incoming: &Option<String>) -> bool {
    match incoming {
        Some(value) if !value.is_empty() && target.as_deref() != Some(value.as_str()) => {
            *target = Some(value.clone());
            true
        }
        _ => false,
    }
}
