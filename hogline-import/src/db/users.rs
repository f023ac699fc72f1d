//! User database operations

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use hogline_common::db::{MembershipStatus, User};
use sqlx::{Row, SqliteConnection, SqlitePool};
use uuid::Uuid;

fn user_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<User> {
    let guid_str: String = row.get("guid");
    let status_str: String = row.get("current_membership_status");
    let dob: Option<String> = row.get("date_of_birth");
    let verified: Option<String> = row.get("email_verified_at");

    Ok(User {
        guid: Uuid::parse_str(&guid_str)?,
        name: row.get("name"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        external_profile_id: row.get("external_profile_id"),
        phone: row.get("phone"),
        address: row.get("address"),
        city: row.get("city"),
        province: row.get("province"),
        postal_code: row.get("postal_code"),
        date_of_birth: dob.and_then(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok()),
        emergency_contact_name: row.get("emergency_contact_name"),
        emergency_contact_phone: row.get("emergency_contact_phone"),
        current_membership_status: MembershipStatus::parse(&status_str)
            .unwrap_or(MembershipStatus::Cancelled),
        email_verified_at: verified
            .and_then(|v| DateTime::parse_from_rfc3339(&v).ok())
            .map(|v| v.with_timezone(&Utc)),
    })
}

const USER_COLUMNS: &str = "guid, name, first_name, last_name, email, password_hash, \
     external_profile_id, phone, address, city, province, postal_code, date_of_birth, \
     emergency_contact_name, emergency_contact_phone, current_membership_status, \
     email_verified_at";

/// Load every user (reference-cache build).
pub async fn all_users(pool: &SqlitePool) -> Result<Vec<User>> {
    let sql = format!("SELECT {} FROM users ORDER BY email", USER_COLUMNS);
    let rows = sqlx::query(&sql).fetch_all(pool).await?;
    rows.iter().map(user_from_row).collect()
}

pub async fn user_by_email(pool: &SqlitePool, email: &str) -> Result<Option<User>> {
    let sql = format!(
        "SELECT {} FROM users WHERE email = ? COLLATE NOCASE LIMIT 1",
        USER_COLUMNS
    );
    let row = sqlx::query(&sql).bind(email).fetch_optional(pool).await?;
    match row {
        Some(row) => Ok(Some(user_from_row(&row)?)),
        None => Ok(None),
    }
}

/// Insert a new user inside the caller's transaction.
pub async fn insert_user(conn: &mut SqliteConnection, user: &User) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO users (guid, name, first_name, last_name, email, password_hash,
                           external_profile_id, phone, address, city, province, postal_code,
                           date_of_birth, emergency_contact_name, emergency_contact_phone,
                           current_membership_status, email_verified_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(user.guid.to_string())
    .bind(&user.name)
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(&user.external_profile_id)
    .bind(&user.phone)
    .bind(&user.address)
    .bind(&user.city)
    .bind(&user.province)
    .bind(&user.postal_code)
    .bind(user.date_of_birth.map(|d| d.format("%Y-%m-%d").to_string()))
    .bind(&user.emergency_contact_name)
    .bind(&user.emergency_contact_phone)
    .bind(user.current_membership_status.as_str())
    .bind(user.email_verified_at.map(|v| v.to_rfc3339()))
    .execute(conn)
    .await?;

    Ok(())
}

/// Write a merged profile back, inside the caller's transaction.
///
/// Email and password are not touched here; the import only refreshes
/// profile fields on existing accounts.
pub async fn update_user(conn: &mut SqliteConnection, user: &User) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE users
        SET name = ?, first_name = ?, last_name = ?, external_profile_id = ?,
            phone = ?, address = ?, city = ?, province = ?, postal_code = ?,
            date_of_birth = ?, emergency_contact_name = ?, emergency_contact_phone = ?,
            updated_at = CURRENT_TIMESTAMP
        WHERE guid = ?
        "#,
    )
    .bind(&user.name)
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(&user.external_profile_id)
    .bind(&user.phone)
    .bind(&user.address)
    .bind(&user.city)
    .bind(&user.province)
    .bind(&user.postal_code)
    .bind(user.date_of_birth.map(|d| d.format("%Y-%m-%d").to_string()))
    .bind(&user.emergency_contact_name)
    .bind(&user.emergency_contact_phone)
    .bind(user.guid.to_string())
    .execute(conn)
    .await?;

    Ok(())
}

/// Write the cached aggregate membership status.
pub async fn update_membership_status(
    pool: &SqlitePool,
    user_guid: Uuid,
    status: MembershipStatus,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE users
        SET current_membership_status = ?, updated_at = CURRENT_TIMESTAMP
        WHERE guid = ?
        "#,
    )
    .bind(status.as_str())
    .bind(user_guid.to_string())
    .execute(pool)
    .await?;

    Ok(())
}

/// Keyset-paginated page of user guids for the bulk status sweep.
pub async fn user_guids_after(
    pool: &SqlitePool,
    after: Option<Uuid>,
    limit: i64,
) -> Result<Vec<Uuid>> {
    let rows = match after {
        Some(after) => {
            sqlx::query("SELECT guid FROM users WHERE guid > ? ORDER BY guid LIMIT ?")
                .bind(after.to_string())
                .bind(limit)
                .fetch_all(pool)
                .await?
        }
        None => {
            sqlx::query("SELECT guid FROM users ORDER BY guid LIMIT ?")
                .bind(limit)
                .fetch_all(pool)
                .await?
        }
    };

    rows.iter()
        .map(|row| {
            let guid: String = row.get("guid");
            Ok(Uuid::parse_str(&guid)?)
        })
        .collect()
}
