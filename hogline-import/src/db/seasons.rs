//! Season database operations

use anyhow::Result;
use chrono::NaiveDate;
use hogline_common::db::Season;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

fn season_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Season> {
    let guid_str: String = row.get("guid");
    let start: String = row.get("start_date");
    let end: String = row.get("end_date");

    Ok(Season {
        guid: Uuid::parse_str(&guid_str)?,
        name: row.get("name"),
        slug: row.get("slug"),
        start_date: NaiveDate::parse_from_str(&start, "%Y-%m-%d")?,
        end_date: NaiveDate::parse_from_str(&end, "%Y-%m-%d")?,
        is_current: row.get::<i64, _>("is_current") != 0,
    })
}

/// Load the season marked current, if any.
pub async fn current_season(pool: &SqlitePool) -> Result<Option<Season>> {
    let row = sqlx::query(
        r#"
        SELECT guid, name, slug, start_date, end_date, is_current
        FROM seasons
        WHERE is_current = 1
        LIMIT 1
        "#,
    )
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => Ok(Some(season_from_row(&row)?)),
        None => Ok(None),
    }
}

pub async fn list_seasons(pool: &SqlitePool) -> Result<Vec<Season>> {
    let rows = sqlx::query(
        r#"
        SELECT guid, name, slug, start_date, end_date, is_current
        FROM seasons
        ORDER BY start_date
        "#,
    )
    .fetch_all(pool)
    .await?;

    rows.iter().map(season_from_row).collect()
}

pub async fn insert_season(pool: &SqlitePool, season: &Season) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO seasons (guid, name, slug, start_date, end_date, is_current)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(season.guid.to_string())
    .bind(&season.name)
    .bind(&season.slug)
    .bind(season.start_date.format("%Y-%m-%d").to_string())
    .bind(season.end_date.format("%Y-%m-%d").to_string())
    .bind(season.is_current as i64)
    .execute(pool)
    .await?;

    if season.is_current {
        set_current_season(pool, season.guid).await?;
    }

    Ok(())
}

/// Mark one season current. The flip is exclusive: every other season is
/// cleared in the same transaction.
pub async fn set_current_season(pool: &SqlitePool, guid: Uuid) -> Result<()> {
    let mut tx = pool.begin().await?;

    sqlx::query("UPDATE seasons SET is_current = 0, updated_at = CURRENT_TIMESTAMP WHERE is_current = 1")
        .execute(&mut *tx)
        .await?;

    let updated = sqlx::query(
        "UPDATE seasons SET is_current = 1, updated_at = CURRENT_TIMESTAMP WHERE guid = ?",
    )
    .bind(guid.to_string())
    .execute(&mut *tx)
    .await?
    .rows_affected();

    if updated == 0 {
        tx.rollback().await?;
        anyhow::bail!("season not found: {}", guid);
    }

    tx.commit().await?;
    Ok(())
}
