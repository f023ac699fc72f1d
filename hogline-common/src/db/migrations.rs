//! Database schema migrations
//!
//! Versioned migrations so existing databases upgrade in place without
//! manual intervention. Guidelines:
//!
//! 1. Never modify an existing migration - add a new one instead
//! 2. Prefer ALTER TABLE over DROP/CREATE to preserve data
//! 3. Every migration must be idempotent (check before altering)

use crate::Result;
use sqlx::SqlitePool;
use tracing::info;

/// Current schema version
///
/// **IMPORTANT:** Increment this when adding new migrations
const CURRENT_SCHEMA_VERSION: i32 = 1;

/// Get current schema version from database
///
/// Returns 0 if the schema_version table has no rows yet
async fn get_schema_version(pool: &SqlitePool) -> Result<i32> {
    let version: Option<i32> = sqlx::query_scalar("SELECT MAX(version) FROM schema_version")
        .fetch_one(pool)
        .await?;
    Ok(version.unwrap_or(0))
}

async fn set_schema_version(pool: &SqlitePool, version: i32) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO schema_version (version) VALUES (?)")
        .bind(version)
        .execute(pool)
        .await?;
    Ok(())
}

/// Run all pending migrations
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    let version = get_schema_version(pool).await?;

    if version >= CURRENT_SCHEMA_VERSION {
        return Ok(());
    }

    if version < 1 {
        migrate_v1(pool).await?;
        set_schema_version(pool, 1).await?;
    }

    info!(
        from = version,
        to = CURRENT_SCHEMA_VERSION,
        "Database migrations applied"
    );
    Ok(())
}

/// v1: baseline schema (tables created by init); nothing to transform.
async fn migrate_v1(_pool: &SqlitePool) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init::create_all_tables;

    #[tokio::test]
    async fn migrations_record_current_version() {
        let pool = SqlitePool::connect("sqlite::memory:")
            .await
            .expect("Failed to create in-memory database");
        create_all_tables(&pool).await.unwrap();

        run_migrations(&pool).await.unwrap();
        run_migrations(&pool).await.unwrap(); // idempotent

        assert_eq!(get_schema_version(&pool).await.unwrap(), CURRENT_SCHEMA_VERSION);
    }
}
