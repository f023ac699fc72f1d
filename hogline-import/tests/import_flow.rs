//! End-to-end import pipeline tests
//!
//! Drive the full orchestrator against an in-memory database and real CSV
//! fixtures on disk, and check the database rows, the run statistics, and
//! the audit log together.

use chrono::{Duration, Utc};
use hogline_common::db::init::create_all_tables;
use hogline_common::db::{Product, ProductType, Season};
use hogline_import::db;
use hogline_import::import::orchestrator::run_import;
use hogline_import::import::stats::ImportRunStats;
use hogline_import::mapping::ItemMapping;
use sqlx::{Row, SqlitePool};
use std::path::PathBuf;
use tempfile::TempDir;
use uuid::Uuid;

const CSV_HEADER: &str = "Order ID,Type,Item Name,User Name,User Email,Curler Name,Curler Email,\
Curler Phone,2nd Member Name,2nd Member Email,2nd Member Phone,Amount,Total,Status,Created";

async fn setup() -> (SqlitePool, Season) {
    let pool = SqlitePool::connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");
    create_all_tables(&pool).await.expect("schema creation failed");

    // A season that is running right now, so imported memberships are live
    let season = Season {
        guid: Uuid::new_v4(),
        name: "2025-2026".to_string(),
        slug: "2025-2026".to_string(),
        start_date: (Utc::now() - Duration::days(60)).date_naive(),
        end_date: (Utc::now() + Duration::days(300)).date_naive(),
        is_current: true,
    };
    db::seasons::insert_season(&pool, &season)
        .await
        .expect("season insert failed");

    let mut active = product(&season, "2025-2026 Membership: Active", 57500);
    active.external_id = Some("cio-mem-active".to_string());
    db::products::insert_product(&pool, &active).await.unwrap();

    let mut couple = product(&season, "2025-2026 Membership: Couple", 85001);
    couple.external_id = Some("cio-mem-couple".to_string());
    db::products::insert_product(&pool, &couple).await.unwrap();

    (pool, season)
}

fn product(season: &Season, name: &str, price_cents: i64) -> Product {
    Product {
        guid: Uuid::new_v4(),
        season_guid: season.guid,
        external_id: None,
        slug: name.to_lowercase().replace([' ', ':'], "-"),
        name: name.to_string(),
        product_type: ProductType::Membership,
        membership_tier: None,
        price_cents,
        is_available: true,
        metadata: serde_json::json!({}),
    }
}

fn write_csv(dir: &TempDir, rows: &[&str]) -> PathBuf {
    let path = dir.path().join("orders.csv");
    let mut content = String::from(CSV_HEADER);
    for row in rows {
        content.push('\n');
        content.push_str(row);
    }
    std::fs::write(&path, content).expect("failed to write CSV fixture");
    path
}

async fn import(pool: &SqlitePool, csv: &PathBuf) -> ImportRunStats {
    run_import(pool, csv, ItemMapping::builtin(), None)
        .await
        .expect("import run failed")
}

async fn membership_count(pool: &SqlitePool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM user_products")
        .fetch_one(pool)
        .await
        .unwrap()
}

#[tokio::test]
async fn single_purchase_creates_user_and_active_membership() {
    let (pool, season) = setup().await;
    let dir = TempDir::new().unwrap();
    let csv = write_csv(
        &dir,
        &["1001,Product,2025-2026 Membership: Active,Pat Doe,pat@example.com,Pat Doe,,555-0100,,,,575.00,575.00,Paid,2025-09-15 10:30:00"],
    );

    let stats = import(&pool, &csv).await;

    assert_eq!(stats.total_items, 1);
    assert_eq!(stats.users_created, 1);
    assert_eq!(stats.memberships_created, 1);
    assert_eq!(stats.memberships_updated, 0);
    assert_eq!(stats.couple_memberships, 0);
    assert_eq!(stats.skipped_no_product_match, 0);
    assert!(stats.warnings.is_empty());

    let row = sqlx::query(
        "SELECT status, price_paid_cents, purchase_reference, expires_at \
         FROM user_products LIMIT 1",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(row.get::<String, _>("status"), "active");
    assert_eq!(row.get::<i64, _>("price_paid_cents"), 57500);
    assert_eq!(
        row.get::<String, _>("purchase_reference"),
        "curlingio_order_1001"
    );
    assert_eq!(
        row.get::<String, _>("expires_at"),
        season.membership_expiry().to_rfc3339()
    );

    let user_status: String = sqlx::query_scalar(
        "SELECT current_membership_status FROM users WHERE email = 'pat@example.com'",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(user_status, "active");

    let log = std::fs::read_to_string(&stats.log_path).unwrap();
    assert!(log.contains("[SUCCESS] line 2"));
    assert!(log.contains("Season: 2025-2026"));
}

#[tokio::test]
async fn rerunning_the_same_file_updates_instead_of_duplicating() {
    let (pool, _season) = setup().await;
    let dir = TempDir::new().unwrap();
    let csv = write_csv(
        &dir,
        &["1001,Product,2025-2026 Membership: Active,Pat Doe,pat@example.com,,,,,,,575.00,575.00,Paid,"],
    );

    let first = import(&pool, &csv).await;
    assert_eq!(first.memberships_created, 1);
    assert_eq!(first.users_created, 1);

    let second = import(&pool, &csv).await;
    assert_eq!(second.memberships_created, 0);
    assert_eq!(second.memberships_updated, 1);
    assert_eq!(second.users_created, 0);

    assert_eq!(membership_count(&pool).await, 1);
    let user_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(user_count, 1);

    let reference: String =
        sqlx::query_scalar("SELECT purchase_reference FROM user_products LIMIT 1")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(reference, "curlingio_order_1001");
}

#[tokio::test]
async fn malformed_row_is_isolated_with_its_line_number() {
    let (pool, _season) = setup().await;
    let dir = TempDir::new().unwrap();
    let csv = write_csv(
        &dir,
        &[
            "1001,Product,2025-2026 Membership: Active,Pat Doe,pat@example.com,,,,,,,575.00,575.00,Paid,",
            // one column too many
            "1002,Product,2025-2026 Membership: Active,Sam Roe,sam@example.com,,,,,,,575.00,575.00,Paid,,EXTRA",
            "1003,Product,2025-2026 Membership: Active,Lee Park,lee@example.com,,,,,,,575.00,575.00,Paid,",
        ],
    );

    let stats = import(&pool, &csv).await;

    // Header is line 1, so the bad row is line 3
    assert_eq!(stats.total_items, 2);
    assert_eq!(stats.memberships_created, 2);
    assert_eq!(stats.warnings.len(), 1);
    assert!(stats.warnings[0].starts_with("line 3:"), "{:?}", stats.warnings);

    let log = std::fs::read_to_string(&stats.log_path).unwrap();
    assert!(log.contains("[ERROR] line 3"));
    assert!(log.contains("[SUCCESS] line 2"));
    assert!(log.contains("[SUCCESS] line 4"));
}

#[tokio::test]
async fn couple_row_splits_the_price_between_both_members() {
    let (pool, season) = setup().await;
    let dir = TempDir::new().unwrap();
    let csv = write_csv(
        &dir,
        &["2001,Product,2025-2026 Membership: Couple,Pat Doe,pat@example.com,Pat Doe,pat@example.com,,Sam Doe,sam@example.com,555-0101,850.01,850.01,Paid,"],
    );

    let stats = import(&pool, &csv).await;

    assert_eq!(stats.users_created, 2);
    assert_eq!(stats.memberships_created, 2);
    assert_eq!(stats.couple_memberships, 1);

    let memberships = db::memberships::memberships_for_season(&pool, season.guid)
        .await
        .unwrap();
    assert_eq!(memberships.len(), 2);

    let total: i64 = memberships.iter().map(|m| m.price_paid_cents).sum();
    assert_eq!(total, 85001);
    let mut prices: Vec<i64> = memberships.iter().map(|m| m.price_paid_cents).collect();
    prices.sort();
    assert_eq!(prices, vec![42500, 42501]);

    // Each half carries the same purchase reference and points at its partner
    for membership in &memberships {
        assert_eq!(
            membership.purchase_reference.as_deref(),
            Some("curlingio_order_2001")
        );
        let partner = membership.metadata["partner_user_guid"]
            .as_str()
            .expect("partner guid missing");
        let partner_guid = Uuid::parse_str(partner).unwrap();
        assert_ne!(partner_guid, membership.user_guid);
        assert!(memberships.iter().any(|m| m.user_guid == partner_guid));
    }

    // Both members end up active
    for email in ["pat@example.com", "sam@example.com"] {
        let status: String = sqlx::query_scalar(
            "SELECT current_membership_status FROM users WHERE email = ?",
        )
        .bind(email)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(status, "active");
    }
}

#[tokio::test]
async fn adjustment_sets_refund_fields_without_touching_status() {
    let (pool, season) = setup().await;
    let dir = TempDir::new().unwrap();
    let csv = write_csv(
        &dir,
        &[
            "3001,Product,2025-2026 Membership: Active,Pat Doe,pat@example.com,,,,,,,575.00,575.00,Paid,",
            "3001,Adjustment,Refund: schedule conflict,Pat Doe,pat@example.com,,,,,,,,-100.00,Refunded,2025-10-01 09:00:00",
        ],
    );

    let stats = import(&pool, &csv).await;

    assert_eq!(stats.total_items, 2);
    assert_eq!(stats.skipped_adjustment, 1);
    assert_eq!(stats.adjustments_applied, 1);
    assert_eq!(stats.adjustments_failed, 0);

    let memberships = db::memberships::memberships_for_season(&pool, season.guid)
        .await
        .unwrap();
    assert_eq!(memberships.len(), 1);
    let membership = &memberships[0];
    assert_eq!(membership.refund_amount_cents, Some(10000));
    assert_eq!(
        membership.refund_reason.as_deref(),
        Some("Refund: schedule conflict")
    );
    assert!(membership.refunded_at.is_some());
    // Refunds do not change the assignment status
    assert_eq!(membership.status.as_str(), "active");

    let log = std::fs::read_to_string(&stats.log_path).unwrap();
    assert!(log.contains("[ADJUSTMENT-APPLIED] line 3"));
}

#[tokio::test]
async fn adjustment_without_a_matching_purchase_is_reported() {
    let (pool, _season) = setup().await;
    let dir = TempDir::new().unwrap();
    let csv = write_csv(
        &dir,
        &["4001,Adjustment,Refund: no such order,Kim Lau,kim@example.com,,,,,,,,-50.00,Refunded,"],
    );

    let stats = import(&pool, &csv).await;

    assert_eq!(stats.skipped_adjustment, 1);
    assert_eq!(stats.adjustments_failed, 1);
    assert_eq!(stats.adjustments_applied, 0);
    assert_eq!(membership_count(&pool).await, 0);

    let log = std::fs::read_to_string(&stats.log_path).unwrap();
    assert!(log.contains("[ADJUSTMENT-FAILED] line 2"));
}

#[tokio::test]
async fn unmatched_items_are_tallied_for_the_operator() {
    let (pool, _season) = setup().await;
    let dir = TempDir::new().unwrap();
    let csv = write_csv(
        &dir,
        &[
            "5001,Product,Mystery Raffle Ticket,Pat Doe,pat@example.com,,,,,,,12.00,12.00,Paid,",
            "5002,Product,Mystery Raffle Ticket,Sam Roe,sam@example.com,,,,,,,12.00,12.00,Paid,",
        ],
    );

    let stats = import(&pool, &csv).await;

    assert_eq!(stats.skipped_no_product_match, 2);
    assert_eq!(stats.memberships_created, 0);
    assert_eq!(membership_count(&pool).await, 0);

    let unmatched = stats.unmatched_products();
    assert_eq!(unmatched.len(), 1);
    assert_eq!(unmatched[0].item_name, "Mystery Raffle Ticket");
    assert_eq!(unmatched[0].price_cents, 1200);
    assert_eq!(unmatched[0].count, 2);
    assert_eq!(unmatched[0].sample_order_ids, vec!["5001", "5002"]);

    let log = std::fs::read_to_string(&stats.log_path).unwrap();
    assert!(log.contains("[SKIP-NO-PRODUCT] line 2"));
    assert!(log.contains("[SKIP-NO-PRODUCT] line 3"));
}

#[tokio::test]
async fn blank_rows_are_skipped_silently() {
    let (pool, _season) = setup().await;
    let dir = TempDir::new().unwrap();
    let csv = write_csv(
        &dir,
        &[
            "1001,Product,2025-2026 Membership: Active,Pat Doe,pat@example.com,,,,,,,575.00,575.00,Paid,",
            ",,,,,,,,,,,,,,",
        ],
    );

    let stats = import(&pool, &csv).await;

    assert_eq!(stats.total_items, 1);
    assert!(stats.warnings.is_empty());
    assert_eq!(stats.memberships_created, 1);
}

#[tokio::test]
async fn import_without_a_current_season_fails_fast() {
    let pool = SqlitePool::connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");
    create_all_tables(&pool).await.unwrap();

    let dir = TempDir::new().unwrap();
    let csv = write_csv(
        &dir,
        &["1001,Product,2025-2026 Membership: Active,Pat Doe,pat@example.com,,,,,,,575.00,575.00,Paid,"],
    );

    let err = run_import(&pool, &csv, ItemMapping::builtin(), None)
        .await
        .expect_err("import must fail without a current season");
    assert!(err.to_string().contains("no current season"));
    assert_eq!(membership_count(&pool).await, 0);
}
