//! Import orchestration
//!
//! Drives the per-row pipeline: read the export, validate and classify
//! each row, dispatch purchases to the matcher/assigner and adjustments to
//! the adjustment processor, and record every outcome in the audit log and
//! run statistics. One malformed row never aborts the run; only the
//! pre-run preconditions are fatal.

use crate::db;
use crate::import::adjustment::{apply_adjustment, AdjustmentOutcome};
use crate::import::assigner::assign;
use crate::import::audit::{AuditLog, RowMarker};
use crate::import::cache::ReferenceCache;
use crate::import::matcher::{MatchOutcome, ProductMatcher};
use crate::import::row::OrderItemRow;
use crate::import::stats::ImportRunStats;
use crate::mapping::ItemMapping;
use anyhow::{Context, Result};
use chrono::Utc;
use hogline_common::money::format_cents;
use sqlx::SqlitePool;
use std::path::Path;

/// Run a full import of a curling.io order-item export.
///
/// Fatal preconditions: a current season must exist, the CSV must be
/// readable, and the audit log must be creatable. Everything after that is
/// handled row by row.
pub async fn run_import(
    pool: &SqlitePool,
    csv_path: &Path,
    mapping: ItemMapping,
    log_dir: Option<&Path>,
) -> Result<ImportRunStats> {
    let started_at = Utc::now();

    let season = db::seasons::current_season(pool)
        .await?
        .context("no current season is set; mark a season current before importing")?;

    // The whole file is read up front; export sizes make this fine
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(csv_path)
        .with_context(|| format!("cannot open input file {}", csv_path.display()))?;
    let headers: Vec<String> = reader
        .headers()
        .with_context(|| format!("cannot read header row of {}", csv_path.display()))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    let records: Vec<Result<csv::StringRecord, csv::Error>> = reader.records().collect();

    let log_dir = log_dir
        .or_else(|| csv_path.parent().filter(|p| !p.as_os_str().is_empty()))
        .unwrap_or_else(|| Path::new("."));
    let mut audit = AuditLog::create(log_dir, started_at)
        .with_context(|| format!("cannot create audit log in {}", log_dir.display()))?;
    audit.write_header(csv_path, &season, started_at)?;

    tracing::info!(
        source = %csv_path.display(),
        season = %season.name,
        rows = records.len(),
        log = %audit.path().display(),
        "Order import started"
    );

    let mut cache = ReferenceCache::build(pool, season).await?;
    let matcher = ProductMatcher::new(mapping);
    let mut stats = ImportRunStats::default();

    for (index, record) in records.into_iter().enumerate() {
        // Header is line 1; the first data row is line 2
        let line = index + 2;

        let record = match record {
            Ok(record) => record,
            Err(e) => {
                stats.warn(line, format!("unreadable row: {}", e));
                audit.row_block(RowMarker::Error, line, &[("error", e.to_string())])?;
                continue;
            }
        };

        // Fully blank rows are skipped silently
        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }

        // Pad short rows so trailing blank columns don't spuriously fail
        let mut fields: Vec<String> = record.iter().map(|f| f.to_string()).collect();
        while fields.len() < headers.len() {
            fields.push(String::new());
        }

        let row = match OrderItemRow::from_record(&headers, &fields, line) {
            Ok(row) => row,
            Err(e) => {
                stats.warn(line, &e);
                audit.row_block(RowMarker::Error, line, &[("error", e.to_string())])?;
                continue;
            }
        };

        stats.total_items += 1;

        if row.is_adjustment() {
            stats.skipped_adjustment += 1;
            process_adjustment(pool, &cache, &row, &mut stats, &mut audit).await?;
        } else {
            process_purchase(pool, &mut cache, &matcher, &row, &mut stats, &mut audit).await?;
        }
    }

    audit.write_summary(&stats)?;
    stats.log_path = audit.finish()?;

    tracing::info!(
        total_items = stats.total_items,
        memberships_created = stats.memberships_created,
        memberships_updated = stats.memberships_updated,
        users_created = stats.users_created,
        no_match = stats.skipped_no_product_match,
        warnings = stats.warnings.len(),
        "Order import finished"
    );

    Ok(stats)
}

async fn process_purchase(
    pool: &SqlitePool,
    cache: &mut ReferenceCache,
    matcher: &ProductMatcher,
    row: &OrderItemRow,
    stats: &mut ImportRunStats,
    audit: &mut AuditLog,
) -> Result<()> {
    let (product, strategy) = match matcher.resolve(cache, &row.item_name, row.total_cents) {
        MatchOutcome::Matched { product, strategy } => (product, strategy),
        MatchOutcome::NoMatch => {
            stats.skipped_no_product_match += 1;
            stats.record_unmatched(&row.item_name, row.total_cents, &row.order_id);
            audit.row_block(
                RowMarker::SkipNoProduct,
                row.line,
                &[
                    ("order", row.order_id.clone()),
                    ("item", row.item_name.clone()),
                    ("total", format_cents(row.total_cents)),
                ],
            )?;
            return Ok(());
        }
    };

    match assign(pool, cache, row, &product).await {
        Ok(result) => {
            stats.users_created += result.users_created;
            stats.memberships_created += result.memberships_created;
            stats.memberships_updated += result.memberships_updated;
            if result.couple {
                stats.couple_memberships += 1;
            }

            let members = result
                .members
                .iter()
                .map(|(email, _)| email.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            audit.row_block(
                RowMarker::Success,
                row.line,
                &[
                    ("order", row.order_id.clone()),
                    ("item", row.item_name.clone()),
                    ("product", product.name.clone()),
                    ("strategy", strategy.as_str().to_string()),
                    ("members", members),
                    ("total", format_cents(row.total_cents)),
                    (
                        "result",
                        format!(
                            "{} created, {} updated",
                            result.memberships_created, result.memberships_updated
                        ),
                    ),
                ],
            )?;
        }
        Err(e) => {
            stats.warn(row.line, format!("assignment failed: {:#}", e));
            audit.row_block(
                RowMarker::Error,
                row.line,
                &[
                    ("order", row.order_id.clone()),
                    ("item", row.item_name.clone()),
                    ("error", format!("{:#}", e)),
                ],
            )?;
        }
    }

    Ok(())
}

async fn process_adjustment(
    pool: &SqlitePool,
    cache: &ReferenceCache,
    row: &OrderItemRow,
    stats: &mut ImportRunStats,
    audit: &mut AuditLog,
) -> Result<()> {
    match apply_adjustment(pool, cache, row).await {
        Ok(AdjustmentOutcome::Applied {
            email,
            membership_guid,
            refund_cents,
        }) => {
            stats.adjustments_applied += 1;
            audit.row_block(
                RowMarker::AdjustmentApplied,
                row.line,
                &[
                    ("order", row.order_id.clone()),
                    ("member", email),
                    ("membership", membership_guid.to_string()),
                    ("refund", format_cents(refund_cents)),
                    ("reason", row.item_name.clone()),
                ],
            )?;
        }
        Ok(AdjustmentOutcome::Failed { reason }) => {
            stats.adjustments_failed += 1;
            audit.row_block(
                RowMarker::AdjustmentFailed,
                row.line,
                &[("order", row.order_id.clone()), ("reason", reason)],
            )?;
        }
        Err(e) => {
            stats.warn(row.line, format!("adjustment failed: {:#}", e));
            audit.row_block(
                RowMarker::Error,
                row.line,
                &[
                    ("order", row.order_id.clone()),
                    ("error", format!("{:#}", e)),
                ],
            )?;
        }
    }

    Ok(())
}
