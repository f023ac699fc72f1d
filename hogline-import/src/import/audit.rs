//! Audit log
//!
//! Append-only, human-readable record of one import run: a header block,
//! one tagged block per processed row, and a trailing summary. Written next
//! to the input file so the operator keeps the trail with the source data.

use crate::import::stats::ImportRunStats;
use chrono::{DateTime, Utc};
use hogline_common::db::Season;
use hogline_common::money::format_cents;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Outcome marker for a row block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowMarker {
    Success,
    SkipNoProduct,
    AdjustmentApplied,
    AdjustmentFailed,
    Error,
}

impl RowMarker {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "[SUCCESS]",
            Self::SkipNoProduct => "[SKIP-NO-PRODUCT]",
            Self::AdjustmentApplied => "[ADJUSTMENT-APPLIED]",
            Self::AdjustmentFailed => "[ADJUSTMENT-FAILED]",
            Self::Error => "[ERROR]",
        }
    }
}

pub struct AuditLog {
    writer: BufWriter<File>,
    path: PathBuf,
}

impl AuditLog {
    /// Create the run log in `dir`, named with the run timestamp.
    /// Failure here is fatal for the whole run.
    pub fn create(dir: &Path, started_at: DateTime<Utc>) -> io::Result<Self> {
        let file_name = format!(
            "order_import_{}.log",
            started_at.format("%Y%m%d_%H%M%S")
        );
        let path = dir.join(file_name);
        let writer = BufWriter::new(File::create(&path)?);
        Ok(Self { writer, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write_header(
        &mut self,
        source: &Path,
        season: &Season,
        started_at: DateTime<Utc>,
    ) -> io::Result<()> {
        writeln!(self.writer, "{}", "=".repeat(64))?;
        writeln!(self.writer, "Order import started: {}", started_at.to_rfc3339())?;
        writeln!(self.writer, "Source file: {}", source.display())?;
        writeln!(self.writer, "Season: {} ({})", season.name, season.guid)?;
        writeln!(self.writer, "{}", "=".repeat(64))?;
        writeln!(self.writer)?;
        Ok(())
    }

    /// One block per processed row: marker, line number, then the
    /// identifying fields that explain the outcome.
    pub fn row_block(
        &mut self,
        marker: RowMarker,
        line: usize,
        fields: &[(&str, String)],
    ) -> io::Result<()> {
        writeln!(self.writer, "{} line {}", marker.as_str(), line)?;
        for (key, value) in fields {
            writeln!(self.writer, "  {}: {}", key, value)?;
        }
        writeln!(self.writer)?;
        Ok(())
    }

    pub fn write_summary(&mut self, stats: &ImportRunStats) -> io::Result<()> {
        writeln!(self.writer, "{}", "=".repeat(64))?;
        writeln!(self.writer, "Import summary")?;
        writeln!(self.writer, "  Total items:            {}", stats.total_items)?;
        writeln!(self.writer, "  Adjustments:            {}", stats.skipped_adjustment)?;
        writeln!(self.writer, "    applied:              {}", stats.adjustments_applied)?;
        writeln!(self.writer, "    failed:               {}", stats.adjustments_failed)?;
        writeln!(self.writer, "  No product match:       {}", stats.skipped_no_product_match)?;
        writeln!(self.writer, "  Users created:          {}", stats.users_created)?;
        writeln!(self.writer, "  Memberships created:    {}", stats.memberships_created)?;
        writeln!(self.writer, "  Memberships updated:    {}", stats.memberships_updated)?;
        writeln!(self.writer, "  Couple memberships:     {}", stats.couple_memberships)?;
        writeln!(self.writer, "  Warnings:               {}", stats.warnings.len())?;

        if !stats.warnings.is_empty() {
            writeln!(self.writer)?;
            writeln!(self.writer, "Warnings:")?;
            for warning in &stats.warnings {
                writeln!(self.writer, "  - {}", warning)?;
            }
        }

        let unmatched = stats.unmatched_products();
        if !unmatched.is_empty() {
            writeln!(self.writer)?;
            writeln!(self.writer, "Unmatched products:")?;
            for item in unmatched {
                writeln!(
                    self.writer,
                    "  - {} ({}) x{} [orders: {}]",
                    item.item_name,
                    format_cents(item.price_cents),
                    item.count,
                    item.sample_order_ids.join(", ")
                )?;
            }
        }

        writeln!(self.writer, "{}", "=".repeat(64))?;
        Ok(())
    }

    /// Flush and close, returning the log path for the report.
    pub fn finish(mut self) -> io::Result<PathBuf> {
        self.writer.flush()?;
        Ok(self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use uuid::Uuid;

    #[test]
    fn log_contains_header_rows_and_summary() {
        let dir = tempfile::tempdir().unwrap();
        let started_at = Utc::now();
        let season = Season {
            guid: Uuid::new_v4(),
            name: "2025-2026".to_string(),
            slug: "2025-2026".to_string(),
            start_date: NaiveDate::from_ymd_opt(2025, 9, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 4, 30).unwrap(),
            is_current: true,
        };

        let mut log = AuditLog::create(dir.path(), started_at).unwrap();
        log.write_header(Path::new("orders.csv"), &season, started_at)
            .unwrap();
        log.row_block(
            RowMarker::Success,
            2,
            &[("order", "12345".to_string()), ("item", "Membership".to_string())],
        )
        .unwrap();

        let mut stats = ImportRunStats::default();
        stats.total_items = 1;
        stats.record_unmatched("Mystery Item", 12300, "77");
        log.write_summary(&stats).unwrap();
        let path = log.finish().unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("Order import started"));
        assert!(content.contains("Season: 2025-2026"));
        assert!(content.contains("[SUCCESS] line 2"));
        assert!(content.contains("order: 12345"));
        assert!(content.contains("Total items:            1"));
        assert!(content.contains("Mystery Item ($123.00) x1 [orders: 77]"));
    }
}
