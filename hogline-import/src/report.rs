//! Operator report rendering
//!
//! Prints the post-run summary to stdout: counters, warnings, and the
//! unmatched-products breakdown that tells the operator which upstream
//! catalog items still need a mapping or a new product.

use crate::import::stats::ImportRunStats;
use hogline_common::money::format_cents;

pub fn print_report(stats: &ImportRunStats) {
    println!();
    println!("Import complete");
    println!("  Total items processed:   {}", stats.total_items);
    println!(
        "  Adjustments:             {} ({} applied, {} failed)",
        stats.skipped_adjustment, stats.adjustments_applied, stats.adjustments_failed
    );
    println!("  No product match:        {}", stats.skipped_no_product_match);
    println!("  Users created:           {}", stats.users_created);
    println!("  Memberships created:     {}", stats.memberships_created);
    println!("  Memberships updated:     {}", stats.memberships_updated);
    println!("  Couple memberships:      {}", stats.couple_memberships);

    if !stats.warnings.is_empty() {
        println!();
        println!("Warnings ({}):", stats.warnings.len());
        for warning in &stats.warnings {
            println!("  - {}", warning);
        }
    }

    let unmatched = stats.unmatched_products();
    if !unmatched.is_empty() {
        println!();
        println!("Unmatched products ({}):", unmatched.len());
        for item in unmatched {
            println!(
                "  - {} ({}) x{}  orders: {}",
                item.item_name,
                format_cents(item.price_cents),
                item.count,
                item.sample_order_ids.join(", ")
            );
        }
        println!();
        println!("Add a product or a mapping entry for each item above, then re-run.");
    }

    println!();
    println!("Audit log: {}", stats.log_path.display());
}
