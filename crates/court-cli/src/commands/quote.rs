//! Session pricing without side effects.

use std::io::Write;

use anyhow::Result;
use court_core::{AccountId, Allocation};
use court_db::Database;

/// Writes an allocation as a per-member breakdown.
pub fn format_allocation<W: Write>(writer: &mut W, allocation: &Allocation) -> Result<()> {
    let summary = &allocation.summary;
    writeln!(
        writer,
        "{}h session: {} standard, {} reduced-rate",
        summary.duration_hours, summary.count_standard, summary.count_reduced
    )?;
    writeln!(
        writer,
        "Rates per hour: standard {:.2}, reduced-rate {:.2}",
        summary.rate_per_hour_standard, summary.rate_per_hour_reduced
    )?;
    writeln!(writer, "Total per hour: {:.2}", summary.total_per_hour)?;
    writeln!(writer, "Grand total: {:.2}", summary.grand_total)?;
    for share in &allocation.members {
        writeln!(
            writer,
            "- account {}: {:.2}/h, owes {:.2}",
            share.account_id, share.rate_per_hour, share.amount_owed
        )?;
    }
    Ok(())
}

pub fn run<W: Write>(
    writer: &mut W,
    db: &Database,
    roster: &[AccountId],
    hours: u32,
    json: bool,
) -> Result<()> {
    let allocation = db.quote(roster, hours)?;
    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&allocation)?)?;
    } else {
        format_allocation(writer, &allocation)?;
    }
    Ok(())
}
