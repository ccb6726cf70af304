//! Cash settlement commands: booking settlement, open play, and dues.

use std::io::Write;

use anyhow::Result;
use chrono::NaiveDateTime;
use court_core::{AccountId, BookingId, OpenPlaySession, PaymentRecord};
use court_db::{Database, Due};
use rust_decimal::Decimal;

fn write_record<W: Write>(writer: &mut W, record: &PaymentRecord) -> Result<()> {
    writeln!(
        writer,
        "Payment #{} recorded: {:.2} at {:.2}/h ({}), {}",
        record.id, record.amount, record.rate_applied, record.membership_class, record.status
    )?;
    Ok(())
}

pub fn run<W: Write>(
    writer: &mut W,
    db: &mut Database,
    booking_id: BookingId,
    payer: AccountId,
    amount: Decimal,
    notes: Option<&str>,
    now: NaiveDateTime,
) -> Result<()> {
    let record = db.settle_payment_at(booking_id, payer, amount, notes, now)?;
    write_record(writer, &record)?;
    writeln!(writer, "An admin will confirm the payment.")?;
    Ok(())
}

pub fn open_play<W: Write>(
    writer: &mut W,
    db: &mut Database,
    payer: AccountId,
    session: &OpenPlaySession,
    amount: Decimal,
    notes: Option<&str>,
    now: NaiveDateTime,
) -> Result<()> {
    let record = db.settle_open_play_at(payer, session, amount, notes, now)?;
    write_record(writer, &record)?;
    if !session.attendees.is_empty() {
        writeln!(writer, "Attendees: {}", session.attendees.join(", "))?;
    }
    Ok(())
}

/// Writes dues as a table with a closing total.
pub fn format_dues<W: Write>(writer: &mut W, dues: &[Due]) -> Result<()> {
    if dues.is_empty() {
        writeln!(writer, "Nothing owed.")?;
        return Ok(());
    }
    writeln!(
        writer,
        "{:<8}  {:<10}  {:<11}  {:>8}  {:>8}",
        "Booking", "Date", "Time", "Owed", "Session"
    )?;
    for due in dues {
        writeln!(
            writer,
            "{:<8}  {:<10}  {:<11}  {:>8.2}  {:>8.2}",
            format!("#{}", due.booking_id),
            due.date.to_string(),
            due.range.to_string(),
            due.amount_owed,
            due.grand_total
        )?;
    }
    let total: Decimal = dues.iter().map(|due| due.amount_owed).sum();
    writeln!(writer, "Total owed: {total:.2}")?;
    Ok(())
}

pub fn dues<W: Write>(
    writer: &mut W,
    db: &Database,
    account_id: AccountId,
    json: bool,
    now: NaiveDateTime,
) -> Result<()> {
    let dues = db.dues_at(account_id, now)?;
    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&dues)?)?;
    } else {
        format_dues(writer, &dues)?;
    }
    Ok(())
}
