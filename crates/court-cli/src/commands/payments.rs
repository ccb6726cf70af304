//! Payment record commands for admins.

use std::io::Write;

use anyhow::Result;
use chrono::NaiveDateTime;
use court_core::{AccountId, PaymentDecision, PaymentId, PaymentRecord, PaymentTarget};
use court_db::Database;

use crate::cli::Outcome;

fn target_label(record: &PaymentRecord) -> String {
    match &record.target {
        PaymentTarget::Booking { booking_id } => format!("booking #{booking_id}"),
        PaymentTarget::OpenPlay(session) => format!("open play {} {}", session.date, session.label),
    }
}

/// Writes payment records as a table.
pub fn format_payments<W: Write>(writer: &mut W, records: &[PaymentRecord]) -> Result<()> {
    if records.is_empty() {
        writeln!(writer, "No payment records.")?;
        return Ok(());
    }
    writeln!(
        writer,
        "{:<4}  {:<7}  {:>8}  {:<8}  For",
        "ID", "Account", "Amount", "Status"
    )?;
    for record in records {
        writeln!(
            writer,
            "{:<4}  {:<7}  {:>8.2}  {:<8}  {}",
            record.id,
            record.account_id,
            record.amount,
            record.status.as_str(),
            target_label(record)
        )?;
    }
    Ok(())
}

pub fn list<W: Write>(
    writer: &mut W,
    db: &Database,
    account: Option<AccountId>,
    json: bool,
) -> Result<()> {
    let records = match account {
        Some(account_id) => db.payments_for_account(account_id)?,
        None => db.pending_payments()?,
    };
    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&records)?)?;
    } else {
        format_payments(writer, &records)?;
    }
    Ok(())
}

pub fn resolve<W: Write>(
    writer: &mut W,
    db: &mut Database,
    payment_id: PaymentId,
    outcome: Outcome,
    now: NaiveDateTime,
) -> Result<()> {
    let decision = match outcome {
        Outcome::Paid => PaymentDecision::Paid,
        Outcome::Rejected => PaymentDecision::Rejected,
    };
    let record = db.resolve_payment_at(payment_id, decision, now)?;
    writeln!(
        writer,
        "Payment #{} for {} marked {}",
        record.id,
        target_label(&record),
        record.status
    )?;
    if let Some(booking_id) = record.booking_id() {
        let booking = db.booking(booking_id)?;
        writeln!(
            writer,
            "Booking #{} payment status: {}",
            booking.id,
            booking.payment_status.as_str()
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use court_core::{BookingId, BookingRequest, MembershipClass, OpenPlaySession, SlotRange};
    use court_db::NewAccount;
    use insta::assert_snapshot;
    use rust_decimal_macros::dec;

    fn at(s: &str) -> NaiveDateTime {
        s.parse().unwrap()
    }

    fn setup() -> Database {
        let mut db = Database::open_in_memory().unwrap();
        let mut ana = NewAccount::member("Ana", MembershipClass::Standard);
        ana.opening_balance = 50;
        let ana = db.create_account(&ana).unwrap().actor();
        db.create_booking_at(
            &ana,
            &BookingRequest {
                date: "2026-03-02".parse().unwrap(),
                range: SlotRange::parse("09:00", "10:00").unwrap(),
                roster: vec![ana.account_id],
                notes: None,
            },
            at("2026-03-01T08:00:00"),
        )
        .unwrap();
        db.settle_payment_at(BookingId::new(1), ana.account_id, dec!(100), None, at("2026-03-02T11:00:00"))
            .unwrap();
        db.settle_open_play_at(
            ana.account_id,
            &OpenPlaySession {
                date: "2026-03-01".parse().unwrap(),
                label: "sunday-am".to_string(),
                hours: 2,
                attendees: Vec::new(),
            },
            dec!(200),
            None,
            at("2026-03-02T11:00:00"),
        )
        .unwrap();
        db
    }

    #[test]
    fn test_list_pending_then_resolve() {
        let mut db = setup();
        let mut out = Vec::new();
        list(&mut out, &db, None, false).unwrap();
        assert_snapshot!(String::from_utf8(out).unwrap(), @r"
        ID    Account    Amount  Status    For
        1     1          100.00  pending   booking #1
        2     1          200.00  pending   open play 2026-03-01 sunday-am
        ");

        let mut out = Vec::new();
        resolve(&mut out, &mut db, PaymentId::new(1), Outcome::Paid, at("2026-03-03T09:00:00"))
            .unwrap();
        resolve(&mut out, &mut db, PaymentId::new(2), Outcome::Rejected, at("2026-03-03T09:00:00"))
            .unwrap();
        assert_snapshot!(String::from_utf8(out).unwrap(), @r"
        Payment #1 for booking #1 marked paid
        Booking #1 payment status: paid
        Payment #2 for open play 2026-03-01 sunday-am marked rejected
        ");

        let mut out = Vec::new();
        list(&mut out, &db, None, false).unwrap();
        assert_snapshot!(String::from_utf8(out).unwrap(), @"No payment records.");

        let mut out = Vec::new();
        list(&mut out, &db, Some(AccountId::new(1)), false).unwrap();
        assert_snapshot!(String::from_utf8(out).unwrap(), @r"
        ID    Account    Amount  Status    For
        1     1          100.00  paid      booking #1
        2     1          200.00  rejected  open play 2026-03-01 sunday-am
        ");
    }
}
