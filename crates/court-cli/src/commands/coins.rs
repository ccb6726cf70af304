//! Coin ledger commands.

use std::io::Write;

use anyhow::Result;
use chrono::NaiveDateTime;
use court_core::{AccountId, CreditKind, EntryId, GrantDecision, LedgerEntry};
use court_db::Database;

use crate::cli::Decision;

pub fn balance<W: Write>(writer: &mut W, db: &Database, account_id: AccountId) -> Result<()> {
    writeln!(writer, "Account {account_id}: {} coins", db.balance(account_id)?)?;
    Ok(())
}

/// Writes ledger entries oldest first.
pub fn format_history<W: Write>(writer: &mut W, entries: &[LedgerEntry]) -> Result<()> {
    if entries.is_empty() {
        writeln!(writer, "No ledger entries.")?;
        return Ok(());
    }
    writeln!(
        writer,
        "{:<4}  {:<19}  {:<9}  {:>6}  {:<8}  Reason",
        "ID", "When", "Kind", "Coins", "Status"
    )?;
    for entry in entries {
        let booking = entry
            .booking_id
            .map(|id| format!(" (booking #{id})"))
            .unwrap_or_default();
        writeln!(
            writer,
            "{:<4}  {:<19}  {:<9}  {:>6}  {:<8}  {}{}",
            entry.id,
            entry.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            entry.kind.as_str(),
            entry.amount,
            entry.status.as_str(),
            entry.reason,
            booking
        )?;
    }
    Ok(())
}

pub fn history<W: Write>(
    writer: &mut W,
    db: &Database,
    account_id: AccountId,
    json: bool,
) -> Result<()> {
    let entries = db.history(account_id)?;
    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&entries)?)?;
    } else {
        format_history(writer, &entries)?;
    }
    Ok(())
}

pub fn request<W: Write>(
    writer: &mut W,
    db: &mut Database,
    account_id: AccountId,
    amount: i64,
    reason: &str,
    now: NaiveDateTime,
) -> Result<()> {
    let entry = db.request_grant_at(account_id, amount, reason, now)?;
    writeln!(
        writer,
        "Request #{} for {} coins is pending approval",
        entry.id, entry.amount
    )?;
    Ok(())
}

pub fn resolve<W: Write>(
    writer: &mut W,
    db: &mut Database,
    entry_id: EntryId,
    decision: Decision,
    now: NaiveDateTime,
) -> Result<()> {
    let decision = match decision {
        Decision::Approve => GrantDecision::Approve,
        Decision::Reject => GrantDecision::Reject,
    };
    let entry = db.resolve_grant_at(entry_id, decision, now)?;
    writeln!(
        writer,
        "Request #{} {}; account {} has {} coins",
        entry.id,
        entry.status,
        entry.account_id,
        db.balance(entry.account_id)?
    )?;
    Ok(())
}

pub fn grant<W: Write>(
    writer: &mut W,
    db: &mut Database,
    account_id: AccountId,
    amount: i64,
    reason: &str,
    now: NaiveDateTime,
) -> Result<()> {
    db.credit_at(account_id, amount, CreditKind::Granted, reason, None, now)?;
    writeln!(
        writer,
        "Granted {amount} coins to account {account_id}; balance {}",
        db.balance(account_id)?
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use court_core::MembershipClass;
    use court_db::NewAccount;
    use insta::assert_snapshot;

    fn now() -> NaiveDateTime {
        "2026-03-01T08:00:00".parse().unwrap()
    }

    fn setup() -> (Database, AccountId) {
        let mut db = Database::open_in_memory().unwrap();
        let id = db
            .create_account_at(&NewAccount::member("Ana", MembershipClass::Standard), now())
            .unwrap()
            .id;
        (db, id)
    }

    #[test]
    fn test_request_and_approve() {
        let (mut db, id) = setup();
        let mut out = Vec::new();
        request(&mut out, &mut db, id, 25, "league win", now()).unwrap();
        resolve(&mut out, &mut db, EntryId::new(1), Decision::Approve, now()).unwrap();
        grant(&mut out, &mut db, id, 5, "bonus", now()).unwrap();
        balance(&mut out, &db, id).unwrap();
        assert_snapshot!(String::from_utf8(out).unwrap(), @r"
        Request #1 for 25 coins is pending approval
        Request #1 approved; account 1 has 25 coins
        Granted 5 coins to account 1; balance 30
        Account 1: 30 coins
        ");

        let mut out = Vec::new();
        history(&mut out, &db, id, false).unwrap();
        assert_snapshot!(String::from_utf8(out).unwrap(), @r"
        ID    When                 Kind        Coins  Status    Reason
        1     2026-03-01 08:00:00  requested      25  approved  league win
        2     2026-03-01 08:00:00  granted        25  approved  grant #1: league win
        3     2026-03-01 08:00:00  granted         5  approved  bonus
        ");
    }

    #[test]
    fn test_rejected_request_cannot_be_reopened() {
        let (mut db, id) = setup();
        request(&mut Vec::new(), &mut db, id, 25, "please", now()).unwrap();

        let mut out = Vec::new();
        resolve(&mut out, &mut db, EntryId::new(1), Decision::Reject, now()).unwrap();
        assert_snapshot!(String::from_utf8(out).unwrap(), @"Request #1 rejected; account 1 has 0 coins");

        let err = resolve(&mut Vec::new(), &mut db, EntryId::new(1), Decision::Approve, now())
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "cannot move ledger entry from requested rejected to approved"
        );
    }

    #[test]
    fn test_empty_history() {
        let (db, id) = setup();
        let mut out = Vec::new();
        history(&mut out, &db, id, false).unwrap();
        assert_snapshot!(String::from_utf8(out).unwrap(), @"No ledger entries.");
    }
}
