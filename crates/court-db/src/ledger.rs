//! Coin balances and the append-only ledger.

use chrono::{Local, NaiveDateTime};
use court_core::ledger::{check_amount, check_debit, derived_balance};
use court_core::{
    AccountId, BookingId, CreditKind, EngineError, EntryId, EntryStatus, GrantDecision,
    LedgerEntry, LedgerKind, LifecycleEvent,
};
use rusqlite::{Connection, OptionalExtension, params};

use crate::{Database, DbError, format_timestamp, parse_column};

struct NewEntry<'a> {
    account_id: AccountId,
    kind: LedgerKind,
    amount: i64,
    status: EntryStatus,
    reason: &'a str,
    booking_id: Option<BookingId>,
}

#[derive(Debug)]
struct EntryRow {
    id: i64,
    account_id: i64,
    kind: String,
    amount: i64,
    status: String,
    reason: String,
    booking_id: Option<i64>,
    created_at: String,
}

impl EntryRow {
    fn into_entry(self) -> Result<LedgerEntry, DbError> {
        Ok(LedgerEntry {
            id: EntryId::new(self.id),
            account_id: AccountId::new(self.account_id),
            kind: parse_column(&self.kind, "ledger_entries", self.id)?,
            amount: self.amount,
            status: parse_column(&self.status, "ledger_entries", self.id)?,
            reason: self.reason,
            booking_id: self.booking_id.map(BookingId::new),
            created_at: parse_column(&self.created_at, "ledger_entries", self.id)?,
        })
    }
}

const ENTRY_COLUMNS: &str = "id, account_id, kind, amount, status, reason, booking_id, created_at";

fn read_entry_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<EntryRow> {
    Ok(EntryRow {
        id: row.get(0)?,
        account_id: row.get(1)?,
        kind: row.get(2)?,
        amount: row.get(3)?,
        status: row.get(4)?,
        reason: row.get(5)?,
        booking_id: row.get(6)?,
        created_at: row.get(7)?,
    })
}

fn load_entry(conn: &Connection, id: EntryId) -> Result<LedgerEntry, DbError> {
    conn.query_row(
        &format!("SELECT {ENTRY_COLUMNS} FROM ledger_entries WHERE id = ?"),
        [id.get()],
        read_entry_row,
    )
    .optional()?
    .ok_or(EngineError::NotFound {
        entity: "ledger entry",
        id: id.get(),
    })?
    .into_entry()
}

fn insert_entry(
    conn: &Connection,
    entry: &NewEntry<'_>,
    now: NaiveDateTime,
) -> Result<LedgerEntry, DbError> {
    conn.execute(
        "
        INSERT INTO ledger_entries (account_id, kind, amount, status, reason, booking_id, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        ",
        params![
            entry.account_id.get(),
            entry.kind.as_str(),
            entry.amount,
            entry.status.as_str(),
            entry.reason,
            entry.booking_id.map(BookingId::get),
            format_timestamp(now),
        ],
    )?;
    load_entry(conn, EntryId::new(conn.last_insert_rowid()))
}

fn stored_balance(conn: &Connection, account_id: AccountId) -> Result<i64, DbError> {
    let balance: Option<i64> = conn
        .query_row(
            "SELECT balance FROM accounts WHERE id = ?",
            [account_id.get()],
            |row| row.get(0),
        )
        .optional()?;
    Ok(balance.ok_or(EngineError::NotFound {
        entity: "account",
        id: account_id.get(),
    })?)
}

/// Debits an account and appends the matching `spent` entry.
///
/// Exempt accounts are charged nothing but still get a zero-amount entry.
pub(crate) fn append_debit(
    conn: &Connection,
    account_id: AccountId,
    amount: i64,
    exempt: bool,
    reason: &str,
    booking_id: Option<BookingId>,
    now: NaiveDateTime,
) -> Result<LedgerEntry, DbError> {
    let balance = stored_balance(conn, account_id)?;
    let charged = check_debit(balance, amount, exempt)?;
    conn.execute(
        "UPDATE accounts SET balance = balance - ? WHERE id = ?",
        params![charged, account_id.get()],
    )?;
    insert_entry(
        conn,
        &NewEntry {
            account_id,
            kind: LedgerKind::Spent,
            amount: charged,
            status: EntryStatus::Approved,
            reason,
            booking_id,
        },
        now,
    )
}

/// Credits an account and appends the matching entry.
pub(crate) fn append_credit(
    conn: &Connection,
    account_id: AccountId,
    amount: i64,
    kind: CreditKind,
    reason: &str,
    booking_id: Option<BookingId>,
    now: NaiveDateTime,
) -> Result<LedgerEntry, DbError> {
    check_amount(amount)?;
    stored_balance(conn, account_id)?;
    conn.execute(
        "UPDATE accounts SET balance = balance + ? WHERE id = ?",
        params![amount, account_id.get()],
    )?;
    insert_entry(
        conn,
        &NewEntry {
            account_id,
            kind: kind.into(),
            amount,
            status: EntryStatus::Approved,
            reason,
            booking_id,
        },
        now,
    )
}

impl Database {
    /// Current coin balance.
    pub fn balance(&self, account_id: AccountId) -> Result<i64, DbError> {
        stored_balance(&self.conn, account_id)
    }

    /// Lists an account's ledger entries, oldest first.
    pub fn history(&self, account_id: AccountId) -> Result<Vec<LedgerEntry>, DbError> {
        stored_balance(&self.conn, account_id)?;
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ENTRY_COLUMNS} FROM ledger_entries WHERE account_id = ? ORDER BY id ASC"
        ))?;
        let rows = stmt.query_map([account_id.get()], read_entry_row)?;
        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?.into_entry()?);
        }
        Ok(entries)
    }

    /// Balance recomputed from approved entries.
    pub fn ledger_balance(&self, account_id: AccountId) -> Result<i64, DbError> {
        Ok(derived_balance(&self.history(account_id)?))
    }

    /// Grant requests awaiting an admin decision, oldest first.
    pub fn pending_grant_requests(&self) -> Result<Vec<LedgerEntry>, DbError> {
        let mut stmt = self.conn.prepare(&format!(
            "
            SELECT {ENTRY_COLUMNS} FROM ledger_entries
            WHERE kind = 'requested' AND status = 'pending'
            ORDER BY id ASC
            "
        ))?;
        let rows = stmt.query_map([], read_entry_row)?;
        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?.into_entry()?);
        }
        Ok(entries)
    }

    /// Removes coins from an account.
    pub fn debit(
        &mut self,
        account_id: AccountId,
        amount: i64,
        reason: &str,
        booking_id: Option<BookingId>,
    ) -> Result<LedgerEntry, DbError> {
        self.debit_at(account_id, amount, reason, booking_id, Local::now().naive_local())
    }

    pub fn debit_at(
        &mut self,
        account_id: AccountId,
        amount: i64,
        reason: &str,
        booking_id: Option<BookingId>,
        now: NaiveDateTime,
    ) -> Result<LedgerEntry, DbError> {
        let entry = self.write(|tx, _| {
            let exempt: bool = tx
                .query_row(
                    "SELECT exempt FROM accounts WHERE id = ?",
                    [account_id.get()],
                    |row| row.get(0),
                )
                .optional()?
                .unwrap_or(false);
            append_debit(tx, account_id, amount, exempt, reason, booking_id, now)
        })?;
        tracing::info!(account_id = %account_id, amount = entry.amount, reason, "coins debited");
        Ok(entry)
    }

    /// Adds coins to an account.
    pub fn credit(
        &mut self,
        account_id: AccountId,
        amount: i64,
        kind: CreditKind,
        reason: &str,
        booking_id: Option<BookingId>,
    ) -> Result<LedgerEntry, DbError> {
        self.credit_at(account_id, amount, kind, reason, booking_id, Local::now().naive_local())
    }

    pub fn credit_at(
        &mut self,
        account_id: AccountId,
        amount: i64,
        kind: CreditKind,
        reason: &str,
        booking_id: Option<BookingId>,
        now: NaiveDateTime,
    ) -> Result<LedgerEntry, DbError> {
        let entry = self
            .write(|tx, _| append_credit(tx, account_id, amount, kind, reason, booking_id, now))?;
        tracing::info!(account_id = %account_id, amount, reason, "coins credited");
        Ok(entry)
    }

    /// Records a pending request for coins without touching the balance.
    pub fn request_grant(
        &mut self,
        account_id: AccountId,
        amount: i64,
        reason: &str,
    ) -> Result<LedgerEntry, DbError> {
        self.request_grant_at(account_id, amount, reason, Local::now().naive_local())
    }

    pub fn request_grant_at(
        &mut self,
        account_id: AccountId,
        amount: i64,
        reason: &str,
        now: NaiveDateTime,
    ) -> Result<LedgerEntry, DbError> {
        check_amount(amount)?;
        let entry = self.write(|tx, _| {
            stored_balance(tx, account_id)?;
            insert_entry(
                tx,
                &NewEntry {
                    account_id,
                    kind: LedgerKind::Requested,
                    amount,
                    status: EntryStatus::Pending,
                    reason,
                    booking_id: None,
                },
                now,
            )
        })?;
        tracing::info!(entry_id = %entry.id, account_id = %account_id, amount, "grant requested");
        Ok(entry)
    }

    /// Approves or rejects a pending grant request.
    ///
    /// Approval appends a `granted` credit; the request itself never moves
    /// the balance.
    pub fn resolve_grant(
        &mut self,
        entry_id: EntryId,
        decision: GrantDecision,
    ) -> Result<LedgerEntry, DbError> {
        self.resolve_grant_at(entry_id, decision, Local::now().naive_local())
    }

    pub fn resolve_grant_at(
        &mut self,
        entry_id: EntryId,
        decision: GrantDecision,
        now: NaiveDateTime,
    ) -> Result<LedgerEntry, DbError> {
        let resolved = self.write(|tx, _| {
            let request = load_entry(tx, entry_id)?;
            request.check_resolvable(decision)?;
            tx.execute(
                "UPDATE ledger_entries SET status = ?, resolved_at = ? WHERE id = ? AND status = 'pending'",
                params![
                    decision.target_status().as_str(),
                    format_timestamp(now),
                    entry_id.get()
                ],
            )?;
            if decision == GrantDecision::Approve {
                let reason = format!("grant #{}: {}", request.id, request.reason);
                append_credit(
                    tx,
                    request.account_id,
                    request.amount,
                    CreditKind::Granted,
                    &reason,
                    None,
                    now,
                )?;
            }
            load_entry(tx, entry_id)
        })?;

        tracing::info!(entry_id = %entry_id, status = %resolved.status, "grant request resolved");
        if decision == GrantDecision::Approve {
            self.publish(&LifecycleEvent::GrantApproved {
                entry_id,
                account_id: resolved.account_id,
                amount: resolved.amount,
            });
        }
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use court_core::{MembershipClass, RecordingSink};

    use crate::NewAccount;

    fn at(s: &str) -> NaiveDateTime {
        s.parse().unwrap()
    }

    fn account(db: &mut Database, balance: i64, exempt: bool) -> AccountId {
        let mut new = NewAccount::member("Ledger", MembershipClass::Standard);
        new.opening_balance = balance;
        new.exempt = exempt;
        db.create_account(&new).unwrap().id
    }

    #[test]
    fn test_debit_and_credit_move_balance_with_entries() {
        let mut db = Database::open_in_memory().unwrap();
        let id = account(&mut db, 30, false);
        let now = at("2026-02-01T10:00:00");

        db.debit_at(id, 20, "court booking", None, now).unwrap();
        assert_eq!(db.balance(id).unwrap(), 10);

        db.credit_at(id, 5, CreditKind::Earned, "refund", None, now)
            .unwrap();
        assert_eq!(db.balance(id).unwrap(), 15);
        assert_eq!(db.ledger_balance(id).unwrap(), 15);

        let kinds: Vec<LedgerKind> = db.history(id).unwrap().iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![LedgerKind::Granted, LedgerKind::Spent, LedgerKind::Earned]
        );
    }

    #[test]
    fn test_debit_never_goes_negative() {
        let mut db = Database::open_in_memory().unwrap();
        let id = account(&mut db, 5, false);

        let err = db.debit(id, 10, "court booking", None).unwrap_err();
        assert_eq!(
            err.engine(),
            Some(&EngineError::InsufficientBalance {
                balance: 5,
                required: 10
            })
        );
        assert_eq!(db.balance(id).unwrap(), 5);
        assert_eq!(db.history(id).unwrap().len(), 1);
    }

    #[test]
    fn test_exempt_debit_records_zero_entry() {
        let mut db = Database::open_in_memory().unwrap();
        let id = account(&mut db, 0, true);

        let entry = db.debit(id, 40, "court booking", None).unwrap();
        assert_eq!(entry.amount, 0);
        assert_eq!(entry.kind, LedgerKind::Spent);
        assert_eq!(db.balance(id).unwrap(), 0);
    }

    #[test]
    fn test_grant_request_resolves_once() {
        let sink = Arc::new(RecordingSink::default());
        let mut db = Database::open_in_memory().unwrap().with_sink(sink.clone());
        let id = account(&mut db, 0, false);
        let now = at("2026-02-01T10:00:00");

        let request = db.request_grant_at(id, 25, "tournament win", now).unwrap();
        assert_eq!(request.status, EntryStatus::Pending);
        assert_eq!(db.balance(id).unwrap(), 0);
        assert_eq!(db.pending_grant_requests().unwrap().len(), 1);

        let resolved = db
            .resolve_grant_at(request.id, GrantDecision::Approve, now)
            .unwrap();
        assert_eq!(resolved.status, EntryStatus::Approved);
        assert_eq!(db.balance(id).unwrap(), 25);
        assert_eq!(db.ledger_balance(id).unwrap(), 25);
        assert!(db.pending_grant_requests().unwrap().is_empty());

        let err = db
            .resolve_grant_at(request.id, GrantDecision::Reject, now)
            .unwrap_err();
        assert_eq!(err.code(), "invalid_transition");
        assert_eq!(db.balance(id).unwrap(), 25);

        assert_eq!(
            sink.events(),
            vec![LifecycleEvent::GrantApproved {
                entry_id: request.id,
                account_id: id,
                amount: 25,
            }]
        );
    }

    #[test]
    fn test_rejected_request_leaves_balance() {
        let mut db = Database::open_in_memory().unwrap();
        let id = account(&mut db, 10, false);

        let request = db.request_grant(id, 25, "please").unwrap();
        let resolved = db.resolve_grant(request.id, GrantDecision::Reject).unwrap();
        assert_eq!(resolved.status, EntryStatus::Rejected);
        assert_eq!(db.balance(id).unwrap(), 10);
        assert_eq!(db.ledger_balance(id).unwrap(), 10);
    }

    #[test]
    fn test_only_requests_can_be_resolved() {
        let mut db = Database::open_in_memory().unwrap();
        let id = account(&mut db, 10, false);
        let spent = db.debit(id, 3, "misc", None).unwrap();

        let err = db.resolve_grant(spent.id, GrantDecision::Approve).unwrap_err();
        assert_eq!(err.code(), "invalid_transition");
        assert_eq!(
            db.resolve_grant(EntryId::new(999), GrantDecision::Approve)
                .unwrap_err()
                .code(),
            "not_found"
        );
    }

    #[test]
    fn test_negative_amounts_are_rejected() {
        let mut db = Database::open_in_memory().unwrap();
        let id = account(&mut db, 10, false);
        assert_eq!(
            db.credit(id, -4, CreditKind::Granted, "oops", None)
                .unwrap_err()
                .code(),
            "invalid_amount"
        );
        assert_eq!(
            db.request_grant(id, -4, "oops").unwrap_err().code(),
            "invalid_amount"
        );
    }
}
