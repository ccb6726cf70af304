//! Cash settlement records, dues, and quotes.

use chrono::{Local, NaiveDate, NaiveDateTime};
use court_core::booking::normalize_roster;
use court_core::payment::check_claimed_amount;
use court_core::{
    AccountId, Allocation, BookingId, EngineError, OpenPlaySession, PaymentDecision, PaymentId,
    PaymentRecord, PaymentRecordStatus, PaymentTarget, RosterMember, SlotRange, allocate,
};
use rust_decimal::Decimal;
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;

use crate::accounts::{load_account, roster_members};
use crate::bookings::{bookings_with_member, load_booking};
use crate::{Database, DbError, format_date, format_timestamp, on_constraint, parse_column};

/// An unpaid share of a finished booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Due {
    pub booking_id: BookingId,
    pub date: NaiveDate,
    pub range: SlotRange,
    pub amount_owed: Decimal,
    pub grand_total: Decimal,
}

#[derive(Debug)]
struct PaymentRow {
    id: i64,
    account_id: i64,
    booking_id: Option<i64>,
    session_date: Option<String>,
    session_label: Option<String>,
    attendees: String,
    hours: i64,
    amount: String,
    status: String,
    membership_class: String,
    rate_applied: String,
    notes: Option<String>,
    created_at: String,
}

const PAYMENT_COLUMNS: &str = "id, account_id, booking_id, session_date, session_label, attendees, \
     hours, amount, status, membership_class, rate_applied, notes, created_at";

fn read_payment_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<PaymentRow> {
    Ok(PaymentRow {
        id: row.get(0)?,
        account_id: row.get(1)?,
        booking_id: row.get(2)?,
        session_date: row.get(3)?,
        session_label: row.get(4)?,
        attendees: row.get(5)?,
        hours: row.get(6)?,
        amount: row.get(7)?,
        status: row.get(8)?,
        membership_class: row.get(9)?,
        rate_applied: row.get(10)?,
        notes: row.get(11)?,
        created_at: row.get(12)?,
    })
}

impl PaymentRow {
    fn invalid(&self, message: impl Into<String>) -> DbError {
        DbError::InvalidRow {
            table: "payments",
            id: self.id,
            message: message.into(),
        }
    }

    fn target(&self) -> Result<PaymentTarget, DbError> {
        if let Some(booking_id) = self.booking_id {
            return Ok(PaymentTarget::Booking {
                booking_id: BookingId::new(booking_id),
            });
        }
        let (Some(date), Some(label)) = (&self.session_date, &self.session_label) else {
            return Err(self.invalid("neither booking nor session recorded"));
        };
        let attendees: Vec<String> = serde_json::from_str(&self.attendees)
            .map_err(|err| self.invalid(format!("attendees: {err}")))?;
        Ok(PaymentTarget::OpenPlay(OpenPlaySession {
            date: parse_column(date, "payments", self.id)?,
            label: label.clone(),
            hours: self.hours()?,
            attendees,
        }))
    }

    fn hours(&self) -> Result<u32, DbError> {
        u32::try_from(self.hours).map_err(|_| self.invalid(format!("hours {}", self.hours)))
    }

    fn into_record(self) -> Result<PaymentRecord, DbError> {
        Ok(PaymentRecord {
            id: PaymentId::new(self.id),
            account_id: AccountId::new(self.account_id),
            target: self.target()?,
            amount: parse_column(&self.amount, "payments", self.id)?,
            status: parse_column(&self.status, "payments", self.id)?,
            membership_class: parse_column(&self.membership_class, "payments", self.id)?,
            rate_applied: parse_column(&self.rate_applied, "payments", self.id)?,
            hours: self.hours()?,
            created_at: parse_column(&self.created_at, "payments", self.id)?,
            notes: self.notes,
        })
    }
}

fn load_payment(conn: &Connection, id: PaymentId) -> Result<PaymentRecord, DbError> {
    conn.query_row(
        &format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = ?"),
        [id.get()],
        read_payment_row,
    )
    .optional()?
    .ok_or(EngineError::NotFound {
        entity: "payment",
        id: id.get(),
    })?
    .into_record()
}

fn collect_payments(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<PaymentRecord>, DbError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, read_payment_row)?;
    let mut records = Vec::new();
    for row in rows {
        records.push(row?.into_record()?);
    }
    Ok(records)
}

/// Number of payment records the account still has pending.
pub(crate) fn pending_payment_count(
    conn: &Connection,
    account_id: AccountId,
) -> Result<u32, DbError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM payments WHERE account_id = ? AND status = 'pending'",
        [account_id.get()],
        |row| row.get(0),
    )?;
    Ok(u32::try_from(count).unwrap_or(u32::MAX))
}

fn has_booking_payment(
    conn: &Connection,
    account_id: AccountId,
    booking_id: BookingId,
) -> Result<bool, DbError> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT id FROM payments WHERE account_id = ? AND booking_id = ?",
            params![account_id.get(), booking_id.get()],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

struct NewPayment<'a> {
    account_id: AccountId,
    booking_id: Option<BookingId>,
    session: Option<&'a OpenPlaySession>,
    hours: u32,
    amount: Decimal,
    share: &'a court_core::MemberShare,
    notes: Option<&'a str>,
}

fn insert_payment(
    conn: &Connection,
    payment: &NewPayment<'_>,
    now: NaiveDateTime,
) -> Result<PaymentRecord, DbError> {
    let attendees = payment
        .session
        .map(|session| serde_json::to_string(&session.attendees))
        .transpose()
        .map_err(|err| DbError::InvalidRow {
            table: "payments",
            id: 0,
            message: format!("attendees: {err}"),
        })?
        .unwrap_or_else(|| "[]".to_string());

    conn.execute(
        "
        INSERT INTO payments
        (account_id, booking_id, session_date, session_label, attendees, hours, amount, status,
         membership_class, rate_applied, notes, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, 'pending', ?, ?, ?, ?)
        ",
        params![
            payment.account_id.get(),
            payment.booking_id.map(BookingId::get),
            payment.session.map(|s| format_date(s.date)),
            payment.session.map(|s| s.label.as_str()),
            attendees,
            payment.hours,
            payment.amount.to_string(),
            payment.share.membership_class.as_str(),
            payment.share.rate_per_hour.to_string(),
            payment.notes,
            format_timestamp(now),
        ],
    )
    .map_err(|err| on_constraint(err, EngineError::AlreadySettled))?;
    load_payment(conn, PaymentId::new(conn.last_insert_rowid()))
}

/// Marks the booking paid once every roster member has a paid record.
fn refresh_booking_payment(conn: &Connection, booking_id: BookingId) -> Result<bool, DbError> {
    let unpaid: i64 = conn.query_row(
        "
        SELECT COUNT(*) FROM booking_roster r
        WHERE r.booking_id = ?1
          AND NOT EXISTS (
              SELECT 1 FROM payments p
              WHERE p.booking_id = r.booking_id AND p.account_id = r.account_id AND p.status = 'paid'
          )
        ",
        [booking_id.get()],
        |row| row.get(0),
    )?;
    if unpaid > 0 {
        return Ok(false);
    }
    conn.execute(
        "UPDATE bookings SET payment_status = 'paid' WHERE id = ?",
        [booking_id.get()],
    )?;
    Ok(true)
}

impl Database {
    /// Records a participant's claim to have paid for a finished booking.
    ///
    /// The claim must match the booking's recomputed grand total within
    /// the configured epsilon. The record starts out pending.
    pub fn settle_payment(
        &mut self,
        booking_id: BookingId,
        payer: AccountId,
        claimed: Decimal,
        notes: Option<&str>,
    ) -> Result<PaymentRecord, DbError> {
        self.settle_payment_at(booking_id, payer, claimed, notes, Local::now().naive_local())
    }

    pub fn settle_payment_at(
        &mut self,
        booking_id: BookingId,
        payer: AccountId,
        claimed: Decimal,
        notes: Option<&str>,
        now: NaiveDateTime,
    ) -> Result<PaymentRecord, DbError> {
        check_claimed_amount(claimed)?;
        let record = self.write(|tx, policy| {
            let booking = load_booking(tx, booking_id)?;
            booking.check_settle(payer, now)?;
            if has_booking_payment(tx, payer, booking_id)? {
                return Err(EngineError::AlreadySettled.into());
            }

            let members = roster_members(tx, &booking.roster)?;
            let allocation = allocate(&members, booking.duration_hours(), &policy.rates)?;
            allocation.verify_amount(claimed, policy.amount_epsilon)?;
            let share = allocation
                .share_for(payer)
                .ok_or(EngineError::NotInRoster {
                    account: payer.get(),
                    booking: booking_id.get(),
                })?;

            insert_payment(
                tx,
                &NewPayment {
                    account_id: payer,
                    booking_id: Some(booking_id),
                    session: None,
                    hours: booking.duration_hours(),
                    amount: claimed,
                    share,
                    notes,
                },
                now,
            )
        })?;
        tracing::info!(
            payment_id = %record.id,
            booking_id = %booking_id,
            payer = %payer,
            amount = %record.amount,
            "payment settled"
        );
        Ok(record)
    }

    /// Records payment for an open-play session priced for one player.
    pub fn settle_open_play(
        &mut self,
        payer: AccountId,
        session: &OpenPlaySession,
        claimed: Decimal,
        notes: Option<&str>,
    ) -> Result<PaymentRecord, DbError> {
        self.settle_open_play_at(payer, session, claimed, notes, Local::now().naive_local())
    }

    pub fn settle_open_play_at(
        &mut self,
        payer: AccountId,
        session: &OpenPlaySession,
        claimed: Decimal,
        notes: Option<&str>,
        now: NaiveDateTime,
    ) -> Result<PaymentRecord, DbError> {
        check_claimed_amount(claimed)?;
        session.validate(now.date())?;
        let record = self.write(|tx, policy| {
            let account = load_account(tx, payer)?;
            let existing: Option<i64> = tx
                .query_row(
                    "
                    SELECT id FROM payments
                    WHERE account_id = ? AND booking_id IS NULL AND session_date = ? AND session_label = ?
                    ",
                    params![payer.get(), format_date(session.date), session.label],
                    |row| row.get(0),
                )
                .optional()?;
            if existing.is_some() {
                return Err(EngineError::AlreadySettled.into());
            }

            let roster = [RosterMember {
                account_id: payer,
                membership_class: account.membership_class,
            }];
            let allocation = allocate(&roster, session.hours, &policy.rates)?;
            allocation.verify_amount(claimed, policy.amount_epsilon)?;

            insert_payment(
                tx,
                &NewPayment {
                    account_id: payer,
                    booking_id: None,
                    session: Some(session),
                    hours: session.hours,
                    amount: claimed,
                    share: &allocation.members[0],
                    notes,
                },
                now,
            )
        })?;
        tracing::info!(
            payment_id = %record.id,
            payer = %payer,
            date = %session.date,
            label = %session.label,
            attendees = session.attendees.len(),
            "open play settled"
        );
        Ok(record)
    }

    /// Moves a pending payment record to paid or rejected.
    pub fn resolve_payment(
        &mut self,
        payment_id: PaymentId,
        decision: PaymentDecision,
    ) -> Result<PaymentRecord, DbError> {
        self.resolve_payment_at(payment_id, decision, Local::now().naive_local())
    }

    pub fn resolve_payment_at(
        &mut self,
        payment_id: PaymentId,
        decision: PaymentDecision,
        now: NaiveDateTime,
    ) -> Result<PaymentRecord, DbError> {
        let (record, booking_paid) = self.write(|tx, _| {
            let record = load_payment(tx, payment_id)?;
            record.check_resolvable(decision)?;
            let status = PaymentRecordStatus::from(decision);
            tx.execute(
                "UPDATE payments SET status = ?, resolved_at = ? WHERE id = ?",
                params![status.as_str(), format_timestamp(now), payment_id.get()],
            )?;
            let booking_paid = match (status, record.booking_id()) {
                (PaymentRecordStatus::Paid, Some(booking_id)) => {
                    refresh_booking_payment(tx, booking_id)?
                }
                _ => false,
            };
            Ok((load_payment(tx, payment_id)?, booking_paid))
        })?;
        tracing::info!(
            payment_id = %payment_id,
            status = %record.status,
            booking_paid,
            "payment resolved"
        );
        Ok(record)
    }

    pub fn payment(&self, id: PaymentId) -> Result<PaymentRecord, DbError> {
        load_payment(&self.conn, id)
    }

    /// Payment records for one account, oldest first.
    pub fn payments_for_account(&self, account_id: AccountId) -> Result<Vec<PaymentRecord>, DbError> {
        collect_payments(
            &self.conn,
            &format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE account_id = ? ORDER BY id ASC"),
            [account_id.get()],
        )
    }

    /// Records awaiting an admin decision, oldest first.
    pub fn pending_payments(&self) -> Result<Vec<PaymentRecord>, DbError> {
        collect_payments(
            &self.conn,
            &format!(
                "SELECT {PAYMENT_COLUMNS} FROM payments WHERE status = 'pending' ORDER BY id ASC"
            ),
            [],
        )
    }

    /// Finished bookings the account played in but has not settled.
    pub fn dues(&self, account_id: AccountId) -> Result<Vec<Due>, DbError> {
        self.dues_at(account_id, Local::now().naive_local())
    }

    pub fn dues_at(&self, account_id: AccountId, now: NaiveDateTime) -> Result<Vec<Due>, DbError> {
        load_account(&self.conn, account_id)?;
        let mut dues = Vec::new();
        for booking in bookings_with_member(&self.conn, account_id)? {
            if !booking.has_member(account_id)
                || !booking.is_completed(now)
                || has_booking_payment(&self.conn, account_id, booking.id)?
            {
                continue;
            }
            let members = roster_members(&self.conn, &booking.roster)?;
            let allocation = allocate(&members, booking.duration_hours(), &self.policy.rates)?;
            if let Some(share) = allocation.share_for(account_id) {
                dues.push(Due {
                    booking_id: booking.id,
                    date: booking.date,
                    range: booking.range,
                    amount_owed: share.amount_owed,
                    grand_total: allocation.summary.grand_total,
                });
            }
        }
        tracing::debug!(account_id = %account_id, count = dues.len(), "computed dues");
        Ok(dues)
    }

    /// Prices a session for `roster` without recording anything.
    pub fn quote(&self, roster: &[AccountId], hours: u32) -> Result<Allocation, DbError> {
        let roster = normalize_roster(roster)?;
        let members = roster_members(&self.conn, &roster)?;
        Ok(allocate(&members, hours, &self.policy.rates)?)
    }
}
