//! Reservations and the rules governing their lifecycle.
//!
//! Stored status is one of pending, confirmed, or cancelled. Completion is
//! derived from the wall clock: a non-cancelled booking whose end mark has
//! passed is completed.

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::account::Actor;
use crate::error::EngineError;
use crate::slot::SlotRange;
use crate::types::{AccountId, BookingId};

/// Reservation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    /// Awaiting moderation; unused by the default flow.
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl BookingStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "cancelled" => Ok(Self::Cancelled),
            "completed" => Ok(Self::Completed),
            _ => Err(format!("unknown booking status {s}")),
        }
    }
}

/// Whether every roster member has settled their cash share.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
}

impl PaymentStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            _ => Err(format!("unknown payment status {s}")),
        }
    }
}

/// A court reservation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Booking {
    pub id: BookingId,
    pub owner_id: AccountId,
    pub date: NaiveDate,
    pub range: SlotRange,
    /// Stored without an end mark; read as a single hour.
    pub legacy_single_slot: bool,
    /// Participants in booking order. Always contains at least one id.
    pub roster: Vec<AccountId>,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    /// Coins debited at creation and refunded on cancel.
    pub coin_cost: i64,
    pub notes: Option<String>,
}

impl Booking {
    pub const fn duration_hours(&self) -> u32 {
        self.range.duration_hours()
    }

    /// Wall-clock moment the booking ends.
    pub fn ends_at(&self) -> NaiveDateTime {
        self.date.and_time(self.range.end().time())
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == BookingStatus::Cancelled
    }

    /// Whether the session has been played out.
    pub fn is_completed(&self, now: NaiveDateTime) -> bool {
        match self.status {
            BookingStatus::Cancelled => false,
            BookingStatus::Completed => true,
            BookingStatus::Pending | BookingStatus::Confirmed => self.ends_at() <= now,
        }
    }

    /// Stored status with completion applied.
    pub fn effective_status(&self, now: NaiveDateTime) -> BookingStatus {
        if self.is_completed(now) {
            BookingStatus::Completed
        } else {
            self.status
        }
    }

    pub fn has_member(&self, account_id: AccountId) -> bool {
        self.roster.contains(&account_id)
    }

    /// Rejects cancellation by strangers and of terminal bookings.
    pub fn check_cancel(&self, actor: &Actor, now: NaiveDateTime) -> Result<(), EngineError> {
        if self.owner_id != actor.account_id && !actor.admin {
            return Err(EngineError::Forbidden {
                account: actor.account_id.get(),
                booking: self.id.get(),
            });
        }
        if self.is_cancelled() {
            return Err(EngineError::AlreadyCancelled {
                booking: self.id.get(),
            });
        }
        if self.is_completed(now) {
            return Err(EngineError::AlreadyCompleted {
                booking: self.id.get(),
            });
        }
        Ok(())
    }

    /// Rejects settlement before the session ends or by non-participants.
    pub fn check_settle(&self, payer: AccountId, now: NaiveDateTime) -> Result<(), EngineError> {
        if self.is_cancelled() {
            return Err(EngineError::AlreadyCancelled {
                booking: self.id.get(),
            });
        }
        if !self.is_completed(now) {
            return Err(EngineError::NotCompleted {
                booking: self.id.get(),
            });
        }
        if !self.has_member(payer) {
            return Err(EngineError::NotInRoster {
                account: payer.get(),
                booking: self.id.get(),
            });
        }
        Ok(())
    }
}

/// A request to reserve the court.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingRequest {
    pub date: NaiveDate,
    pub range: SlotRange,
    pub roster: Vec<AccountId>,
    pub notes: Option<String>,
}

/// Rejects bookings dated before today, and same-day ranges that have
/// already ended.
pub fn check_booking_date(
    date: NaiveDate,
    range: SlotRange,
    now: NaiveDateTime,
) -> Result<(), EngineError> {
    if date < now.date() {
        return Err(EngineError::InvalidDate {
            date,
            reason: "bookings cannot be made in the past",
        });
    }
    if date.and_time(range.end().time()) <= now {
        return Err(EngineError::InvalidDate {
            date,
            reason: "the requested slots have already ended",
        });
    }
    Ok(())
}

/// Removes duplicate ids, keeping first occurrence order.
pub fn normalize_roster(roster: &[AccountId]) -> Result<Vec<AccountId>, EngineError> {
    let mut members: Vec<AccountId> = Vec::with_capacity(roster.len());
    for id in roster {
        if !members.contains(id) {
            members.push(*id);
        }
    }
    if members.is_empty() {
        return Err(EngineError::InvalidRoster {
            reason: "roster must have at least one member".to_string(),
        });
    }
    Ok(members)
}

/// Checks the acting account may open a new booking.
pub fn check_create_preconditions(actor: &Actor, pending_payments: u32) -> Result<(), EngineError> {
    if !actor.fees_paid {
        return Err(EngineError::FeesUnpaid);
    }
    if pending_payments > 0 && !actor.exempt {
        return Err(EngineError::UnsettledPayments {
            count: pending_payments,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::MembershipClass;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn at(s: &str) -> NaiveDateTime {
        s.parse().unwrap()
    }

    fn booking() -> Booking {
        Booking {
            id: BookingId::new(10),
            owner_id: AccountId::new(1),
            date: date("2026-03-14"),
            range: SlotRange::parse("09:00", "11:00").unwrap(),
            legacy_single_slot: false,
            roster: vec![AccountId::new(1), AccountId::new(2)],
            status: BookingStatus::Confirmed,
            payment_status: PaymentStatus::Pending,
            coin_cost: 20,
            notes: None,
        }
    }

    fn actor(id: i64, admin: bool) -> Actor {
        Actor {
            account_id: AccountId::new(id),
            membership_class: MembershipClass::Standard,
            fees_paid: true,
            exempt: false,
            admin,
        }
    }

    #[test]
    fn test_completion_follows_end_mark() {
        let booking = booking();
        assert!(!booking.is_completed(at("2026-03-14T10:59:00")));
        assert!(booking.is_completed(at("2026-03-14T11:00:00")));
        assert_eq!(
            booking.effective_status(at("2026-03-15T08:00:00")),
            BookingStatus::Completed
        );

        let mut cancelled = booking;
        cancelled.status = BookingStatus::Cancelled;
        assert!(!cancelled.is_completed(at("2026-03-15T08:00:00")));
    }

    #[test]
    fn test_cancel_rules() {
        let before = at("2026-03-14T08:00:00");
        let booking = booking();

        assert!(booking.check_cancel(&actor(1, false), before).is_ok());
        assert!(booking.check_cancel(&actor(7, true), before).is_ok());
        assert_eq!(
            booking.check_cancel(&actor(2, false), before).unwrap_err().code(),
            "forbidden"
        );
        assert_eq!(
            booking
                .check_cancel(&actor(1, false), at("2026-03-14T12:00:00"))
                .unwrap_err()
                .code(),
            "already_completed"
        );

        let mut cancelled = booking;
        cancelled.status = BookingStatus::Cancelled;
        assert_eq!(
            cancelled.check_cancel(&actor(1, false), before).unwrap_err().code(),
            "already_cancelled"
        );
    }

    #[test]
    fn test_settle_rules() {
        let booking = booking();
        let after = at("2026-03-14T12:00:00");

        assert!(booking.check_settle(AccountId::new(2), after).is_ok());
        assert_eq!(
            booking
                .check_settle(AccountId::new(2), at("2026-03-14T10:00:00"))
                .unwrap_err()
                .code(),
            "not_completed"
        );
        assert_eq!(
            booking.check_settle(AccountId::new(3), after).unwrap_err().code(),
            "not_in_roster"
        );
    }

    #[test]
    fn test_past_dates_are_rejected() {
        let now = at("2026-03-14T08:00:00");
        let morning = SlotRange::parse("09:00", "10:00").unwrap();
        assert!(check_booking_date(date("2026-03-14"), morning, now).is_ok());
        assert!(check_booking_date(date("2026-03-20"), morning, now).is_ok());
        assert_eq!(
            check_booking_date(date("2026-03-13"), morning, now)
                .unwrap_err()
                .code(),
            "invalid_date"
        );
    }

    #[test]
    fn test_same_day_range_must_not_have_ended() {
        let now = at("2026-03-14T20:00:00");
        let today = date("2026-03-14");

        let ended = SlotRange::parse("06:00", "08:00").unwrap();
        assert_eq!(
            check_booking_date(today, ended, now).unwrap_err().to_string(),
            "invalid date 2026-03-14: the requested slots have already ended"
        );

        // Ending exactly now is already over
        let just_ended = SlotRange::parse("19:00", "20:00").unwrap();
        assert!(check_booking_date(today, just_ended, now).is_err());

        // Still running counts as bookable
        let running = SlotRange::parse("19:00", "21:00").unwrap();
        assert!(check_booking_date(today, running, now).is_ok());
        assert!(check_booking_date(date("2026-03-15"), ended, now).is_ok());
    }

    #[test]
    fn test_roster_is_deduplicated_in_order() {
        let roster = [AccountId::new(3), AccountId::new(1), AccountId::new(3)];
        assert_eq!(
            normalize_roster(&roster).unwrap(),
            vec![AccountId::new(3), AccountId::new(1)]
        );
        assert!(normalize_roster(&[]).is_err());
    }

    #[test]
    fn test_create_preconditions() {
        let mut member = actor(1, false);
        assert!(check_create_preconditions(&member, 0).is_ok());
        assert_eq!(
            check_create_preconditions(&member, 2),
            Err(EngineError::UnsettledPayments { count: 2 })
        );

        member.exempt = true;
        assert!(check_create_preconditions(&member, 2).is_ok());

        member.fees_paid = false;
        assert_eq!(
            check_create_preconditions(&member, 0),
            Err(EngineError::FeesUnpaid)
        );
    }
}
