//! Cash payment records for played sessions.

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::account::MembershipClass;
use crate::error::EngineError;
use crate::types::{AccountId, BookingId, PaymentId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentRecordStatus {
    Pending,
    Paid,
    Rejected,
}

impl PaymentRecordStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for PaymentRecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for PaymentRecordStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "rejected" => Ok(Self::Rejected),
            _ => Err(format!("unknown payment record status {s}")),
        }
    }
}

/// Admin decision once cash has (or has not) been collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentDecision {
    Paid,
    Rejected,
}

impl From<PaymentDecision> for PaymentRecordStatus {
    fn from(decision: PaymentDecision) -> Self {
        match decision {
            PaymentDecision::Paid => Self::Paid,
            PaymentDecision::Rejected => Self::Rejected,
        }
    }
}

/// A played session with no booking behind it, such as weekend open play.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenPlaySession {
    pub date: NaiveDate,
    /// Distinguishes sessions on the same day (e.g. "saturday-am").
    pub label: String,
    pub hours: u32,
    #[serde(default)]
    pub attendees: Vec<String>,
}

impl OpenPlaySession {
    pub fn validate(&self, today: NaiveDate) -> Result<(), EngineError> {
        if self.date > today {
            return Err(EngineError::InvalidDate {
                date: self.date,
                reason: "sessions cannot be settled before they are played",
            });
        }
        if self.label.trim().is_empty() {
            return Err(EngineError::InvalidRange {
                reason: "session label cannot be empty".to_string(),
            });
        }
        if self.hours == 0 {
            return Err(EngineError::InvalidAmount {
                reason: "session must last at least one hour".to_string(),
            });
        }
        Ok(())
    }
}

/// What a payment record settles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PaymentTarget {
    Booking { booking_id: BookingId },
    OpenPlay(OpenPlaySession),
}

/// One participant's cash settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentRecord {
    pub id: PaymentId,
    pub account_id: AccountId,
    pub target: PaymentTarget,
    pub amount: Decimal,
    pub status: PaymentRecordStatus,
    /// Class of the payer when the record was made.
    pub membership_class: MembershipClass,
    /// Blended per-hour rate the payer was charged.
    pub rate_applied: Decimal,
    pub hours: u32,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
}

impl PaymentRecord {
    pub const fn booking_id(&self) -> Option<BookingId> {
        match &self.target {
            PaymentTarget::Booking { booking_id } => Some(*booking_id),
            PaymentTarget::OpenPlay(_) => None,
        }
    }

    /// Records move out of pending exactly once.
    pub fn check_resolvable(&self, decision: PaymentDecision) -> Result<(), EngineError> {
        if self.status != PaymentRecordStatus::Pending {
            return Err(EngineError::InvalidTransition {
                entity: "payment",
                from: self.status.to_string(),
                to: PaymentRecordStatus::from(decision).to_string(),
            });
        }
        Ok(())
    }
}

/// Rejects negative cash claims.
pub fn check_claimed_amount(amount: Decimal) -> Result<(), EngineError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(EngineError::InvalidAmount {
            reason: format!("payment amount {amount} is negative"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn session(date: &str, hours: u32) -> OpenPlaySession {
        OpenPlaySession {
            date: date.parse().unwrap(),
            label: "saturday-am".to_string(),
            hours,
            attendees: vec!["Guest One".to_string()],
        }
    }

    #[test]
    fn test_open_play_validation() {
        let today: NaiveDate = "2026-05-02".parse().unwrap();
        assert!(session("2026-05-02", 2).validate(today).is_ok());
        assert_eq!(
            session("2026-05-03", 2).validate(today).unwrap_err().code(),
            "invalid_date"
        );
        assert_eq!(
            session("2026-05-01", 0).validate(today).unwrap_err().code(),
            "invalid_amount"
        );
    }

    #[test]
    fn test_resolution_happens_once() {
        let mut record = PaymentRecord {
            id: PaymentId::new(1),
            account_id: AccountId::new(2),
            target: PaymentTarget::Booking {
                booking_id: BookingId::new(9),
            },
            amount: dec!(200),
            status: PaymentRecordStatus::Pending,
            membership_class: MembershipClass::Standard,
            rate_applied: dec!(37.5),
            hours: 2,
            notes: None,
            created_at: "2026-05-02T12:00:00".parse().unwrap(),
        };
        assert_eq!(record.booking_id(), Some(BookingId::new(9)));
        assert!(record.check_resolvable(PaymentDecision::Paid).is_ok());

        record.status = PaymentRecordStatus::Paid;
        let err = record.check_resolvable(PaymentDecision::Rejected).unwrap_err();
        assert_eq!(err.to_string(), "cannot move payment from paid to rejected");
    }

    #[test]
    fn test_negative_claims_are_rejected() {
        assert!(check_claimed_amount(dec!(0)).is_ok());
        assert!(check_claimed_amount(dec!(12.5)).is_ok());
        assert!(check_claimed_amount(dec!(-1)).is_err());
    }
}
