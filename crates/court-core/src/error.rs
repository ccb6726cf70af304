//! Error taxonomy for scheduling, ledger, and settlement rules.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

/// A business-rule failure. Every variant is recoverable by the caller.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Booking or session date is not allowed relative to today.
    #[error("invalid date {date}: {reason}")]
    InvalidDate { date: NaiveDate, reason: &'static str },

    /// Slot label, slot range, or view range is malformed.
    #[error("invalid range: {reason}")]
    InvalidRange { reason: String },

    /// The requested range overlaps an existing booking.
    #[error("{date} {range} overlaps an existing booking")]
    SlotConflict { date: NaiveDate, range: String },

    /// The acting account has not paid its membership fees.
    #[error("membership fees are unpaid")]
    FeesUnpaid,

    /// The acting account has payment records awaiting settlement.
    #[error("{count} payment record(s) still pending")]
    UnsettledPayments { count: u32 },

    /// Coin balance does not cover the debit.
    #[error("insufficient balance: have {balance}, need {required}")]
    InsufficientBalance { balance: i64, required: i64 },

    /// Amount is negative or otherwise unusable.
    #[error("invalid amount: {reason}")]
    InvalidAmount { reason: String },

    /// Roster is empty or references unknown accounts.
    #[error("invalid roster: {reason}")]
    InvalidRoster { reason: String },

    /// The referenced entity does not exist.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    /// The acting account may not perform this operation.
    #[error("account {account} may not modify booking {booking}")]
    Forbidden { account: i64, booking: i64 },

    #[error("booking {booking} is already cancelled")]
    AlreadyCancelled { booking: i64 },

    #[error("booking {booking} is already completed")]
    AlreadyCompleted { booking: i64 },

    #[error("booking {booking} has not finished yet")]
    NotCompleted { booking: i64 },

    #[error("account {account} is not on the roster of booking {booking}")]
    NotInRoster { account: i64, booking: i64 },

    /// A payment record already exists for this account and session.
    #[error("payment already submitted for this session")]
    AlreadySettled,

    /// The claimed amount differs from the recomputed total.
    #[error("amount mismatch: expected {expected}, got {got}")]
    AmountMismatch { expected: Decimal, got: Decimal },

    /// An admin resolution was applied to a record that is not pending.
    #[error("cannot move {entity} from {from} to {to}")]
    InvalidTransition {
        entity: &'static str,
        from: String,
        to: String,
    },
}

impl EngineError {
    /// Stable machine-readable code for this error.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidDate { .. } => "invalid_date",
            Self::InvalidRange { .. } => "invalid_range",
            Self::SlotConflict { .. } => "slot_conflict",
            Self::FeesUnpaid => "fees_unpaid",
            Self::UnsettledPayments { .. } => "unsettled_payments",
            Self::InsufficientBalance { .. } => "insufficient_balance",
            Self::InvalidAmount { .. } => "invalid_amount",
            Self::InvalidRoster { .. } => "invalid_roster",
            Self::NotFound { .. } => "not_found",
            Self::Forbidden { .. } => "forbidden",
            Self::AlreadyCancelled { .. } => "already_cancelled",
            Self::AlreadyCompleted { .. } => "already_completed",
            Self::NotCompleted { .. } => "not_completed",
            Self::NotInRoster { .. } => "not_in_roster",
            Self::AlreadySettled => "already_settled",
            Self::AmountMismatch { .. } => "amount_mismatch",
            Self::InvalidTransition { .. } => "invalid_transition",
        }
    }

    pub(crate) fn invalid_range(reason: impl Into<String>) -> Self {
        Self::InvalidRange {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_messages_carry_detail() {
        let err = EngineError::AmountMismatch {
            expected: dec!(200),
            got: dec!(150.5),
        };
        assert_eq!(err.to_string(), "amount mismatch: expected 200, got 150.5");
        assert_eq!(err.code(), "amount_mismatch");

        let err = EngineError::UnsettledPayments { count: 2 };
        assert_eq!(err.to_string(), "2 payment record(s) still pending");
    }

    #[test]
    fn test_codes_are_snake_case() {
        let errors = [
            EngineError::FeesUnpaid,
            EngineError::AlreadySettled,
            EngineError::NotFound {
                entity: "booking",
                id: 1,
            },
            EngineError::invalid_range("end before start"),
        ];
        for err in &errors {
            let code = err.code();
            assert!(
                code.chars().all(|c| c.is_ascii_lowercase() || c == '_'),
                "{code}"
            );
        }
    }
}
