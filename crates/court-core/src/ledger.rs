//! Coin ledger entries and balance rules.
//!
//! The ledger is append-only. An account's balance always equals the sum of
//! its approved `earned` and `granted` entries minus its approved `spent`
//! entries. `requested` entries never move the balance; approving one
//! appends a separate `granted` entry.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::types::{AccountId, BookingId, EntryId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerKind {
    Earned,
    Spent,
    Requested,
    Granted,
}

impl LedgerKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Earned => "earned",
            Self::Spent => "spent",
            Self::Requested => "requested",
            Self::Granted => "granted",
        }
    }

    /// Signed effect of an approved entry of this kind.
    const fn sign(self) -> i64 {
        match self {
            Self::Earned | Self::Granted => 1,
            Self::Spent => -1,
            Self::Requested => 0,
        }
    }
}

impl fmt::Display for LedgerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for LedgerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "earned" => Ok(Self::Earned),
            "spent" => Ok(Self::Spent),
            "requested" => Ok(Self::Requested),
            "granted" => Ok(Self::Granted),
            _ => Err(format!("unknown ledger kind {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    Pending,
    Approved,
    Rejected,
}

impl EntryStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for EntryStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            _ => Err(format!("unknown entry status {s}")),
        }
    }
}

/// Kinds of entry a credit may append.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreditKind {
    /// Refunds and other coins returned to a member.
    Earned,
    /// Admin grants.
    Granted,
}

impl From<CreditKind> for LedgerKind {
    fn from(kind: CreditKind) -> Self {
        match kind {
            CreditKind::Earned => Self::Earned,
            CreditKind::Granted => Self::Granted,
        }
    }
}

/// Admin decision on a pending grant request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantDecision {
    Approve,
    Reject,
}

impl GrantDecision {
    pub const fn target_status(self) -> EntryStatus {
        match self {
            Self::Approve => EntryStatus::Approved,
            Self::Reject => EntryStatus::Rejected,
        }
    }
}

/// One append-only ledger line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerEntry {
    pub id: EntryId,
    pub account_id: AccountId,
    pub kind: LedgerKind,
    pub amount: i64,
    pub status: EntryStatus,
    pub reason: String,
    pub booking_id: Option<BookingId>,
    pub created_at: NaiveDateTime,
}

impl LedgerEntry {
    /// Contribution of this entry to the account balance.
    pub const fn balance_effect(&self) -> i64 {
        match self.status {
            EntryStatus::Approved => self.kind.sign() * self.amount,
            EntryStatus::Pending | EntryStatus::Rejected => 0,
        }
    }

    /// A request may be resolved exactly once.
    pub fn check_resolvable(&self, decision: GrantDecision) -> Result<(), EngineError> {
        if self.kind != LedgerKind::Requested || self.status != EntryStatus::Pending {
            return Err(EngineError::InvalidTransition {
                entity: "ledger entry",
                from: format!("{} {}", self.kind, self.status),
                to: decision.target_status().to_string(),
            });
        }
        Ok(())
    }
}

/// Balance implied by a full entry history.
pub fn derived_balance(entries: &[LedgerEntry]) -> i64 {
    entries.iter().map(LedgerEntry::balance_effect).sum()
}

/// Rejects negative coin amounts.
pub fn check_amount(amount: i64) -> Result<(), EngineError> {
    if amount < 0 {
        return Err(EngineError::InvalidAmount {
            reason: format!("coin amount {amount} is negative"),
        });
    }
    Ok(())
}

/// Returns the amount actually charged, zero for exempt accounts.
pub fn check_debit(balance: i64, amount: i64, exempt: bool) -> Result<i64, EngineError> {
    check_amount(amount)?;
    if exempt {
        return Ok(0);
    }
    if balance < amount {
        return Err(EngineError::InsufficientBalance {
            balance,
            required: amount,
        });
    }
    Ok(amount)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(kind: LedgerKind, amount: i64, status: EntryStatus) -> LedgerEntry {
        LedgerEntry {
            id: EntryId::new(1),
            account_id: AccountId::new(1),
            kind,
            amount,
            status,
            reason: "test".to_string(),
            booking_id: None,
            created_at: "2026-01-01T00:00:00".parse().unwrap(),
        }
    }

    #[test]
    fn test_balance_counts_only_approved_entries() {
        let entries = [
            entry(LedgerKind::Granted, 50, EntryStatus::Approved),
            entry(LedgerKind::Spent, 20, EntryStatus::Approved),
            entry(LedgerKind::Earned, 20, EntryStatus::Approved),
            entry(LedgerKind::Spent, 10, EntryStatus::Approved),
            entry(LedgerKind::Requested, 100, EntryStatus::Pending),
            entry(LedgerKind::Requested, 100, EntryStatus::Approved),
            entry(LedgerKind::Granted, 7, EntryStatus::Rejected),
        ];
        assert_eq!(derived_balance(&entries), 40);
    }

    #[test]
    fn test_debit_requires_cover_unless_exempt() {
        assert_eq!(check_debit(30, 20, false), Ok(20));
        assert_eq!(check_debit(20, 20, false), Ok(20));
        assert_eq!(
            check_debit(5, 10, false),
            Err(EngineError::InsufficientBalance {
                balance: 5,
                required: 10
            })
        );
        assert_eq!(check_debit(5, 10, true), Ok(0));
        assert_eq!(check_debit(5, -1, true).unwrap_err().code(), "invalid_amount");
    }

    #[test]
    fn test_only_pending_requests_resolve() {
        let pending = entry(LedgerKind::Requested, 30, EntryStatus::Pending);
        assert!(pending.check_resolvable(GrantDecision::Approve).is_ok());
        assert!(pending.check_resolvable(GrantDecision::Reject).is_ok());

        let approved = entry(LedgerKind::Requested, 30, EntryStatus::Approved);
        let err = approved.check_resolvable(GrantDecision::Reject).unwrap_err();
        assert_eq!(err.to_string(), "cannot move ledger entry from requested approved to rejected");

        let spent = entry(LedgerKind::Spent, 30, EntryStatus::Pending);
        assert!(spent.check_resolvable(GrantDecision::Approve).is_err());
    }

    #[test]
    fn test_kind_roundtrip() {
        for kind in [
            LedgerKind::Earned,
            LedgerKind::Spent,
            LedgerKind::Requested,
            LedgerKind::Granted,
        ] {
            assert_eq!(kind.as_str().parse::<LedgerKind>().unwrap(), kind);
        }
    }
}
