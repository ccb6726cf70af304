//! Payment allocation.
//!
//! Turns a roster and a session length into what each participant owes.
//!
//! # Algorithm Summary
//!
//! 1. Count roster members per membership class
//! 2. Blend the class rates against the minimum total per hour (see [`RatePolicy::blend`])
//! 3. Multiply each member's blended rate by the session length
//!
//! Allocation is a pure function of the roster's classes, the duration, and
//! the rate policy, so it is safe to call repeatedly when quoting.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::account::MembershipClass;
use crate::error::EngineError;
use crate::rates::{RatePolicy, overflow};
use crate::types::AccountId;

/// A roster entry resolved to its membership class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterMember {
    pub account_id: AccountId,
    pub membership_class: MembershipClass,
}

/// One participant's share of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberShare {
    pub account_id: AccountId,
    pub membership_class: MembershipClass,
    /// Rate after blending.
    pub rate_per_hour: Decimal,
    pub amount_owed: Decimal,
}

/// Aggregate figures for a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AllocationSummary {
    pub duration_hours: u32,
    pub count_standard: u32,
    pub count_reduced: u32,
    pub rate_per_hour_standard: Decimal,
    pub rate_per_hour_reduced: Decimal,
    pub total_per_hour: Decimal,
    pub grand_total: Decimal,
}

/// Result of allocating a session across its roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Allocation {
    /// Shares in roster order.
    pub members: Vec<MemberShare>,
    pub summary: AllocationSummary,
}

impl Allocation {
    pub fn share_for(&self, account_id: AccountId) -> Option<&MemberShare> {
        self.members
            .iter()
            .find(|share| share.account_id == account_id)
    }

    /// Checks a claimed amount against the grand total.
    pub fn verify_amount(&self, claimed: Decimal, epsilon: Decimal) -> Result<(), EngineError> {
        let expected = self.summary.grand_total;
        let within = claimed
            .checked_sub(expected)
            .is_some_and(|diff| diff.abs() <= epsilon);
        if !within {
            return Err(EngineError::AmountMismatch {
                expected,
                got: claimed,
            });
        }
        Ok(())
    }
}

/// Allocates a session of `duration_hours` across `roster`.
pub fn allocate(
    roster: &[RosterMember],
    duration_hours: u32,
    rates: &RatePolicy,
) -> Result<Allocation, EngineError> {
    if roster.is_empty() {
        return Err(EngineError::InvalidRoster {
            reason: "roster must have at least one member".to_string(),
        });
    }
    if duration_hours == 0 {
        return Err(EngineError::InvalidAmount {
            reason: "session must last at least one hour".to_string(),
        });
    }

    let classes: Vec<MembershipClass> = roster.iter().map(|m| m.membership_class).collect();
    let blended = rates.blend(&classes)?;
    let hours = Decimal::from(duration_hours);

    let members = roster
        .iter()
        .map(|member| {
            let rate_per_hour = blended.rate_for(member.membership_class);
            let amount_owed = rate_per_hour
                .checked_mul(hours)
                .ok_or_else(|| overflow("amount owed"))?;
            Ok(MemberShare {
                account_id: member.account_id,
                membership_class: member.membership_class,
                rate_per_hour,
                amount_owed,
            })
        })
        .collect::<Result<Vec<_>, EngineError>>()?;
    let grand_total = blended
        .total_per_hour
        .checked_mul(hours)
        .ok_or_else(|| overflow("grand total"))?;

    Ok(Allocation {
        members,
        summary: AllocationSummary {
            duration_hours,
            count_standard: blended.count_standard,
            count_reduced: blended.count_reduced,
            rate_per_hour_standard: blended.standard,
            rate_per_hour_reduced: blended.reduced,
            total_per_hour: blended.total_per_hour,
            grand_total,
        },
    })
}
