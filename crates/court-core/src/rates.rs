//! Two-tier hourly rates with a minimum total per hour.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::account::MembershipClass;
use crate::error::EngineError;

/// Injected rate constants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RatePolicy {
    /// Per-hour rate for standard members.
    pub standard: Decimal,
    /// Per-hour rate for reduced-rate members.
    pub reduced: Decimal,
    /// Floor on the combined per-hour total of a roster.
    pub minimum_total_per_hour: Decimal,
}

impl Default for RatePolicy {
    fn default() -> Self {
        Self {
            standard: dec!(25),
            reduced: dec!(50),
            minimum_total_per_hour: dec!(100),
        }
    }
}

/// Per-class rates after applying the minimum floor to one roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BlendedRates {
    pub count_standard: u32,
    pub count_reduced: u32,
    pub standard: Decimal,
    pub reduced: Decimal,
    /// Roster total before the floor was applied.
    pub raw_total_per_hour: Decimal,
    /// `max(raw_total_per_hour, minimum_total_per_hour)`.
    pub total_per_hour: Decimal,
}

impl BlendedRates {
    pub const fn rate_for(&self, class: MembershipClass) -> Decimal {
        match class {
            MembershipClass::Standard => self.standard,
            MembershipClass::ReducedRate => self.reduced,
        }
    }

    pub const fn roster_size(&self) -> u32 {
        self.count_standard + self.count_reduced
    }
}

impl RatePolicy {
    /// Base per-hour rate for a class.
    pub const fn rate_for(&self, class: MembershipClass) -> Decimal {
        match class {
            MembershipClass::Standard => self.standard,
            MembershipClass::ReducedRate => self.reduced,
        }
    }

    /// Blends the rates for a roster.
    ///
    /// When the roster's raw total falls short of the minimum, the shortfall
    /// is split evenly per head and the same flat amount is added to both
    /// class rates. The adjustment applies to this roster only. An empty
    /// roster is returned unadjusted.
    pub fn blend(&self, roster: &[MembershipClass]) -> Result<BlendedRates, EngineError> {
        let count_standard = count(roster, MembershipClass::Standard);
        let count_reduced = count(roster, MembershipClass::ReducedRate);

        let raw_total_per_hour = Decimal::from(count_standard)
            .checked_mul(self.standard)
            .zip(Decimal::from(count_reduced).checked_mul(self.reduced))
            .and_then(|(standard, reduced)| standard.checked_add(reduced))
            .ok_or_else(|| overflow("roster total per hour"))?;

        let mut blended = BlendedRates {
            count_standard,
            count_reduced,
            standard: self.standard,
            reduced: self.reduced,
            raw_total_per_hour,
            total_per_hour: raw_total_per_hour,
        };

        let size = blended.roster_size();
        if size == 0 || raw_total_per_hour >= self.minimum_total_per_hour {
            return Ok(blended);
        }

        let per_head = self
            .minimum_total_per_hour
            .checked_sub(raw_total_per_hour)
            .ok_or_else(|| overflow("minimum shortfall"))?
            / Decimal::from(size);
        blended.standard = self
            .standard
            .checked_add(per_head)
            .ok_or_else(|| overflow("standard rate"))?;
        blended.reduced = self
            .reduced
            .checked_add(per_head)
            .ok_or_else(|| overflow("reduced rate"))?;
        blended.total_per_hour = self.minimum_total_per_hour;
        Ok(blended)
    }

    /// Rejects negative rates.
    pub fn validate(&self) -> Result<(), EngineError> {
        for (name, rate) in [
            ("standard", self.standard),
            ("reduced", self.reduced),
            ("minimum_total_per_hour", self.minimum_total_per_hour),
        ] {
            if rate < Decimal::ZERO {
                return Err(EngineError::InvalidAmount {
                    reason: format!("rate {name} is negative: {rate}"),
                });
            }
        }
        Ok(())
    }
}

pub(crate) fn overflow(what: &str) -> EngineError {
    EngineError::InvalidAmount {
        reason: format!("{what} is out of range"),
    }
}

fn count(roster: &[MembershipClass], class: MembershipClass) -> u32 {
    let n = roster.iter().filter(|member| **member == class).count();
    u32::try_from(n).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    use MembershipClass::{ReducedRate, Standard};

    #[test]
    fn test_rate_for_returns_configured_tier() {
        let policy = RatePolicy::default();
        assert_eq!(policy.rate_for(Standard), dec!(25));
        assert_eq!(policy.rate_for(ReducedRate), dec!(50));
    }

    #[test]
    fn test_shortfall_is_split_per_head() {
        let policy = RatePolicy::default();
        let blended = policy.blend(&[Standard, ReducedRate]).unwrap();

        assert_eq!(blended.raw_total_per_hour, dec!(75));
        assert_eq!(blended.standard, dec!(37.5));
        assert_eq!(blended.reduced, dec!(62.5));
        assert_eq!(blended.total_per_hour, dec!(100));
        assert_eq!(blended.standard + blended.reduced, blended.total_per_hour);
    }

    #[test]
    fn test_roster_above_minimum_is_untouched() {
        let policy = RatePolicy::default();
        let blended = policy.blend(&[ReducedRate, ReducedRate, Standard]).unwrap();

        assert_eq!(blended.raw_total_per_hour, dec!(125));
        assert_eq!(blended.total_per_hour, dec!(125));
        assert_eq!(blended.standard, dec!(25));
        assert_eq!(blended.reduced, dec!(50));
    }

    #[test]
    fn test_roster_exactly_at_minimum_is_untouched() {
        let policy = RatePolicy::default();
        let blended = policy.blend(&[ReducedRate, ReducedRate]).unwrap();
        assert_eq!(blended.total_per_hour, dec!(100));
        assert_eq!(blended.reduced, dec!(50));
    }

    #[test]
    fn test_single_member_pays_the_whole_minimum() {
        let policy = RatePolicy::default();
        let blended = policy.blend(&[Standard]).unwrap();
        assert_eq!(blended.standard, dec!(100));
        assert_eq!(blended.total_per_hour, dec!(100));
    }

    #[test]
    fn test_flat_adjustment_applies_to_both_tiers() {
        let policy = RatePolicy {
            standard: dec!(10),
            reduced: dec!(20),
            minimum_total_per_hour: dec!(100),
        };
        let blended = policy.blend(&[Standard, Standard, ReducedRate, ReducedRate]).unwrap();
        // raw 60, shortfall 40 over 4 heads
        assert_eq!(blended.standard, dec!(20));
        assert_eq!(blended.reduced, dec!(30));
        assert_eq!(blended.standard - policy.standard, blended.reduced - policy.reduced);
    }

    #[test]
    fn test_empty_roster_is_unadjusted() {
        let blended = RatePolicy::default().blend(&[]).unwrap();
        assert_eq!(blended.roster_size(), 0);
        assert_eq!(blended.total_per_hour, Decimal::ZERO);
    }

    #[test]
    fn test_huge_rates_report_out_of_range() {
        let policy = RatePolicy {
            standard: Decimal::MAX,
            reduced: Decimal::MAX,
            minimum_total_per_hour: dec!(100),
        };
        let err = policy.blend(&[Standard, ReducedRate]).unwrap_err();
        assert_eq!(err.code(), "invalid_amount");
        assert_eq!(err.to_string(), "invalid amount: roster total per hour is out of range");
    }

    #[test]
    fn test_shortfall_overflowing_a_rate_is_rejected() {
        let policy = RatePolicy {
            standard: Decimal::MAX,
            reduced: Decimal::MIN,
            minimum_total_per_hour: Decimal::MAX,
        };
        // raw total is zero, so the per-head shortfall pushes standard past MAX
        let err = policy.blend(&[Standard, ReducedRate]).unwrap_err();
        assert_eq!(err.to_string(), "invalid amount: standard rate is out of range");
    }

    #[test]
    fn test_validate_rejects_negative_rates() {
        assert!(RatePolicy::default().validate().is_ok());
        let policy = RatePolicy {
            reduced: dec!(-5),
            ..RatePolicy::default()
        };
        assert_eq!(
            policy.validate().unwrap_err().to_string(),
            "invalid amount: rate reduced is negative: -5"
        );
    }
}
