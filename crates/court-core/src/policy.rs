//! Deployment constants for booking and settlement.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::rates::RatePolicy;

/// Tolerance when comparing a claimed cash amount to the computed total.
pub const DEFAULT_AMOUNT_EPSILON: Decimal = dec!(0.01);

/// Policy constants consumed by the booking lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Policy {
    pub rates: RatePolicy,
    /// Coins charged per booked hour.
    pub booking_unit_cost: i64,
    /// Longest span a week view may cover.
    pub max_view_days: u32,
    pub amount_epsilon: Decimal,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            rates: RatePolicy::default(),
            booking_unit_cost: 10,
            max_view_days: 14,
            amount_epsilon: DEFAULT_AMOUNT_EPSILON,
        }
    }
}

impl Policy {
    /// Coin cost of booking `hours`, zero for exempt accounts.
    pub fn coin_cost(&self, hours: u32, exempt: bool) -> Result<i64, EngineError> {
        if exempt {
            return Ok(0);
        }
        i64::from(hours)
            .checked_mul(self.booking_unit_cost)
            .ok_or_else(|| EngineError::InvalidAmount {
                reason: format!(
                    "coin cost of {hours}h at {} per hour is out of range",
                    self.booking_unit_cost
                ),
            })
    }

    /// Rejects settings no booking could be priced or viewed with.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.booking_unit_cost < 0 {
            return Err(EngineError::InvalidAmount {
                reason: format!("booking unit cost {} is negative", self.booking_unit_cost),
            });
        }
        if self.max_view_days == 0 {
            return Err(EngineError::invalid_range("max view days must be at least 1"));
        }
        if self.amount_epsilon < Decimal::ZERO {
            return Err(EngineError::InvalidAmount {
                reason: format!("amount epsilon {} is negative", self.amount_epsilon),
            });
        }
        self.rates.validate()
    }
}
