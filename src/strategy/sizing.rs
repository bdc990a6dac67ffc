//! Position sizing
//!
//! Fractional-Kelly sizing for binary contracts, with liquidity, timing,
//! and depth adjustments layered on top.

use crate::config::SizingConfig;
use crate::strategy::ev::MAX_EDGE;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Kelly-criterion position sizer
pub struct PositionSizer {
    params: SizingConfig,
}

impl PositionSizer {
    /// Create a sizer from configuration
    pub fn new(params: SizingConfig) -> Self {
        Self { params }
    }

    /// Calculate a position size in contracts.
    ///
    /// Confidence is translated into an implied win probability above the
    /// market price (capped at the same edge cap the EV estimator uses),
    /// run through fractional Kelly, then scaled by liquidity, trimmed near
    /// resolution, capped at 10% of available depth, and clamped to the
    /// configured bounds.
    pub fn calculate(
        &self,
        confidence: Decimal,
        entry_price: Decimal,
        liquidity_score: Decimal,
        time_to_resolution: Option<i64>,
        available_depth: Option<Decimal>,
        bankroll: Option<Decimal>,
    ) -> u32 {
        let estimated_win_prob =
            (entry_price + confidence * MAX_EDGE).clamp(dec!(0.05), dec!(0.95));

        let mut size = self.kelly_size(estimated_win_prob, entry_price, bankroll);

        // No edge: fall back to a confidence-scaled minimum rather than
        // refusing entirely
        if size <= Decimal::ZERO {
            size = self.params.min_size * confidence;
        }

        size *= liquidity_score;

        if let Some(seconds) = time_to_resolution {
            size *= time_adjustment(seconds);
        }

        if let Some(depth) = available_depth {
            size = size.min(depth * dec!(0.1));
        }

        size = size.clamp(self.params.min_size, self.params.max_size);
        size.to_u32().unwrap_or(0)
    }

    /// Kelly-optimal dollar size for a binary contract.
    ///
    /// Odds b = (1 - price) / price; f* = (b*p - q) / b. Zero when the
    /// inputs are outside (0, 1) or the edge is non-positive.
    fn kelly_size(
        &self,
        win_prob: Decimal,
        entry_price: Decimal,
        bankroll: Option<Decimal>,
    ) -> Decimal {
        let bankroll = bankroll.unwrap_or(self.params.base_size * dec!(10));

        if win_prob <= Decimal::ZERO || win_prob >= Decimal::ONE {
            return Decimal::ZERO;
        }
        if entry_price <= Decimal::ZERO || entry_price >= Decimal::ONE {
            return Decimal::ZERO;
        }

        let b = (Decimal::ONE - entry_price) / entry_price;
        let p = win_prob;
        let q = Decimal::ONE - p;
        let kelly = (b * p - q) / b;

        if kelly <= Decimal::ZERO {
            return Decimal::ZERO;
        }

        let adjusted = kelly * self.params.kelly_fraction;
        (bankroll * adjusted).max(Decimal::ZERO)
    }
}

/// Size multiplier by time to resolution.
///
/// Less time for the price to move favorably means smaller positions.
fn time_adjustment(seconds: i64) -> Decimal {
    if seconds < 1800 {
        dec!(0.5)
    } else if seconds < 3600 {
        dec!(0.7)
    } else if seconds < 7200 {
        dec!(0.85)
    } else {
        Decimal::ONE
    }
}
