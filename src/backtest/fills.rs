//! Slippage and partial-fill simulation
//!
//! Execution frictions for backtested orders. All randomness comes from a
//! caller-provided seeded generator so runs are reproducible.

use crate::signal::Contract;
use rand::rngs::StdRng;
use rand::Rng;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// A simulated trade fill
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    /// Contracts requested
    pub requested_size: u32,
    /// Contracts actually filled
    pub filled_size: u32,
    /// Execution price after slippage
    pub avg_price: Decimal,
    /// Slippage applied, in price terms
    pub slippage: Decimal,
}

impl Fill {
    /// Fraction of the order filled
    pub fn fill_rate(&self) -> Decimal {
        if self.requested_size == 0 {
            return Decimal::ZERO;
        }
        Decimal::from(self.filled_size) / Decimal::from(self.requested_size)
    }
}

/// Price-impact model for order slippage
#[derive(Debug, Clone, Deserialize)]
pub struct SlippageModel {
    /// Base slippage in basis points
    pub base_slippage_bps: Decimal,
    /// Additional slippage per unit of size/depth ratio
    pub size_impact_factor: Decimal,
    /// Multiplier on the volatility term
    pub volatility_factor: Decimal,
}

impl Default for SlippageModel {
    fn default() -> Self {
        Self {
            base_slippage_bps: dec!(10),
            size_impact_factor: dec!(0.1),
            volatility_factor: dec!(1.0),
        }
    }
}

impl SlippageModel {
    /// Estimate slippage for an order in price terms.
    ///
    /// Base cost plus size impact, scaled up with volatility, floored at
    /// half the quoted spread. Execution is never assumed tighter than the
    /// book itself.
    pub fn estimate_slippage(
        &self,
        size: Decimal,
        depth: Decimal,
        volatility: Decimal,
        spread: Decimal,
    ) -> Decimal {
        let mut slippage = self.base_slippage_bps / dec!(10000);

        if depth > Decimal::ZERO {
            slippage += self.size_impact_factor * (size / depth);
        }

        slippage *= Decimal::ONE + volatility * self.volatility_factor;

        slippage.max(spread / Decimal::TWO)
    }
}

/// Fill simulation with partial fills and slippage
#[derive(Debug, Clone)]
pub struct FillModel {
    slippage: SlippageModel,
    /// Probability of a partial fill when depth suffices
    partial_fill_prob: f64,
    /// Lower bound of the partial-fill fraction
    min_fill_pct: f64,
}

impl Default for FillModel {
    fn default() -> Self {
        Self {
            slippage: SlippageModel::default(),
            partial_fill_prob: 0.1,
            min_fill_pct: 0.5,
        }
    }
}

impl FillModel {
    /// Create a fill model
    pub fn new(slippage: SlippageModel, partial_fill_prob: f64, min_fill_pct: f64) -> Self {
        Self {
            slippage,
            partial_fill_prob,
            min_fill_pct,
        }
    }

    /// Simulate a fill for an order against the current book.
    ///
    /// Orders larger than depth fill only the depth; otherwise a partial
    /// fill occurs with the configured probability. Returns `None` for
    /// non-positive size or depth, or when the computed fill is zero.
    /// Yes buys move the price up, No buys move the effective Yes price
    /// down; the final price is clamped to [0.01, 0.99].
    #[allow(clippy::too_many_arguments)]
    pub fn simulate_fill(
        &self,
        rng: &mut StdRng,
        side: Contract,
        size: u32,
        price: Decimal,
        depth: Decimal,
        volatility: Decimal,
        spread: Decimal,
    ) -> Option<Fill> {
        if size == 0 || depth <= Decimal::ZERO {
            return None;
        }

        let filled_size = if Decimal::from(size) > depth {
            depth.to_u32().unwrap_or(0)
        } else if rng.gen::<f64>() < self.partial_fill_prob {
            let fill_pct = rng.gen_range(self.min_fill_pct..=1.0);
            (size as f64 * fill_pct) as u32
        } else {
            size
        };

        if filled_size == 0 {
            return None;
        }

        let slippage = self.slippage.estimate_slippage(
            Decimal::from(filled_size),
            depth,
            volatility,
            spread,
        );

        let avg_price = match side {
            Contract::Yes => price + slippage,
            Contract::No => price - slippage,
        };
        let avg_price = avg_price.clamp(dec!(0.01), dec!(0.99));

        Some(Fill {
            requested_size: size,
            filled_size,
            avg_price,
            slippage,
        })
    }
}

/// Estimate permanent market impact of a trade.
///
/// Kyle-lambda style: impact scales with the order's share of depth.
pub fn estimate_market_impact(
    size: Decimal,
    depth: Decimal,
    current_price: Decimal,
    price_impact_coefficient: Decimal,
) -> Decimal {
    if depth == Decimal::ZERO {
        return Decimal::ZERO;
    }
    price_impact_coefficient * (size / depth) * current_price
}
