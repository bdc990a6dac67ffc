//! Expected-value estimation
//!
//! Conservative EV estimate for a binary contract: the claimed edge is
//! capped, scaled by signal agreement, and charged half the quoted spread
//! as round-trip friction.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Hard cap on the edge the system will ever claim over market price
pub const MAX_EDGE: Decimal = dec!(0.10);

/// Win-probability clamp bounds
const MIN_WIN_PROB: Decimal = dec!(0.05);
const MAX_WIN_PROB: Decimal = dec!(0.95);

/// Breakdown of an expected-value estimate
#[derive(Debug, Clone, Copy)]
pub struct EvEstimate {
    /// Transaction friction: half the quoted spread
    pub vig: Decimal,
    /// Edge after the cap and agreement scaling
    pub estimated_edge: Decimal,
    /// Market-implied probability plus our edge, clamped to [0.05, 0.95]
    pub estimated_win_prob: Decimal,
    /// EV before friction
    pub gross_ev: Decimal,
    /// EV net of friction; the thresholded quantity
    pub net_ev: Decimal,
}

/// Estimate expected value for entering at `entry_price`.
///
/// Monotone by construction: increasing in `aggregate_score` and
/// `agreement_ratio`, decreasing in `spread`.
pub fn estimate_ev(
    aggregate_score: Decimal,
    agreement_ratio: Decimal,
    entry_price: Decimal,
    spread: Decimal,
) -> EvEstimate {
    let vig = spread / Decimal::TWO;

    let signal_edge = aggregate_score * MAX_EDGE;
    // Full agreement earns the full edge, a split book only half
    let agreement_scaling = dec!(0.5) + dec!(0.5) * agreement_ratio;
    let estimated_edge = signal_edge * agreement_scaling;

    let estimated_win_prob = (entry_price + estimated_edge).clamp(MIN_WIN_PROB, MAX_WIN_PROB);

    let win_profit = Decimal::ONE - entry_price;
    let loss_amount = entry_price;
    let gross_ev = estimated_win_prob * win_profit
        - (Decimal::ONE - estimated_win_prob) * loss_amount;
    let net_ev = gross_ev - vig;

    EvEstimate {
        vig,
        estimated_edge,
        estimated_win_prob,
        gross_ev,
        net_ev,
    }
}
