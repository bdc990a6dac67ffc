//! Order-flow features with declared fallbacks
//!
//! Trade-level data is often absent for thin sports markets, so flow
//! features carry an explicit fallback computation selected by an
//! availability check rather than by error handling.

use crate::market::MarketSnapshot;
use crate::signal::Contract;
use rust_decimal::Decimal;

type AvailabilityFn = Box<dyn Fn(&MarketSnapshot) -> bool + Send + Sync>;
type ComputeFn = Box<dyn Fn(&MarketSnapshot) -> Option<Decimal> + Send + Sync>;

/// A feature with a primary data-backed computation and a declared fallback.
///
/// The availability check decides which tier runs; the fallback is a
/// documented proxy, not a silent exception path.
pub struct TieredFeature {
    name: &'static str,
    available: AvailabilityFn,
    primary: ComputeFn,
    fallback: ComputeFn,
}

impl TieredFeature {
    /// Construct a two-tier feature
    pub fn new(
        name: &'static str,
        available: AvailabilityFn,
        primary: ComputeFn,
        fallback: ComputeFn,
    ) -> Self {
        Self {
            name,
            available,
            primary,
            fallback,
        }
    }

    /// Feature name
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether the primary tier has the data it needs
    pub fn primary_available(&self, snapshot: &MarketSnapshot) -> bool {
        (self.available)(snapshot)
    }

    /// Compute the feature, selecting the tier by availability
    pub fn compute(&self, snapshot: &MarketSnapshot) -> Option<Decimal> {
        if self.primary_available(snapshot) {
            (self.primary)(snapshot)
        } else {
            (self.fallback)(snapshot)
        }
    }
}

/// Signed taker-flow imbalance in [-1, 1].
///
/// Primary: net Yes-taker volume over total traded volume in the recent
/// trade window. Fallback when no trades are available: resting depth
/// imbalance as a proxy for directional pressure.
pub fn trade_flow_imbalance() -> TieredFeature {
    TieredFeature::new(
        "trade_flow_imbalance",
        Box::new(|snapshot| !snapshot.recent_trades.is_empty()),
        Box::new(|snapshot| {
            let mut signed = Decimal::ZERO;
            let mut total = Decimal::ZERO;
            for trade in &snapshot.recent_trades {
                let size = Decimal::from(trade.size);
                total += size;
                match trade.taker_side {
                    Contract::Yes => signed += size,
                    Contract::No => signed -= size,
                }
            }
            if total == Decimal::ZERO {
                return None;
            }
            Some(signed / total)
        }),
        Box::new(|snapshot| Some(snapshot.depth_imbalance())),
    )
}
