//! Signal generator interface
//!
//! Generators turn a snapshot plus computed features into at most one
//! directional [`Signal`]. The production heuristic suite lives outside this
//! crate; one reference generator ships here so the pipeline and backtest
//! are exercisable end to end.

use super::{Direction, Signal};
use crate::market::MarketSnapshot;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::BTreeMap;

/// Trait for signal generator implementations
pub trait SignalGenerator: Send + Sync {
    /// Generator name, used for weighting and reporting
    fn name(&self) -> &str;

    /// Generate a signal from a snapshot and its computed features.
    ///
    /// `Ok(None)` means no opportunity; `Err` is an internal generator
    /// failure, which callers isolate per generator rather than propagate.
    fn generate(
        &self,
        snapshot: &MarketSnapshot,
        features: &BTreeMap<String, Decimal>,
    ) -> anyhow::Result<Option<Signal>>;
}

/// Build the configured generator set.
///
/// Construction is explicit: the set is assembled here at startup rather
/// than collected through registration side effects.
pub fn build_generators() -> Vec<Box<dyn SignalGenerator>> {
    vec![Box::new(LateKickoffVol::default())]
}

/// Exploits fragile pricing near kickoff.
///
/// Fires when volatility spikes and the book shows a clear depth imbalance
/// inside the final pre-kickoff window. Direction follows the imbalance:
/// bid-heavy books lean Yes.
#[derive(Debug, Clone)]
pub struct LateKickoffVol {
    /// Minimum ratio of short- to long-horizon volatility
    pub volatility_ratio_threshold: Decimal,
    /// Only fire inside this many seconds before kickoff
    pub max_time_to_kickoff: i64,
    /// Minimum absolute depth imbalance
    pub min_imbalance: Decimal,
    /// Liquidity score below which confidence is discounted
    pub liquidity_warning: Decimal,
}

impl Default for LateKickoffVol {
    fn default() -> Self {
        Self {
            volatility_ratio_threshold: dec!(1.5),
            max_time_to_kickoff: 600,
            min_imbalance: dec!(0.3),
            liquidity_warning: dec!(0.3),
        }
    }
}

impl SignalGenerator for LateKickoffVol {
    fn name(&self) -> &str {
        "late_kickoff_vol"
    }

    fn generate(
        &self,
        snapshot: &MarketSnapshot,
        features: &BTreeMap<String, Decimal>,
    ) -> anyhow::Result<Option<Signal>> {
        let Some(time_to_kickoff) = snapshot.time_to_kickoff else {
            return Ok(None);
        };
        // Already live, or too far out
        if time_to_kickoff < 0 || time_to_kickoff > self.max_time_to_kickoff {
            return Ok(None);
        }

        let volatility_ratio = features
            .get("volatility_ratio")
            .copied()
            .unwrap_or(Decimal::ONE);
        let depth_imbalance = features
            .get("depth_imbalance")
            .copied()
            .unwrap_or(Decimal::ZERO);
        let liquidity = features
            .get("liquidity_score")
            .copied()
            .unwrap_or(dec!(0.5));

        if volatility_ratio < self.volatility_ratio_threshold {
            return Ok(None);
        }
        if depth_imbalance.abs() < self.min_imbalance {
            return Ok(None);
        }

        let direction = if depth_imbalance > Decimal::ZERO {
            Direction::Yes
        } else {
            Direction::No
        };

        let strength = ((volatility_ratio - Decimal::ONE) / Decimal::TWO).min(Decimal::ONE);
        let mut confidence = depth_imbalance.abs();
        if liquidity < self.liquidity_warning {
            confidence *= dec!(0.7);
        }

        let rationale = format!(
            "Late kickoff vol: {}min to kickoff, vol_ratio={volatility_ratio:.2}, imbalance={depth_imbalance:.2}",
            time_to_kickoff / 60,
        );

        Ok(Some(Signal::new(
            self.name(),
            direction,
            strength,
            confidence,
            rationale,
            snapshot.market_id.clone(),
            snapshot.timestamp,
            ["volatility_ratio", "depth_imbalance", "liquidity_score"]
                .into_iter()
                .map(String::from)
                .collect(),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::Contract;
    use chrono::Utc;

    fn make_snapshot(time_to_kickoff: Option<i64>) -> MarketSnapshot {
        MarketSnapshot {
            market_id: "MKT-1".to_string(),
            event_id: "EVT-1".to_string(),
            league: "NFL".to_string(),
            matchup: String::new(),
            title: String::new(),
            timestamp: Utc::now(),
            best_bid: dec!(0.45),
            best_ask: dec!(0.48),
            bid_depth: dec!(800),
            ask_depth: dec!(1200),
            volume_1h: dec!(100),
            volume_24h: dec!(1000),
            time_to_kickoff,
            time_to_resolution: Some(14400),
            features: BTreeMap::new(),
            recent_trades: vec![],
            settled: None,
        }
    }

    fn features(vol_ratio: Decimal, imbalance: Decimal, liquidity: Decimal) -> BTreeMap<String, Decimal> {
        BTreeMap::from([
            ("volatility_ratio".to_string(), vol_ratio),
            ("depth_imbalance".to_string(), imbalance),
            ("liquidity_score".to_string(), liquidity),
        ])
    }

    #[test]
    fn test_fires_on_spike_with_imbalance() {
        let gen = LateKickoffVol::default();
        let snapshot = make_snapshot(Some(300));
        let signal = gen
            .generate(&snapshot, &features(dec!(2.0), dec!(0.5), dec!(0.8)))
            .unwrap()
            .unwrap();
        assert_eq!(signal.direction.as_contract(), Some(Contract::Yes));
        assert_eq!(signal.strength, dec!(0.5));
        assert_eq!(signal.confidence, dec!(0.5));
        assert_eq!(signal.features_used.len(), 3);
    }

    #[test]
    fn test_negative_imbalance_leans_no() {
        let gen = LateKickoffVol::default();
        let snapshot = make_snapshot(Some(300));
        let signal = gen
            .generate(&snapshot, &features(dec!(2.0), dec!(-0.5), dec!(0.8)))
            .unwrap()
            .unwrap();
        assert_eq!(signal.direction.as_contract(), Some(Contract::No));
    }

    #[test]
    fn test_silent_when_live_or_far_out() {
        let gen = LateKickoffVol::default();
        let feats = features(dec!(2.0), dec!(0.5), dec!(0.8));
        assert!(gen
            .generate(&make_snapshot(Some(-60)), &feats)
            .unwrap()
            .is_none());
        assert!(gen
            .generate(&make_snapshot(Some(7200)), &feats)
            .unwrap()
            .is_none());
        assert!(gen.generate(&make_snapshot(None), &feats).unwrap().is_none());
    }

    #[test]
    fn test_silent_without_volatility_spike() {
        let gen = LateKickoffVol::default();
        let snapshot = make_snapshot(Some(300));
        assert!(gen
            .generate(&snapshot, &features(dec!(1.1), dec!(0.5), dec!(0.8)))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_low_liquidity_discounts_confidence() {
        let gen = LateKickoffVol::default();
        let snapshot = make_snapshot(Some(300));
        let signal = gen
            .generate(&snapshot, &features(dec!(2.0), dec!(0.5), dec!(0.1)))
            .unwrap()
            .unwrap();
        assert_eq!(signal.confidence, dec!(0.35));
    }

    #[test]
    fn test_build_generators_is_nonempty() {
        let generators = build_generators();
        assert!(!generators.is_empty());
        assert_eq!(generators[0].name(), "late_kickoff_vol");
    }
}
