//! Recommendation ranking
//!
//! Turns aggregated signals into ranked recommendations, keeping near
//! misses on a watchlist with explicit rejection reasons.

use crate::config::RankerConfig;
use crate::market::MarketSnapshot;
use crate::signal::{AggregatedSignal, Contract};
use crate::strategy::ev::estimate_ev;
use crate::strategy::sizing::PositionSizer;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Risk flag attached to a recommendation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskFlag {
    /// Liquidity score below 0.3
    LowLiquidity,
    /// Spread wider than 5 cents
    WideSpread,
    /// Only one contributing signal
    SingleSignal,
    /// Contributing signals agree below 70%
    SignalDisagreement,
    /// Under 30 minutes to resolution
    NearResolution,
    /// Existing same-direction position on the same event
    CorrelatedPosition,
    /// Existing opposite-direction position on the same event
    OppositePositionExists,
    /// Portfolio limit violation description
    LimitViolation(String),
}

/// Final actionable output delivered to the operator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub market_id: String,
    pub event_id: String,
    /// Contract side to buy
    pub contract: Contract,
    /// Ask price for the chosen side
    pub entry_price: Decimal,
    /// Maximum size in contracts; may be reduced by the portfolio layer
    pub max_size: u32,
    /// Net expected value per dollar staked
    pub expected_value: Decimal,
    /// Aggregate confidence in [0, 1]
    pub confidence: Decimal,
    /// Composite ranking score
    pub rank_score: Decimal,
    /// Names of contributing signal generators
    pub contributing_signals: Vec<String>,
    /// Risk flags for operator review
    pub risk_flags: Vec<RiskFlag>,
    /// Seconds to resolution, if known
    pub time_to_resolution: Option<i64>,
    /// Display context
    pub league: String,
    pub matchup: String,
    pub market_title: String,
}

/// An evaluated opportunity, recommended or not.
///
/// Near misses are retained with their rejection reasons so operators can
/// see why nothing cleared the bar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateOpportunity {
    pub market_id: String,
    pub event_id: String,
    pub contract: Contract,
    pub entry_price: Decimal,
    pub expected_value: Decimal,
    pub confidence: Decimal,
    pub rank_score: Decimal,
    pub contributing_signals: Vec<String>,
    /// Why the candidate missed; empty means recommended
    pub rejection_reasons: Vec<String>,
    pub risk_flags: Vec<RiskFlag>,
    pub time_to_resolution: Option<i64>,
    pub league: String,
    pub matchup: String,
}

impl CandidateOpportunity {
    /// True when the candidate cleared every threshold
    pub fn is_recommended(&self) -> bool {
        self.rejection_reasons.is_empty()
    }
}

/// Ranks and filters aggregated signals into recommendations and a watchlist
pub struct RecommendationRanker {
    config: RankerConfig,
    sizer: PositionSizer,
}

impl RecommendationRanker {
    /// Create a ranker from configuration and a position sizer
    pub fn new(config: RankerConfig, sizer: PositionSizer) -> Self {
        Self { config, sizer }
    }

    /// Rank aggregated signals, returning recommendations and watchlist.
    ///
    /// Recommendations are sorted by rank score and truncated to the
    /// configured cap; the watchlist is sorted but unbounded. Markets with
    /// no snapshot are skipped; absent data is no signal.
    pub fn rank_all(
        &self,
        aggregated: &[AggregatedSignal],
        market_data: &BTreeMap<String, &MarketSnapshot>,
    ) -> (Vec<Recommendation>, Vec<CandidateOpportunity>) {
        let mut recommendations = Vec::new();
        let mut watchlist = Vec::new();

        for agg in aggregated {
            let Some(snapshot) = market_data.get(&agg.market_id) else {
                tracing::debug!(market_id = %agg.market_id, "no snapshot for aggregate, skipping");
                continue;
            };

            let entry_price = snapshot.ask_for(agg.direction);
            let spread = snapshot.spread();
            let ev = estimate_ev(
                agg.aggregate_score,
                agg.agreement_ratio(),
                entry_price,
                spread,
            );

            let mut rejection_reasons = Vec::new();
            if ev.net_ev < self.config.min_ev {
                rejection_reasons.push(format!(
                    "EV below threshold ({:.1}% < {:.1}%)",
                    ev.net_ev * dec!(100),
                    self.config.min_ev * dec!(100),
                ));
            }
            if agg.confidence < self.config.min_confidence {
                rejection_reasons.push(format!(
                    "Confidence below threshold ({:.0}% < {:.0}%)",
                    agg.confidence * dec!(100),
                    self.config.min_confidence * dec!(100),
                ));
            }

            let liquidity = snapshot.feature_or("liquidity_score", dec!(0.5));
            let max_size = self.sizer.calculate(
                agg.confidence,
                entry_price,
                liquidity,
                snapshot.time_to_resolution,
                Some(snapshot.depth_for(agg.direction)),
                None,
            );

            let rank_score = self.rank_score(ev.net_ev, agg.confidence, liquidity, snapshot);
            let risk_flags = identify_risks(agg, snapshot, liquidity);
            let contributing: Vec<String> = agg
                .contributing_signals
                .iter()
                .map(|s| s.name.clone())
                .collect();

            if rejection_reasons.is_empty() {
                recommendations.push(Recommendation {
                    market_id: agg.market_id.clone(),
                    event_id: snapshot.event_id.clone(),
                    contract: agg.direction,
                    entry_price,
                    max_size,
                    expected_value: ev.net_ev,
                    confidence: agg.confidence,
                    rank_score,
                    contributing_signals: contributing,
                    risk_flags,
                    time_to_resolution: snapshot.time_to_resolution,
                    league: snapshot.league.clone(),
                    matchup: snapshot.matchup.clone(),
                    market_title: snapshot.title.clone(),
                });
            } else {
                watchlist.push(CandidateOpportunity {
                    market_id: agg.market_id.clone(),
                    event_id: snapshot.event_id.clone(),
                    contract: agg.direction,
                    entry_price,
                    expected_value: ev.net_ev,
                    confidence: agg.confidence,
                    rank_score,
                    contributing_signals: contributing,
                    rejection_reasons,
                    risk_flags,
                    time_to_resolution: snapshot.time_to_resolution,
                    league: snapshot.league.clone(),
                    matchup: snapshot.matchup.clone(),
                });
            }
        }

        recommendations.sort_by(|a, b| b.rank_score.cmp(&a.rank_score));
        recommendations.truncate(self.config.max_recommendations);
        watchlist.sort_by(|a, b| b.rank_score.cmp(&a.rank_score));

        (recommendations, watchlist)
    }

    /// Composite ranking score: EV, confidence, liquidity, and kickoff
    /// proximity, weighted per configuration
    fn rank_score(
        &self,
        net_ev: Decimal,
        confidence: Decimal,
        liquidity: Decimal,
        snapshot: &MarketSnapshot,
    ) -> Decimal {
        // 10% EV saturates the EV component
        let ev_score = (net_ev / dec!(0.10)).min(Decimal::ONE);

        let time_to_kickoff = snapshot.time_to_kickoff.unwrap_or(86_400);
        // Imminent kickoffs score higher on a two-hour scale
        let timing_score = (Decimal::ONE
            - Decimal::from(time_to_kickoff) / dec!(7200))
        .max(Decimal::ZERO);

        self.config.ev_weight * ev_score
            + self.config.confidence_weight * confidence
            + self.config.liquidity_weight * liquidity
            + self.config.timing_weight * timing_score
    }
}

/// Derive risk flags for an evaluated opportunity
fn identify_risks(
    agg: &AggregatedSignal,
    snapshot: &MarketSnapshot,
    liquidity: Decimal,
) -> Vec<RiskFlag> {
    let mut risks = Vec::new();

    if liquidity < dec!(0.3) {
        risks.push(RiskFlag::LowLiquidity);
    }
    if snapshot.spread() > dec!(0.05) {
        risks.push(RiskFlag::WideSpread);
    }
    if agg.signal_count() == 1 {
        risks.push(RiskFlag::SingleSignal);
    }
    if agg.agreement_ratio() < dec!(0.7) {
        risks.push(RiskFlag::SignalDisagreement);
    }
    if snapshot.time_to_resolution.unwrap_or(86_400) < 1800 {
        risks.push(RiskFlag::NearResolution);
    }

    risks
}
