//! Signal aggregation
//!
//! Combines per-market signal sets into a single directional view with
//! correlation-aware confidence.

use super::{Contract, Direction, Signal};
use crate::config::AggregatorConfig;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::{BTreeMap, BTreeSet};

/// Combined signal from multiple generators for one market
#[derive(Debug, Clone)]
pub struct AggregatedSignal {
    /// Market the signals apply to
    pub market_id: String,
    /// Winning direction
    pub direction: Contract,
    /// Weighted average composite score of the winning side, in [0, 1]
    pub aggregate_score: Decimal,
    /// Agreement x mean confidence, discounted for feature correlation
    pub confidence: Decimal,
    /// Directional signals that fed the aggregate
    pub contributing_signals: Vec<Signal>,
    /// Weight applied per generator name
    pub weights_used: BTreeMap<String, Decimal>,
    /// Pairwise feature-set overlap (Jaccard) between contributing signals
    pub feature_correlations: BTreeMap<(String, String), Decimal>,
    /// Mean pairwise overlap across all contributing pairs
    pub avg_correlation: Decimal,
    /// Effective number of independent signals: n / (1 + (n-1) * avg_correlation)
    pub independent_signal_count: Decimal,
}

impl AggregatedSignal {
    /// Number of contributing signals
    pub fn signal_count(&self) -> usize {
        self.contributing_signals.len()
    }

    /// Fraction of contributing signals agreeing with the winning direction
    pub fn agreement_ratio(&self) -> Decimal {
        if self.contributing_signals.is_empty() {
            return Decimal::ZERO;
        }
        let agreeing = self
            .contributing_signals
            .iter()
            .filter(|s| s.direction == Direction::from(self.direction))
            .count();
        Decimal::from(agreeing) / Decimal::from(self.contributing_signals.len())
    }
}

/// Combines multiple signals into a single per-market view.
///
/// Direction is chosen by weighted composite score; confidence folds in
/// agreement and a penalty for feature overlap between generators, so that
/// five signals reading the same order-book feature do not count as five
/// independent opinions.
pub struct SignalAggregator {
    config: AggregatorConfig,
}

/// Maximum confidence discount applied for fully correlated signals
const CORRELATION_PENALTY: Decimal = dec!(0.3);

impl SignalAggregator {
    /// Create an aggregator from configuration
    pub fn new(config: AggregatorConfig) -> Self {
        Self { config }
    }

    /// Aggregate the signals for a single market.
    ///
    /// Returns `None` when there is nothing actionable: fewer than
    /// `min_signals` inputs, no directional signals, no strict winner, or
    /// agreement below the configured floor.
    pub fn aggregate(&self, signals: &[Signal]) -> Option<AggregatedSignal> {
        if signals.len() < self.config.min_signals {
            return None;
        }

        let directional: Vec<&Signal> = signals
            .iter()
            .filter(|s| s.direction.is_directional())
            .collect();
        if directional.is_empty() {
            return None;
        }

        let market_id = directional[0].market_id.clone();

        let mut yes_score = Decimal::ZERO;
        let mut no_score = Decimal::ZERO;
        let mut yes_weight = Decimal::ZERO;
        let mut no_weight = Decimal::ZERO;
        let mut weights_used = BTreeMap::new();

        for signal in &directional {
            let weight = self
                .config
                .weights
                .get(&signal.name)
                .copied()
                .unwrap_or(Decimal::ONE);
            let weighted_score = signal.composite_score() * weight;
            weights_used.insert(signal.name.clone(), weight);

            match signal.direction {
                Direction::Yes => {
                    yes_score += weighted_score;
                    yes_weight += weight;
                }
                Direction::No => {
                    no_score += weighted_score;
                    no_weight += weight;
                }
                Direction::Neutral => unreachable!("neutral signals filtered above"),
            }
        }

        // Strictly greater wins; a tie has no clear direction
        let (direction, aggregate_score) = if yes_score > no_score {
            (Contract::Yes, yes_score / yes_weight)
        } else if no_score > yes_score {
            (Contract::No, no_score / no_weight)
        } else {
            return None;
        };

        let agreeing = directional
            .iter()
            .filter(|s| s.direction == Direction::from(direction))
            .count();
        let agreement = Decimal::from(agreeing) / Decimal::from(directional.len());

        if self.config.require_agreement && agreement < self.config.min_agreement_ratio {
            return None;
        }

        let (feature_correlations, avg_correlation) = pairwise_correlations(&directional);
        let n = Decimal::from(directional.len());
        let independent_signal_count =
            n / (Decimal::ONE + (n - Decimal::ONE) * avg_correlation);

        let avg_confidence = directional
            .iter()
            .map(|s| s.confidence)
            .sum::<Decimal>()
            / n;
        let confidence =
            agreement * avg_confidence * (Decimal::ONE - CORRELATION_PENALTY * avg_correlation);

        Some(AggregatedSignal {
            market_id,
            direction,
            aggregate_score,
            confidence,
            contributing_signals: directional.into_iter().cloned().collect(),
            weights_used,
            feature_correlations,
            avg_correlation,
            independent_signal_count,
        })
    }

    /// Aggregate signals for multiple markets independently.
    ///
    /// Markets with no actionable aggregate are dropped silently.
    pub fn aggregate_batch(
        &self,
        signals_by_market: &BTreeMap<String, Vec<Signal>>,
    ) -> Vec<AggregatedSignal> {
        signals_by_market
            .values()
            .filter_map(|signals| self.aggregate(signals))
            .collect()
    }
}

/// Jaccard similarity between two feature sets; 0 when either is empty
fn feature_overlap(a: &BTreeSet<String>, b: &BTreeSet<String>) -> Decimal {
    if a.is_empty() || b.is_empty() {
        return Decimal::ZERO;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    Decimal::from(intersection) / Decimal::from(union)
}

/// Overlap for every unordered pair, plus the mean across pairs
fn pairwise_correlations(
    signals: &[&Signal],
) -> (BTreeMap<(String, String), Decimal>, Decimal) {
    let mut correlations = BTreeMap::new();
    let mut total = Decimal::ZERO;
    let mut pairs = 0u32;

    for i in 0..signals.len() {
        for j in (i + 1)..signals.len() {
            let overlap = feature_overlap(&signals[i].features_used, &signals[j].features_used);
            correlations.insert(
                (signals[i].name.clone(), signals[j].name.clone()),
                overlap,
            );
            total += overlap;
            pairs += 1;
        }
    }

    let avg = if pairs == 0 {
        Decimal::ZERO
    } else {
        total / Decimal::from(pairs)
    };
    (correlations, avg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn features(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn make_signal(name: &str, direction: Direction, feats: &[&str]) -> Signal {
        Signal::new(
            name,
            direction,
            dec!(0.8),
            dec!(0.8),
            "test",
            "MKT-1",
            Utc::now(),
            features(feats),
        )
    }

    fn aggregator(min_signals: usize) -> SignalAggregator {
        SignalAggregator::new(AggregatorConfig {
            min_signals,
            ..AggregatorConfig::default()
        })
    }

    #[test]
    fn test_rejects_below_min_signals() {
        let agg = aggregator(2);
        let signals = vec![make_signal("a", Direction::Yes, &["f1"])];
        assert!(agg.aggregate(&signals).is_none());
    }

    #[test]
    fn test_rejects_all_neutral() {
        let agg = aggregator(1);
        let signals = vec![
            make_signal("a", Direction::Neutral, &["f1"]),
            make_signal("b", Direction::Neutral, &["f2"]),
        ];
        assert!(agg.aggregate(&signals).is_none());
    }

    #[test]
    fn test_rejects_tie() {
        let agg = aggregator(1);
        let signals = vec![
            make_signal("a", Direction::Yes, &["f1"]),
            make_signal("b", Direction::No, &["f2"]),
        ];
        assert!(agg.aggregate(&signals).is_none());
    }

    #[test]
    fn test_direction_follows_weighted_score() {
        let agg = aggregator(1);
        let signals = vec![
            make_signal("a", Direction::Yes, &["f1"]),
            make_signal("b", Direction::Yes, &["f2"]),
            make_signal("c", Direction::No, &["f3"]),
        ];
        let result = agg.aggregate(&signals).unwrap();
        assert_eq!(result.direction, Contract::Yes);
        // Equal strengths: winning average equals the composite score
        assert_eq!(result.aggregate_score, dec!(0.64));
    }

    #[test]
    fn test_agreement_gate_rejects_even_split() {
        let agg = SignalAggregator::new(AggregatorConfig {
            min_signals: 1,
            require_agreement: true,
            min_agreement_ratio: dec!(0.6),
            ..AggregatorConfig::default()
        });
        // 2 YES at higher strength vs 2 NO: YES wins on score but
        // agreement is only 50%
        let mut yes_a = make_signal("a", Direction::Yes, &["f1"]);
        yes_a.strength = dec!(0.9);
        let mut yes_b = make_signal("b", Direction::Yes, &["f2"]);
        yes_b.strength = dec!(0.9);
        let signals = vec![
            yes_a,
            yes_b,
            make_signal("c", Direction::No, &["f3"]),
            make_signal("d", Direction::No, &["f4"]),
        ];
        assert!(agg.aggregate(&signals).is_none());
    }

    #[test]
    fn test_agreement_gate_accepts_three_to_one() {
        let agg = SignalAggregator::new(AggregatorConfig {
            min_signals: 1,
            require_agreement: true,
            min_agreement_ratio: dec!(0.6),
            ..AggregatorConfig::default()
        });
        let signals = vec![
            make_signal("a", Direction::Yes, &["f1"]),
            make_signal("b", Direction::Yes, &["f2"]),
            make_signal("c", Direction::Yes, &["f3"]),
            make_signal("d", Direction::No, &["f4"]),
        ];
        let result = agg.aggregate(&signals).unwrap();
        assert_eq!(result.direction, Contract::Yes);
        assert_eq!(result.agreement_ratio(), dec!(0.75));
    }

    #[test]
    fn test_fully_correlated_signals_collapse_to_one() {
        let agg = aggregator(1);
        let signals = vec![
            make_signal("a", Direction::Yes, &["f1", "f2"]),
            make_signal("b", Direction::Yes, &["f1", "f2"]),
        ];
        let result = agg.aggregate(&signals).unwrap();
        assert_eq!(result.avg_correlation, dec!(1));
        assert_eq!(result.independent_signal_count, dec!(1));
    }

    #[test]
    fn test_disjoint_signals_stay_independent() {
        let agg = aggregator(1);
        let signals = vec![
            make_signal("a", Direction::Yes, &["f1", "f2"]),
            make_signal("b", Direction::Yes, &["f3", "f4"]),
            make_signal("c", Direction::Yes, &["f5"]),
        ];
        let result = agg.aggregate(&signals).unwrap();
        assert_eq!(result.avg_correlation, dec!(0));
        assert_eq!(result.independent_signal_count, dec!(3));
    }

    #[test]
    fn test_correlation_discounts_confidence() {
        let agg = aggregator(1);
        let disjoint = vec![
            make_signal("a", Direction::Yes, &["f1"]),
            make_signal("b", Direction::Yes, &["f2"]),
        ];
        let overlapping = vec![
            make_signal("a", Direction::Yes, &["f1"]),
            make_signal("b", Direction::Yes, &["f1"]),
        ];
        let independent = agg.aggregate(&disjoint).unwrap();
        let correlated = agg.aggregate(&overlapping).unwrap();
        assert!(correlated.confidence < independent.confidence);
        // Full correlation: confidence = 1.0 * 0.8 * (1 - 0.3) = 0.56
        assert_eq!(correlated.confidence, dec!(0.56));
    }

    #[test]
    fn test_per_name_weights_can_flip_direction() {
        let agg = SignalAggregator::new(AggregatorConfig {
            min_signals: 1,
            weights: BTreeMap::from([("heavy".to_string(), dec!(3))]),
            ..AggregatorConfig::default()
        });
        let signals = vec![
            make_signal("heavy", Direction::No, &["f1"]),
            make_signal("a", Direction::Yes, &["f2"]),
            make_signal("b", Direction::Yes, &["f3"]),
        ];
        // NO: 0.64 * 3 = 1.92 beats YES: 0.64 * 2 = 1.28
        let result = agg.aggregate(&signals).unwrap();
        assert_eq!(result.direction, Contract::No);
        assert_eq!(result.weights_used["heavy"], dec!(3));
    }

    #[test]
    fn test_empty_feature_set_counts_as_uncorrelated() {
        let agg = aggregator(1);
        let signals = vec![
            make_signal("a", Direction::Yes, &[]),
            make_signal("b", Direction::Yes, &[]),
        ];
        let result = agg.aggregate(&signals).unwrap();
        assert_eq!(result.avg_correlation, dec!(0));
    }

    #[test]
    fn test_batch_drops_markets_without_output() {
        let agg = aggregator(2);
        let mut by_market = BTreeMap::new();
        by_market.insert(
            "MKT-1".to_string(),
            vec![
                make_signal("a", Direction::Yes, &["f1"]),
                make_signal("b", Direction::Yes, &["f2"]),
            ],
        );
        // Below min_signals: silently dropped
        by_market.insert(
            "MKT-2".to_string(),
            vec![make_signal("a", Direction::Yes, &["f1"])],
        );
        let results = agg.aggregate_batch(&by_market);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].market_id, "MKT-1");
    }
}
