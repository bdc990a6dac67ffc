//! Decision pipeline
//!
//! Drives signal generation, aggregation, ranking, and portfolio
//! adjustment over a snapshot batch, recording counts at every stage so a
//! zero-recommendation cycle is still diagnosable.

use crate::features::FeatureRegistry;
use crate::market::MarketSnapshot;
use crate::signal::{Signal, SignalAggregator, SignalGenerator};
use crate::strategy::portfolio::PortfolioManager;
use crate::strategy::ranker::{CandidateOpportunity, Recommendation, RecommendationRanker};
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// Counts at each stage of the decision funnel
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Snapshots inspected this cycle
    pub markets_seen: usize,
    /// Markets per league
    pub markets_by_league: BTreeMap<String, usize>,
    /// Signals produced across all generators
    pub signals_generated: usize,
    /// Signals per generator name
    pub signals_by_type: BTreeMap<String, usize>,
    /// Markets with at least one signal
    pub markets_with_signals: usize,
    /// Markets that produced an actionable aggregate
    pub markets_aggregated: usize,
    /// Signal-bearing markets dropped at aggregation
    pub aggregation_dropoff: usize,
    /// Candidates evaluated by the ranker
    pub candidates_evaluated: usize,
    /// Candidates rejected on expected value
    pub filtered_by_ev: usize,
    /// Candidates rejected on confidence
    pub filtered_by_confidence: usize,
    /// Recommendations before portfolio checks
    pub recommended: usize,
    /// Near misses routed to the watchlist
    pub watchlisted: usize,
    /// Recommendations surviving exposure and correlation checks
    pub survived_portfolio: usize,
}

impl PipelineStats {
    /// Funnel rows for operator display, top to bottom
    pub fn funnel(&self) -> Vec<(&'static str, usize)> {
        vec![
            ("markets seen", self.markets_seen),
            ("signals generated", self.signals_generated),
            ("markets aggregated", self.markets_aggregated),
            ("candidates evaluated", self.candidates_evaluated),
            ("recommended", self.recommended),
            ("survived portfolio", self.survived_portfolio),
        ]
    }
}

/// Output of one pipeline cycle
#[derive(Debug, Clone, Default)]
pub struct PipelineOutcome {
    /// Final recommendations, after portfolio adjustment
    pub recommendations: Vec<Recommendation>,
    /// Near misses with rejection reasons
    pub watchlist: Vec<CandidateOpportunity>,
    /// Decision-funnel counts
    pub stats: PipelineStats,
}

/// One-call decision pipeline over a snapshot batch
pub struct StrategyPipeline {
    aggregator: SignalAggregator,
    ranker: RecommendationRanker,
    portfolio: PortfolioManager,
}

impl StrategyPipeline {
    /// Assemble a pipeline from its stages
    pub fn new(
        aggregator: SignalAggregator,
        ranker: RecommendationRanker,
        portfolio: PortfolioManager,
    ) -> Self {
        Self {
            aggregator,
            ranker,
            portfolio,
        }
    }

    /// The portfolio accumulator, for callers recording executed trades
    pub fn portfolio_mut(&mut self) -> &mut PortfolioManager {
        &mut self.portfolio
    }

    /// Run one decision cycle.
    ///
    /// A cycle yielding zero recommendations is a valid outcome; the stats
    /// funnel explains where candidates fell out.
    pub fn run(
        &mut self,
        snapshots: &[MarketSnapshot],
        registry: &FeatureRegistry,
        generators: &[Box<dyn SignalGenerator>],
    ) -> PipelineOutcome {
        let mut stats = PipelineStats {
            markets_seen: snapshots.len(),
            ..PipelineStats::default()
        };
        for snapshot in snapshots {
            *stats
                .markets_by_league
                .entry(snapshot.league.clone())
                .or_insert(0) += 1;
        }

        // Stage 1: signal generation, isolated per generator
        let mut signals_by_market: BTreeMap<String, Vec<Signal>> = BTreeMap::new();
        for snapshot in snapshots {
            let signals = generate_signals(snapshot, registry, generators);
            if signals.is_empty() {
                continue;
            }
            for signal in &signals {
                *stats
                    .signals_by_type
                    .entry(signal.name.clone())
                    .or_insert(0) += 1;
            }
            stats.signals_generated += signals.len();
            signals_by_market.insert(snapshot.market_id.clone(), signals);
        }
        stats.markets_with_signals = signals_by_market.len();

        // Stage 2: aggregation
        let aggregated = self.aggregator.aggregate_batch(&signals_by_market);
        stats.markets_aggregated = aggregated.len();
        stats.aggregation_dropoff = stats.markets_with_signals - aggregated.len();

        // Stage 3: ranking
        let market_data: BTreeMap<String, &MarketSnapshot> = snapshots
            .iter()
            .map(|s| (s.market_id.clone(), s))
            .collect();
        let (recommendations, watchlist) = self.ranker.rank_all(&aggregated, &market_data);
        stats.recommended = recommendations.len();
        stats.watchlisted = watchlist.len();
        stats.candidates_evaluated = recommendations.len() + watchlist.len();
        for candidate in &watchlist {
            if candidate
                .rejection_reasons
                .iter()
                .any(|r| r.starts_with("EV below threshold"))
            {
                stats.filtered_by_ev += 1;
            }
            if candidate
                .rejection_reasons
                .iter()
                .any(|r| r.starts_with("Confidence below threshold"))
            {
                stats.filtered_by_confidence += 1;
            }
        }

        // Stage 4: portfolio exposure and correlation
        let recommendations = self.portfolio.adjust_for_correlation(recommendations);
        stats.survived_portfolio = recommendations.len();

        tracing::info!(
            markets = stats.markets_seen,
            signals = stats.signals_generated,
            aggregated = stats.markets_aggregated,
            recommended = stats.survived_portfolio,
            watchlisted = stats.watchlisted,
            "pipeline cycle complete"
        );

        PipelineOutcome {
            recommendations,
            watchlist,
            stats,
        }
    }
}

/// Run every generator against one snapshot.
///
/// A generator failure is logged and skipped; it never aborts the batch.
pub fn generate_signals(
    snapshot: &MarketSnapshot,
    registry: &FeatureRegistry,
    generators: &[Box<dyn SignalGenerator>],
) -> Vec<Signal> {
    // Externally supplied feature values override computed ones
    let mut features: BTreeMap<String, Decimal> = registry.compute_all(snapshot);
    features.extend(snapshot.features.clone());

    let mut signals = Vec::new();
    for generator in generators {
        match generator.generate(snapshot, &features) {
            Ok(Some(signal)) => signals.push(signal),
            Ok(None) => {}
            Err(error) => {
                tracing::warn!(
                    generator = generator.name(),
                    market_id = %snapshot.market_id,
                    %error,
                    "signal generation failed, skipping generator"
                );
            }
        }
    }
    signals
}
