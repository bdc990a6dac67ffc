//! Backtest replay engine
//!
//! Replays historical snapshots chronologically through the same decision
//! path used live, simulating execution with the fill model. Temporal
//! order is a correctness invariant: any timestamp regression aborts the
//! run as look-ahead bias.

use super::fills::{Fill, FillModel};
use super::metrics::{compute_metrics, BacktestMetrics, EquityPoint};
use super::BacktestError;
use crate::config::BacktestConfig;
use crate::features::FeatureRegistry;
use crate::market::MarketSnapshot;
use crate::signal::{Contract, SignalAggregator, SignalGenerator};
use crate::strategy::{
    generate_signals, PortfolioManager, PortfolioPosition, RecommendationRanker,
};
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Annual risk-free rate used for Sharpe/Sortino
const RISK_FREE_RATE: f64 = 0.02;

/// Smallest order worth simulating, in contracts
const MIN_ORDER_SIZE: u32 = 10;

/// An open or settled backtest position
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub id: Uuid,
    pub market_id: String,
    pub direction: Contract,
    pub size: u32,
    pub entry_price: Decimal,
    pub entry_time: DateTime<Utc>,
    pub exit_price: Option<Decimal>,
    pub exit_time: Option<DateTime<Utc>>,
}

impl Position {
    /// Open a new position
    pub fn open(
        market_id: impl Into<String>,
        direction: Contract,
        size: u32,
        entry_price: Decimal,
        entry_time: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            market_id: market_id.into(),
            direction,
            size,
            entry_price,
            entry_time,
            exit_price: None,
            exit_time: None,
        }
    }

    /// Close the position at a price and time
    pub fn close(&mut self, exit_price: Decimal, exit_time: DateTime<Utc>) {
        self.exit_price = Some(exit_price);
        self.exit_time = Some(exit_time);
    }

    /// Whether the position has settled
    pub fn is_closed(&self) -> bool {
        self.exit_price.is_some()
    }

    /// Realized P&L; `None` while the position is open
    pub fn pnl(&self) -> Option<Decimal> {
        let exit = self.exit_price?;
        let size = Decimal::from(self.size);
        Some(match self.direction {
            Contract::Yes => (exit - self.entry_price) * size,
            Contract::No => (self.entry_price - exit) * size,
        })
    }
}

/// Mutable state of a backtest run
#[derive(Debug, Clone, Default)]
pub struct BacktestState {
    /// Cash capital
    pub capital: Decimal,
    /// Open positions
    pub positions: Vec<Position>,
    /// Settled positions
    pub closed_positions: Vec<Position>,
    /// Every simulated fill
    pub fills: Vec<Fill>,
}

impl BacktestState {
    /// Current equity.
    ///
    /// Equals cash capital: open binary positions are not marked to market,
    /// since thin, wide-spread quotes would inject noise into the curve.
    /// Settlement realizes their value instead.
    pub fn equity(&self) -> Decimal {
        self.capital
    }

    /// Total realized P&L
    pub fn total_pnl(&self) -> Decimal {
        self.closed_positions
            .iter()
            .filter_map(|p| p.pnl())
            .sum()
    }
}

/// Chronological replay engine.
///
/// Each snapshot passes through settle -> signal -> execute -> record. The
/// simulator owns its portfolio and strategy components; independent
/// scenario runs each construct their own instance.
pub struct BacktestSimulator {
    config: BacktestConfig,
    fill_model: FillModel,
    aggregator: SignalAggregator,
    ranker: RecommendationRanker,
    portfolio: PortfolioManager,
    state: BacktestState,
    equity_curve: Vec<EquityPoint>,
    last_timestamp: Option<DateTime<Utc>>,
}

impl BacktestSimulator {
    /// Create a simulator from its components
    pub fn new(
        config: BacktestConfig,
        fill_model: FillModel,
        aggregator: SignalAggregator,
        ranker: RecommendationRanker,
        portfolio: PortfolioManager,
    ) -> Self {
        let state = BacktestState {
            capital: config.initial_capital,
            ..BacktestState::default()
        };
        Self {
            config,
            fill_model,
            aggregator,
            ranker,
            portfolio,
            state,
            equity_curve: Vec::new(),
            last_timestamp: None,
        }
    }

    /// Final run state
    pub fn state(&self) -> &BacktestState {
        &self.state
    }

    /// Recorded equity curve
    pub fn equity_curve(&self) -> &[EquityPoint] {
        &self.equity_curve
    }

    /// Replay snapshots through the decision path.
    ///
    /// Snapshots must arrive in non-decreasing timestamp order; a
    /// regression aborts with [`BacktestError::LookAheadBias`]. The random
    /// source is injected so identical seeds reproduce identical runs.
    pub fn run<I>(
        &mut self,
        snapshots: I,
        generators: &[Box<dyn SignalGenerator>],
        registry: &FeatureRegistry,
        rng: &mut StdRng,
    ) -> Result<BacktestMetrics, BacktestError>
    where
        I: IntoIterator<Item = MarketSnapshot>,
    {
        tracing::info!(
            start = ?self.config.start_date,
            end = ?self.config.end_date,
            capital = %self.config.initial_capital,
            "starting backtest"
        );
        self.portfolio.clear();

        for snapshot in snapshots {
            let timestamp = snapshot.timestamp;

            if let Some(previous) = self.last_timestamp {
                if timestamp < previous {
                    return Err(BacktestError::LookAheadBias {
                        previous,
                        current: timestamp,
                    });
                }
            }
            self.last_timestamp = Some(timestamp);

            if let Some(start) = self.config.start_date {
                if timestamp < start {
                    continue;
                }
            }
            if let Some(end) = self.config.end_date {
                if timestamp > end {
                    break;
                }
            }

            self.check_settlements(&snapshot);

            // A settled market is terminal; nothing left to trade
            if snapshot.settled.is_some() {
                self.equity_curve.push(EquityPoint {
                    timestamp,
                    equity: self.state.equity(),
                });
                continue;
            }

            // Signal generators only ever see the sanitized view
            let sanitized = snapshot.point_in_time();
            let signals = generate_signals(&sanitized, registry, generators);
            if !signals.is_empty() {
                if let Some(aggregated) = self.aggregator.aggregate(&signals) {
                    let market_data: BTreeMap<String, &MarketSnapshot> =
                        BTreeMap::from([(sanitized.market_id.clone(), &sanitized)]);
                    let (recommendations, _) =
                        self.ranker.rank_all(&[aggregated], &market_data);
                    let recommendations =
                        self.portfolio.adjust_for_correlation(recommendations);
                    for recommendation in recommendations {
                        self.execute(&recommendation, &sanitized, rng);
                    }
                }
            }

            self.equity_curve.push(EquityPoint {
                timestamp,
                equity: self.state.equity(),
            });
        }

        let metrics = compute_metrics(
            &self.equity_curve,
            &self.state.closed_positions,
            self.config.initial_capital,
            RISK_FREE_RATE,
        );
        tracing::info!(
            trades = metrics.total_trades,
            total_return = metrics.total_return,
            "backtest complete"
        );
        Ok(metrics)
    }

    /// Settle open positions for a resolved market.
    ///
    /// Winners pay out at 1.00 per contract, losers at zero.
    fn check_settlements(&mut self, snapshot: &MarketSnapshot) {
        let Some(outcome) = snapshot.settled else {
            return;
        };

        let mut still_open = Vec::with_capacity(self.state.positions.len());
        for mut position in std::mem::take(&mut self.state.positions) {
            if position.market_id != snapshot.market_id {
                still_open.push(position);
                continue;
            }

            let won = position.direction == outcome;
            let exit_price = if won { Decimal::ONE } else { Decimal::ZERO };
            position.close(exit_price, snapshot.timestamp);

            if won {
                self.state.capital += Decimal::from(position.size);
            }
            tracing::debug!(
                market_id = %position.market_id,
                direction = %position.direction,
                won,
                "position settled"
            );
            self.state.closed_positions.push(position);
        }
        self.state.positions = still_open;
        self.portfolio.release_market(&snapshot.market_id);
    }

    /// Simulate execution of one recommendation
    fn execute(
        &mut self,
        recommendation: &crate::strategy::Recommendation,
        snapshot: &MarketSnapshot,
        rng: &mut StdRng,
    ) {
        let capital_cap = (self.state.capital * self.config.max_position_pct)
            .to_u32()
            .unwrap_or(0);
        let size = recommendation.max_size.min(capital_cap);
        if size < MIN_ORDER_SIZE {
            return;
        }

        let volatility = snapshot.feature_or("volatility", dec!(0.01));
        let Some(fill) = self.fill_model.simulate_fill(
            rng,
            recommendation.contract,
            size,
            snapshot.mid_price(),
            snapshot.depth_for(recommendation.contract),
            volatility,
            snapshot.spread(),
        ) else {
            return;
        };

        let mut cost = Decimal::from(fill.filled_size) * fill.avg_price;
        if self.config.include_fees {
            cost += Decimal::from(fill.filled_size) * self.config.fee_per_contract;
        }

        self.state.capital -= cost;
        self.portfolio.add_position(PortfolioPosition {
            market_id: snapshot.market_id.clone(),
            event_id: snapshot.event_id.clone(),
            league: snapshot.league.clone(),
            direction: recommendation.contract,
            size: fill.filled_size,
            entry_price: fill.avg_price,
        });
        self.state.positions.push(Position::open(
            snapshot.market_id.clone(),
            recommendation.contract,
            fill.filled_size,
            fill.avg_price,
            snapshot.timestamp,
        ));
        self.state.fills.push(fill);
    }
}
