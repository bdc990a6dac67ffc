//! Backtesting module
//!
//! Chronological replay with look-ahead protection, probabilistic fill
//! simulation, and performance metrics

mod fills;
mod metrics;
mod scenarios;
mod simulator;

pub use fills::{estimate_market_impact, Fill, FillModel, SlippageModel};
pub use metrics::{calculate_drawdown, compute_metrics, BacktestMetrics, EquityPoint};
pub use scenarios::{compare_results, standard_scenarios, Scenario, ScenarioResult, ScenarioRunner};
pub use simulator::{BacktestSimulator, BacktestState, Position};

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Fatal backtest errors
#[derive(Debug, Error)]
pub enum BacktestError {
    /// Snapshots arrived out of temporal order.
    ///
    /// Processing data out of order would let the strategy see the future;
    /// the run must abort rather than continue.
    #[error("Look-ahead bias: snapshot at {current} precedes previously seen {previous}")]
    LookAheadBias {
        previous: DateTime<Utc>,
        current: DateTime<Utc>,
    },
}
