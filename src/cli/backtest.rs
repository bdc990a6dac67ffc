//! Backtest command implementation

use crate::backtest::{BacktestSimulator, FillModel};
use crate::config::Config;
use crate::features::default_registry;
use crate::market::load_snapshots;
use crate::signal::{build_generators, SignalAggregator};
use crate::strategy::{PortfolioManager, PositionSizer, RecommendationRanker};
use chrono::{DateTime, Utc};
use clap::Args;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rust_decimal::Decimal;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct BacktestArgs {
    /// JSON-lines file of chronological market snapshots
    #[arg(long, default_value = "./snapshots.jsonl")]
    pub snapshots: PathBuf,

    /// Start time filter (RFC 3339)
    #[arg(long)]
    pub start: Option<DateTime<Utc>>,

    /// End time filter (RFC 3339)
    #[arg(long)]
    pub end: Option<DateTime<Utc>>,

    /// Initial capital
    #[arg(long)]
    pub capital: Option<Decimal>,

    /// Random seed for the fill model
    #[arg(long)]
    pub seed: Option<u64>,
}

impl BacktestArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let snapshots = load_snapshots(&self.snapshots)?;
        tracing::info!(count = snapshots.len(), "loaded snapshots");

        let mut backtest = config.backtest.clone();
        if self.start.is_some() {
            backtest.start_date = self.start;
        }
        if self.end.is_some() {
            backtest.end_date = self.end;
        }
        if let Some(capital) = self.capital {
            backtest.initial_capital = capital;
        }
        let seed = self.seed.unwrap_or(backtest.random_seed);

        let mut simulator = BacktestSimulator::new(
            backtest,
            FillModel::default(),
            SignalAggregator::new(config.aggregator.clone()),
            RecommendationRanker::new(
                config.ranker.clone(),
                PositionSizer::new(config.sizing.clone()),
            ),
            PortfolioManager::new(config.portfolio.clone()),
        );

        let registry = default_registry();
        let generators = build_generators();
        let mut rng = StdRng::seed_from_u64(seed);

        let metrics = simulator.run(snapshots, &generators, &registry, &mut rng)?;
        println!("{}", metrics.format_table());

        Ok(())
    }
}
