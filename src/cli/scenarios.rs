//! Scenarios command implementation

use crate::backtest::{standard_scenarios, ScenarioRunner};
use crate::config::Config;
use crate::features::default_registry;
use crate::market::load_snapshots;
use crate::signal::build_generators;
use clap::Args;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct ScenariosArgs {
    /// JSON-lines file of chronological market snapshots
    #[arg(long, default_value = "./snapshots.jsonl")]
    pub snapshots: PathBuf,

    /// Run scenarios sequentially instead of in parallel
    #[arg(long)]
    pub sequential: bool,
}

impl ScenariosArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let snapshots = load_snapshots(&self.snapshots)?;
        tracing::info!(count = snapshots.len(), "loaded snapshots");

        let loader = move |start: chrono::DateTime<chrono::Utc>, end: chrono::DateTime<chrono::Utc>| {
            snapshots
                .iter()
                .filter(|s| s.timestamp >= start && s.timestamp <= end)
                .cloned()
                .collect::<Vec<_>>()
        };
        let runner = ScenarioRunner::new(loader, config.clone(), config.backtest.random_seed);

        let scenarios = standard_scenarios();
        let generators = build_generators();
        let registry = default_registry();

        let results = if self.sequential {
            runner.run_all(&scenarios, &generators, &registry)
        } else {
            runner.run_all_parallel(&scenarios, &generators, &registry)
        };

        println!(
            "{:<14} {:>10} {:>8} {:>8} {:>7} {:>9}",
            "scenario", "return", "sharpe", "max_dd", "trades", "hit_rate"
        );
        for result in &results {
            let m = &result.metrics;
            println!(
                "{:<14} {:>9.2}% {:>8.2} {:>7.2}% {:>7} {:>8.1}%",
                result.scenario.name,
                m.total_return * 100.0,
                m.sharpe_ratio,
                m.max_drawdown * 100.0,
                m.total_trades,
                m.hit_rate * 100.0,
            );
            for error in &result.errors {
                println!("  error: {error}");
            }
        }

        Ok(())
    }
}
