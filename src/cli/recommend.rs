//! Recommend command implementation

use crate::config::Config;
use crate::features::default_registry;
use crate::market::{load_snapshots, SnapshotSource, StaticSource};
use crate::signal::{build_generators, SignalAggregator};
use crate::strategy::{
    PortfolioManager, PositionSizer, RecommendationRanker, StrategyPipeline,
};
use clap::Args;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct RecommendArgs {
    /// JSON-lines file of market snapshots
    #[arg(long, default_value = "./snapshots.jsonl")]
    pub snapshots: PathBuf,

    /// Also print the watchlist with rejection reasons
    #[arg(long)]
    pub watchlist: bool,
}

impl RecommendArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let mut source = StaticSource::single_batch(load_snapshots(&self.snapshots)?);
        let batch = source.next_batch().await?;
        tracing::info!(count = batch.len(), "loaded snapshot batch");

        let registry = default_registry();
        let generators = build_generators();
        let mut pipeline = StrategyPipeline::new(
            SignalAggregator::new(config.aggregator.clone()),
            RecommendationRanker::new(
                config.ranker.clone(),
                PositionSizer::new(config.sizing.clone()),
            ),
            PortfolioManager::new(config.portfolio.clone()),
        );

        let outcome = pipeline.run(&batch, &registry, &generators);

        println!("Decision funnel:");
        for (stage, count) in outcome.stats.funnel() {
            println!("  {stage:<22} {count}");
        }

        if outcome.recommendations.is_empty() {
            println!("\nNo recommendations this cycle.");
        } else {
            println!("\nRecommendations:");
            for rec in &outcome.recommendations {
                println!(
                    "  {} {} {} @ {} x{}  ev={} conf={} [{}]",
                    rec.league,
                    rec.market_id,
                    rec.contract,
                    rec.entry_price,
                    rec.max_size,
                    rec.expected_value,
                    rec.confidence,
                    rec.contributing_signals.join(", "),
                );
            }
        }

        if self.watchlist && !outcome.watchlist.is_empty() {
            println!("\nWatchlist:");
            for candidate in &outcome.watchlist {
                println!(
                    "  {} {} @ {}  ev={}  ({})",
                    candidate.market_id,
                    candidate.contract,
                    candidate.entry_price,
                    candidate.expected_value,
                    candidate.rejection_reasons.join("; "),
                );
            }
        }

        Ok(())
    }
}
