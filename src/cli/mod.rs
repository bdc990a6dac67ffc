//! CLI interface for kalshi-alpha
//!
//! Provides subcommands for:
//! - `recommend`: Run the decision pipeline over captured snapshots
//! - `backtest`: Replay captured snapshots through the simulator
//! - `scenarios`: Run the standard scenario batch
//! - `config`: Show current configuration

mod backtest;
mod recommend;
mod scenarios;

pub use backtest::BacktestArgs;
pub use recommend::RecommendArgs;
pub use scenarios::ScenariosArgs;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "kalshi-alpha")]
#[command(about = "Signal-driven trade recommendations and backtesting for Kalshi sports markets")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the decision pipeline over captured snapshots
    Recommend(RecommendArgs),
    /// Replay captured snapshots through the backtest simulator
    Backtest(BacktestArgs),
    /// Run the standard scenario batch
    Scenarios(ScenariosArgs),
    /// Show current configuration
    Config,
}
