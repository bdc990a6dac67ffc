use clap::Parser;
use kalshi_alpha::cli::{Cli, Commands};
use kalshi_alpha::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(&cli.config).unwrap_or_else(|e| {
        eprintln!("Warning: Could not load config from {}: {}", cli.config, e);
        eprintln!("Using default configuration");
        Config::default()
    });

    // Initialize telemetry
    let _guard = kalshi_alpha::telemetry::init_telemetry(&config.telemetry)?;

    match cli.command {
        Commands::Recommend(args) => {
            tracing::info!("Running recommendation pipeline");
            args.execute(&config).await?;
        }
        Commands::Backtest(args) => {
            tracing::info!("Starting backtest");
            args.execute(&config).await?;
        }
        Commands::Scenarios(args) => {
            tracing::info!("Running scenario batch");
            args.execute(&config).await?;
        }
        Commands::Config => {
            println!("Current configuration:");
            println!(
                "  Aggregator: min_signals={}, require_agreement={}",
                config.aggregator.min_signals, config.aggregator.require_agreement
            );
            println!(
                "  Ranker: min_ev={}, min_confidence={}, max_recommendations={}",
                config.ranker.min_ev, config.ranker.min_confidence, config.ranker.max_recommendations
            );
            println!(
                "  Sizing: kelly_fraction={}, bounds=[{}, {}]",
                config.sizing.kelly_fraction, config.sizing.min_size, config.sizing.max_size
            );
            println!(
                "  Portfolio: total={}, market={}, event={}, league={}",
                config.portfolio.max_total_exposure,
                config.portfolio.max_per_market,
                config.portfolio.max_per_event,
                config.portfolio.max_per_league
            );
            println!(
                "  Backtest: capital={}, max_position_pct={}, seed={}",
                config.backtest.initial_capital,
                config.backtest.max_position_pct,
                config.backtest.random_seed
            );
        }
    }

    Ok(())
}
