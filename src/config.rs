//! Configuration types for kalshi-alpha

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::BTreeMap;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub aggregator: AggregatorConfig,
    #[serde(default)]
    pub ranker: RankerConfig,
    #[serde(default)]
    pub sizing: SizingConfig,
    #[serde(default)]
    pub portfolio: PortfolioConfig,
    #[serde(default)]
    pub backtest: BacktestConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Signal aggregation configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AggregatorConfig {
    /// Minimum signals required per market
    #[serde(default = "default_min_signals")]
    pub min_signals: usize,

    /// Reject aggregates whose agreement falls below the ratio floor
    #[serde(default)]
    pub require_agreement: bool,

    /// Minimum fraction of directional signals agreeing with the winner
    #[serde(default = "default_min_agreement_ratio")]
    pub min_agreement_ratio: Decimal,

    /// Per-generator weights; unlisted generators weigh 1.0
    #[serde(default)]
    pub weights: BTreeMap<String, Decimal>,
}

fn default_min_signals() -> usize {
    1
}
fn default_min_agreement_ratio() -> Decimal {
    Decimal::new(6, 1) // 0.6
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            min_signals: 1,
            require_agreement: false,
            min_agreement_ratio: Decimal::new(6, 1),
            weights: BTreeMap::new(),
        }
    }
}

/// Recommendation ranking configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RankerConfig {
    /// Minimum net expected value to recommend
    #[serde(default = "default_min_ev")]
    pub min_ev: Decimal,

    /// Minimum aggregate confidence to recommend
    #[serde(default = "default_min_confidence")]
    pub min_confidence: Decimal,

    /// Cap on the recommendation list; the watchlist is unbounded
    #[serde(default = "default_max_recommendations")]
    pub max_recommendations: usize,

    /// Rank-score weight on expected value
    #[serde(default = "default_ev_weight")]
    pub ev_weight: Decimal,

    /// Rank-score weight on confidence
    #[serde(default = "default_confidence_weight")]
    pub confidence_weight: Decimal,

    /// Rank-score weight on liquidity
    #[serde(default = "default_liquidity_weight")]
    pub liquidity_weight: Decimal,

    /// Rank-score weight on kickoff proximity
    #[serde(default = "default_timing_weight")]
    pub timing_weight: Decimal,
}

fn default_min_ev() -> Decimal {
    Decimal::new(2, 2) // 0.02
}
fn default_min_confidence() -> Decimal {
    Decimal::new(3, 1) // 0.3
}
fn default_max_recommendations() -> usize {
    10
}
fn default_ev_weight() -> Decimal {
    Decimal::new(4, 1) // 0.4
}
fn default_confidence_weight() -> Decimal {
    Decimal::new(3, 1) // 0.3
}
fn default_liquidity_weight() -> Decimal {
    Decimal::new(2, 1) // 0.2
}
fn default_timing_weight() -> Decimal {
    Decimal::new(1, 1) // 0.1
}

impl Default for RankerConfig {
    fn default() -> Self {
        Self {
            min_ev: default_min_ev(),
            min_confidence: default_min_confidence(),
            max_recommendations: 10,
            ev_weight: default_ev_weight(),
            confidence_weight: default_confidence_weight(),
            liquidity_weight: default_liquidity_weight(),
            timing_weight: default_timing_weight(),
        }
    }
}

/// Position sizing configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SizingConfig {
    /// Base position in dollars
    #[serde(default = "default_base_size")]
    pub base_size: Decimal,

    /// Maximum position in dollars
    #[serde(default = "default_max_size")]
    pub max_size: Decimal,

    /// Minimum position in dollars
    #[serde(default = "default_min_size")]
    pub min_size: Decimal,

    /// Fraction of full Kelly to use (e.g. 0.25 for quarter Kelly)
    #[serde(default = "default_kelly_fraction")]
    pub kelly_fraction: Decimal,
}

fn default_base_size() -> Decimal {
    Decimal::new(100, 0)
}
fn default_max_size() -> Decimal {
    Decimal::new(500, 0)
}
fn default_min_size() -> Decimal {
    Decimal::new(10, 0)
}
fn default_kelly_fraction() -> Decimal {
    Decimal::new(25, 2) // 0.25
}

impl Default for SizingConfig {
    fn default() -> Self {
        Self {
            base_size: default_base_size(),
            max_size: default_max_size(),
            min_size: default_min_size(),
            kelly_fraction: default_kelly_fraction(),
        }
    }
}

/// Portfolio exposure caps in dollars
#[derive(Debug, Clone, Deserialize)]
pub struct PortfolioConfig {
    /// Total dollars at risk across the book
    #[serde(default = "default_max_total_exposure")]
    pub max_total_exposure: Decimal,

    /// Per-market cap
    #[serde(default = "default_max_per_market")]
    pub max_per_market: Decimal,

    /// Per-event (game) cap
    #[serde(default = "default_max_per_event")]
    pub max_per_event: Decimal,

    /// Per-league cap
    #[serde(default = "default_max_per_league")]
    pub max_per_league: Decimal,
}

fn default_max_total_exposure() -> Decimal {
    Decimal::new(5000, 0)
}
fn default_max_per_market() -> Decimal {
    Decimal::new(500, 0)
}
fn default_max_per_event() -> Decimal {
    Decimal::new(1000, 0)
}
fn default_max_per_league() -> Decimal {
    Decimal::new(2000, 0)
}

impl Default for PortfolioConfig {
    fn default() -> Self {
        Self {
            max_total_exposure: default_max_total_exposure(),
            max_per_market: default_max_per_market(),
            max_per_event: default_max_per_event(),
            max_per_league: default_max_per_league(),
        }
    }
}

/// Backtest replay configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BacktestConfig {
    /// Inclusive replay window start; unbounded when absent
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,

    /// Inclusive replay window end; unbounded when absent
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,

    /// Starting capital in dollars
    #[serde(default = "default_initial_capital")]
    pub initial_capital: Decimal,

    /// Maximum fraction of capital committed per position
    #[serde(default = "default_max_position_pct")]
    pub max_position_pct: Decimal,

    /// Whether to charge per-contract fees
    #[serde(default = "default_true")]
    pub include_fees: bool,

    /// Fee per contract in dollars
    #[serde(default = "default_fee_per_contract")]
    pub fee_per_contract: Decimal,

    /// Seed for the fill model's random source
    #[serde(default = "default_random_seed")]
    pub random_seed: u64,
}

fn default_initial_capital() -> Decimal {
    Decimal::new(10000, 0)
}
fn default_max_position_pct() -> Decimal {
    Decimal::new(5, 2) // 0.05
}
fn default_true() -> bool {
    true
}
fn default_fee_per_contract() -> Decimal {
    Decimal::new(1, 2) // 0.01
}
fn default_random_seed() -> u64 {
    42
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            start_date: None,
            end_date: None,
            initial_capital: default_initial_capital(),
            max_position_pct: default_max_position_pct(),
            include_fees: true,
            fee_per_contract: default_fee_per_contract(),
            random_seed: 42,
        }
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// "pretty" or "json"
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_config_deserialize() {
        let toml = r#"
            [aggregator]
            min_signals = 2
            require_agreement = true
            min_agreement_ratio = 0.6

            [aggregator.weights]
            late_kickoff_vol = 1.5

            [ranker]
            min_ev = 0.02
            min_confidence = 0.3
            max_recommendations = 5

            [sizing]
            base_size = 100
            max_size = 500
            min_size = 10
            kelly_fraction = 0.25

            [portfolio]
            max_total_exposure = 5000
            max_per_market = 500
            max_per_event = 1000
            max_per_league = 2000

            [backtest]
            initial_capital = 10000
            max_position_pct = 0.05
            fee_per_contract = 0.01
            random_seed = 7

            [telemetry]
            log_level = "debug"
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.aggregator.min_signals, 2);
        assert!(config.aggregator.require_agreement);
        assert_eq!(config.aggregator.weights["late_kickoff_vol"], dec!(1.5));
        assert_eq!(config.ranker.max_recommendations, 5);
        assert_eq!(config.sizing.kelly_fraction, dec!(0.25));
        assert_eq!(config.backtest.random_seed, 7);
        assert_eq!(config.telemetry.log_level, "debug");
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.aggregator.min_signals, 1);
        assert_eq!(config.ranker.min_ev, dec!(0.02));
        assert_eq!(config.ranker.min_confidence, dec!(0.3));
        assert_eq!(config.sizing.max_size, dec!(500));
        assert_eq!(config.portfolio.max_total_exposure, dec!(5000));
        assert_eq!(config.backtest.initial_capital, dec!(10000));
        assert_eq!(config.backtest.random_seed, 42);
        assert!(config.backtest.start_date.is_none());
    }

    #[test]
    fn test_ranker_weights_sum_to_one() {
        let config = RankerConfig::default();
        let total = config.ev_weight
            + config.confidence_weight
            + config.liquidity_weight
            + config.timing_weight;
        assert_eq!(total, dec!(1.0));
    }

    #[test]
    fn test_backtest_dates_parse() {
        let toml = r#"
            [backtest]
            start_date = "2024-09-05T00:00:00Z"
            end_date = "2025-01-05T00:00:00Z"
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert!(config.backtest.start_date.is_some());
        assert!(config.backtest.end_date.unwrap() > config.backtest.start_date.unwrap());
    }

    #[test]
    fn test_config_load_nonexistent() {
        let result = Config::load("/nonexistent/path/config.toml");
        assert!(result.is_err());
    }
}
