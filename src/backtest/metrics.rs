//! Backtest performance metrics
//!
//! Sharpe, Sortino, drawdown, and trade statistics from a completed run.
//! Ratio math runs in f64; equity stays in Decimal until this boundary.

use super::simulator::Position;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Periods per year used for annualization
const PERIODS_PER_YEAR: f64 = 252.0;

/// One point on the equity curve
#[derive(Debug, Clone, PartialEq)]
pub struct EquityPoint {
    pub timestamp: DateTime<Utc>,
    pub equity: Decimal,
}

/// Aggregate statistics from a completed backtest run.
///
/// Computed once from the equity curve and closed positions; never mutated
/// afterward. Empty input yields an all-zero object, not an error.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BacktestMetrics {
    // Returns
    pub total_return: f64,
    pub annualized_return: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,

    // Risk
    pub max_drawdown: f64,
    /// Longest consecutive run of periods below a prior peak
    pub max_drawdown_duration: usize,
    pub volatility: f64,

    // Trading
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub hit_rate: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub profit_factor: f64,
    pub avg_trade: f64,
}

impl BacktestMetrics {
    /// Format as a table for CLI output
    pub fn format_table(&self) -> String {
        format!(
            r#"
══════════════════════════════════════════════════════
               BACKTEST RESULTS
══════════════════════════════════════════════════════

PERFORMANCE
───────────────────────────────────────────────────────
Total Return:     {:+.2}%
Annualized:       {:+.2}%
Sharpe Ratio:     {:.2}
Sortino Ratio:    {:.2}
Max Drawdown:     {:.2}% ({} periods)
Volatility:       {:.2}%

ACTIVITY
───────────────────────────────────────────────────────
Total Trades:     {}
Hit Rate:         {:.1}%
Avg Win:          ${:.2}
Avg Loss:         ${:.2}
Profit Factor:    {:.2}
Avg Trade:        ${:.2}
══════════════════════════════════════════════════════
"#,
            self.total_return * 100.0,
            self.annualized_return * 100.0,
            self.sharpe_ratio,
            self.sortino_ratio,
            self.max_drawdown * 100.0,
            self.max_drawdown_duration,
            self.volatility * 100.0,
            self.total_trades,
            self.hit_rate * 100.0,
            self.avg_win,
            self.avg_loss,
            self.profit_factor,
            self.avg_trade,
        )
    }
}

/// Compute metrics from an equity curve and closed positions
pub fn compute_metrics(
    equity_curve: &[EquityPoint],
    positions: &[Position],
    initial_capital: Decimal,
    risk_free_rate: f64,
) -> BacktestMetrics {
    if equity_curve.is_empty() {
        return BacktestMetrics::default();
    }

    let equities: Vec<f64> = equity_curve
        .iter()
        .map(|p| f64::try_from(p.equity).unwrap_or(0.0))
        .collect();
    let initial = f64::try_from(initial_capital).unwrap_or(0.0);
    let final_equity = *equities.last().unwrap();

    let total_return = if initial > 0.0 {
        (final_equity - initial) / initial
    } else {
        0.0
    };

    let mut returns = Vec::with_capacity(equities.len().saturating_sub(1));
    for window in equities.windows(2) {
        if window[0] > 0.0 {
            returns.push((window[1] - window[0]) / window[0]);
        }
    }
    if returns.is_empty() {
        return BacktestMetrics {
            total_return,
            ..trade_stats(positions)
        };
    }

    let n = returns.len() as f64;
    let mean_return = returns.iter().sum::<f64>() / n;
    let annualized_return = mean_return * PERIODS_PER_YEAR;

    let variance = returns
        .iter()
        .map(|r| (r - mean_return).powi(2))
        .sum::<f64>()
        / n;
    let volatility = variance.sqrt() * PERIODS_PER_YEAR.sqrt();

    let sharpe_ratio = if volatility > 0.0 {
        (annualized_return - risk_free_rate) / volatility
    } else {
        0.0
    };

    // Sortino penalizes only downside deviation; with no losing periods it
    // falls back to Sharpe
    let negative: Vec<f64> = returns.iter().copied().filter(|r| *r < 0.0).collect();
    let sortino_ratio = if negative.is_empty() {
        sharpe_ratio
    } else {
        let downside_var = negative.iter().map(|r| r.powi(2)).sum::<f64>() / negative.len() as f64;
        let downside_vol = downside_var.sqrt() * PERIODS_PER_YEAR.sqrt();
        if downside_vol > 0.0 {
            (annualized_return - risk_free_rate) / downside_vol
        } else {
            0.0
        }
    };

    let (max_drawdown, max_drawdown_duration) = calculate_drawdown(&equities);

    BacktestMetrics {
        total_return,
        annualized_return,
        sharpe_ratio,
        sortino_ratio,
        max_drawdown,
        max_drawdown_duration,
        volatility,
        ..trade_stats(positions)
    }
}

/// Trade statistics from closed positions
fn trade_stats(positions: &[Position]) -> BacktestMetrics {
    let pnls: Vec<f64> = positions
        .iter()
        .map(|p| p.pnl().map(|v| f64::try_from(v).unwrap_or(0.0)).unwrap_or(0.0))
        .collect();
    let wins: Vec<f64> = pnls.iter().copied().filter(|p| *p > 0.0).collect();
    let losses: Vec<f64> = pnls.iter().copied().filter(|p| *p < 0.0).collect();

    let total_trades = positions.len();
    let winning_trades = wins.len();
    let losing_trades = losses.len();

    let hit_rate = if total_trades > 0 {
        winning_trades as f64 / total_trades as f64
    } else {
        0.0
    };
    let avg_win = if wins.is_empty() {
        0.0
    } else {
        wins.iter().sum::<f64>() / wins.len() as f64
    };
    let avg_loss = if losses.is_empty() {
        0.0
    } else {
        (losses.iter().sum::<f64>() / losses.len() as f64).abs()
    };
    let avg_trade = if pnls.is_empty() {
        0.0
    } else {
        pnls.iter().sum::<f64>() / pnls.len() as f64
    };

    let gross_profit: f64 = wins.iter().sum();
    let gross_loss: f64 = losses.iter().sum::<f64>().abs();
    let profit_factor = if gross_loss > 0.0 {
        gross_profit / gross_loss
    } else if gross_profit > 0.0 {
        f64::INFINITY
    } else {
        0.0
    };

    BacktestMetrics {
        total_trades,
        winning_trades,
        losing_trades,
        hit_rate,
        avg_win,
        avg_loss,
        profit_factor,
        avg_trade,
        ..BacktestMetrics::default()
    }
}

/// Maximum peak-to-trough decline and its duration in periods
pub fn calculate_drawdown(equities: &[f64]) -> (f64, usize) {
    if equities.is_empty() {
        return (0.0, 0);
    }

    let mut peak = equities[0];
    let mut max_dd = 0.0;
    let mut max_duration = 0;
    let mut current_duration = 0;

    for &equity in &equities[1..] {
        if equity > peak {
            peak = equity;
            current_duration = 0;
        } else {
            if peak > 0.0 {
                let dd = (peak - equity) / peak;
                if dd > max_dd {
                    max_dd = dd;
                }
            }
            current_duration += 1;
            max_duration = max_duration.max(current_duration);
        }
    }

    (max_dd, max_duration)
}
