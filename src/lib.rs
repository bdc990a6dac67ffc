//! kalshi-alpha: signal-driven trading recommendations for Kalshi sports markets
//!
//! This library provides the core components for:
//! - Signal aggregation with correlation-aware confidence
//! - Expected-value estimation and Kelly-based position sizing
//! - Recommendation ranking with a near-miss watchlist
//! - Portfolio exposure limits and correlation control
//! - Deterministic backtest replay with look-ahead protection
//! - Probabilistic fill and slippage simulation
//! - Performance metrics and scenario batches
//! - Structured logging

pub mod backtest;
pub mod cli;
pub mod config;
pub mod features;
pub mod market;
pub mod signal;
pub mod strategy;
pub mod telemetry;
