//! Telemetry module
//!
//! Structured logging for the decision pipeline and backtests

mod logging;

pub use logging::{init_logging, LogFormat};

use crate::config::TelemetryConfig;

/// Guard that cleans up telemetry on drop
pub struct TelemetryGuard {
    _priv: (),
}

/// Initialize all telemetry subsystems
pub fn init_telemetry(config: &TelemetryConfig) -> anyhow::Result<TelemetryGuard> {
    let format = config.log_format.parse().unwrap_or(LogFormat::Pretty);
    init_logging(&config.log_level, format)?;
    Ok(TelemetryGuard { _priv: () })
}
