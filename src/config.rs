//! Configuration management
//!
//! Loads and validates the JSON run configuration: candidate filter, per-trade
//! risk, the session clock (entry window and daily cutoff) and data locations.
//! Invalid configuration is rejected before any trading state exists.

use anyhow::{Context, Result};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Configuration validation errors, all fatal at startup
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("target_percent must be in (0, 1), got {0} (it divides the risk budget and sets the stop at threshold * (1 - target_percent))")]
    InvalidTargetPercent(f64),

    #[error("dollar_risk_per_trade must be positive, got {0}")]
    InvalidDollarRisk(f64),

    #[error("max_daily_trades must be at least 1")]
    ZeroMaxDailyTrades,

    #[error("entry_start ({entry_start}) must be before cutoff ({cutoff})")]
    InvertedSessionWindow {
        entry_start: NaiveTime,
        cutoff: NaiveTime,
    },
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub filter: FilterConfig,
    #[serde(default)]
    pub risk: RiskConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub data: DataConfig,
}

impl Config {
    /// Load configuration from a JSON file and validate it
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref()).context("Failed to read config file")?;
        let config: Config =
            serde_json::from_str(&contents).context("Failed to parse config JSON")?;
        config.validate().context("Invalid configuration")?;
        Ok(config)
    }

    /// Startup validation. `target_percent == 0` would divide-by-zero in
    /// position sizing, and `target_percent >= 1` would put the stop leg at
    /// a zero or negative price, so both are rejected here rather than
    /// discovered on the first breakout.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.risk.target_percent > 0.0 && self.risk.target_percent < 1.0) {
            return Err(ConfigError::InvalidTargetPercent(self.risk.target_percent));
        }
        if !(self.risk.dollar_risk_per_trade > 0.0) || !self.risk.dollar_risk_per_trade.is_finite()
        {
            return Err(ConfigError::InvalidDollarRisk(self.risk.dollar_risk_per_trade));
        }
        if self.filter.max_daily_trades == 0 {
            return Err(ConfigError::ZeroMaxDailyTrades);
        }
        if self.session.entry_start >= self.session.cutoff {
            return Err(ConfigError::InvertedSessionWindow {
                entry_start: self.session.entry_start,
                cutoff: self.session.cutoff,
            });
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            filter: FilterConfig::default(),
            risk: RiskConfig::default(),
            session: SessionConfig::default(),
            data: DataConfig::default(),
        }
    }
}

/// Candidate filter for the daily universe selection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Minimum premarket gap, in percent
    pub min_gap_percent: f64,
    /// Minimum premarket-high price; filters out sub-dollar names
    pub min_premarket_high_price: f64,
    /// Cap on selected symbols per day
    pub max_daily_trades: usize,
}

impl Default for FilterConfig {
    fn default() -> Self {
        FilterConfig {
            min_gap_percent: 5.0,
            min_premarket_high_price: 10.0,
            max_daily_trades: 5,
        }
    }
}

/// Per-trade risk parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Fixed dollar risk per entry
    pub dollar_risk_per_trade: f64,
    /// Bracket width as a fraction of the threshold (take-profit above,
    /// stop-loss below). Also the divisor in position sizing.
    pub target_percent: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        RiskConfig {
            dollar_risk_per_trade: 200.0,
            target_percent: 0.05,
        }
    }
}

/// Session clock, in exchange-local time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// First time of day at which breakouts may trigger (open + 30 min)
    pub entry_start: NaiveTime,
    /// Daily liquidation cutoff: flatten positions, cancel orders, reset state
    pub cutoff: NaiveTime,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            entry_start: NaiveTime::from_hms_opt(9, 30, 0).expect("valid entry start"),
            cutoff: NaiveTime::from_hms_opt(12, 0, 0).expect("valid cutoff"),
        }
    }
}

/// Data locations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Path to the gap-statistics CSV
    pub gapper_csv: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        DataConfig {
            gapper_csv: "data/gappers.csv".to_string(),
        }
    }
}
