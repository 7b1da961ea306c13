//! Core data types used across the strategy engine

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Equity ticker symbol using Arc<str> for cheap cloning
///
/// Symbols are cloned on every tick, order and session-state lookup.
/// Arc<str> keeps those clones at O(1) instead of re-allocating.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(#[serde(with = "arc_str_serde")] std::sync::Arc<str>);

/// Custom serde for Arc<str>
mod arc_str_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::sync::Arc;

    pub fn serialize<S>(value: &Arc<str>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(value)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Arc<str>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Arc::from(s.as_str()))
    }
}

impl Symbol {
    pub fn new(s: impl AsRef<str>) -> Self {
        Symbol(std::sync::Arc::from(s.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Trade direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

// ============================================================================
// Money - Precise Decimal Arithmetic for Prices
// ============================================================================

use rust_decimal::Decimal;
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Mul, Sub};

/// Price type backed by `rust_decimal::Decimal`.
///
/// Bracket-leg prices are derived from the premarket high and rounded to
/// 2 decimals; doing that in f64 drifts. `round_dp` uses banker's rounding,
/// the same midpoint rule as Python's `round()`.
#[derive(Debug, Clone, Copy, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(#[serde(with = "rust_decimal::serde::str")] Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);

    /// Create from f64. NaN/Infinity collapse to zero rather than panic;
    /// callers validate ticks before prices reach this point.
    pub fn from_f64(value: f64) -> Self {
        Money(Decimal::try_from(value).unwrap_or_else(|_| {
            if value.is_nan() || value.is_infinite() {
                Decimal::ZERO
            } else {
                Decimal::from_f64_retain(value).unwrap_or(Decimal::ZERO)
            }
        }))
    }

    pub fn from_i64(value: i64) -> Self {
        Money(Decimal::from(value))
    }

    pub fn to_f64(self) -> f64 {
        use rust_decimal::prelude::ToPrimitive;
        self.0.to_f64().unwrap_or(0.0)
    }

    pub fn is_zero(self) -> bool {
        self.0.is_zero()
    }

    /// Round to the given number of decimal places (banker's rounding)
    pub fn round_dp(self, dp: u32) -> Self {
        Money(self.0.round_dp(dp))
    }

    pub fn inner(self) -> Decimal {
        self.0
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::ZERO
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl PartialEq for Money {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl PartialOrd for Money {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Money {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl Add for Money {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Money(self.0 + rhs.0)
    }
}

impl Sub for Money {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        Money(self.0 - rhs.0)
    }
}

impl Mul for Money {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self::Output {
        Money(self.0 * rhs.0)
    }
}

// ============================================================================
// Price ticks
// ============================================================================

/// Validation errors for price observations
#[derive(Debug, Error)]
pub enum TickValidationError {
    #[error("price ({0}) must be positive")]
    NonPositivePrice(f64),

    #[error("price ({0}) must be finite")]
    NonFinitePrice(f64),
}

/// A single per-symbol price observation from the feed.
///
/// Timestamps are exchange-local wall-clock time; the trading window and the
/// daily cutoff are defined against time-of-day, not UTC.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    pub datetime: NaiveDateTime,
    pub price: f64,
}

impl Tick {
    pub fn new(datetime: NaiveDateTime, price: f64) -> Result<Self, TickValidationError> {
        let tick = Self { datetime, price };
        tick.validate()?;
        Ok(tick)
    }

    pub fn validate(&self) -> Result<(), TickValidationError> {
        if !self.price.is_finite() {
            return Err(TickValidationError::NonFinitePrice(self.price));
        }
        if self.price <= 0.0 {
            return Err(TickValidationError::NonPositivePrice(self.price));
        }
        Ok(())
    }

    /// Feed-level "has valid data" indicator
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

// ============================================================================
// Gap statistics
// ============================================================================

/// One row of the premarket gap-statistics dataset: a stock that gapped on
/// `date`, with its gap size and the premarket high used as the breakout
/// threshold. Outstanding shares and market cap are carried but unused
/// (a float/size filter was sketched in the dataset and never enabled).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GapperRecord {
    pub date: NaiveDate,
    pub symbol: Symbol,
    pub gap_percent: f64,
    pub premarket_high: f64,
    pub outstanding_shares: Option<f64>,
    pub market_cap: Option<f64>,
}
