//! Premarket Breakout Strategy Engine
//!
//! A daily premarket-gap breakout system: each trading day a small universe
//! of gappers is selected from precomputed gap statistics, a breakout above
//! each symbol's premarket high triggers a fixed-dollar-risk entry protected
//! by a take-profit/stop-loss (OCO) bracket, and everything is flattened at
//! a fixed daily cutoff.
//!
//! The host delivers price ticks, order events and the two scheduled
//! callbacks sequentially through [`engine::StrategyEngine`]; order
//! execution sits behind [`oms::OrderVenue`], with an in-process paper
//! venue for replay and tests.

pub mod breakout;
pub mod config;
pub mod data;
pub mod engine;
pub mod lifecycle;
pub mod oms;
pub mod selector;
pub mod session;
pub mod types;

pub use config::Config;
pub use engine::StrategyEngine;
pub use types::*;
