//! PerpSim Core: bar-synchronous backtesting of a perpetual-futures strategy.
//!
//! - Domain types (candles, timeframes, positions, trades)
//! - Dual-timeframe alignment pipeline with gap detection
//! - Indicators (ATR, ADX, EMA and slope, structural high/low)
//! - Strategy rules (entry triggers, BearGate, stops, sizing, profit protection)
//! - Bar-by-bar event loop producing a trade ledger and equity curve

pub mod config;
pub mod data;
pub mod domain;
pub mod engine;
pub mod error;
pub mod fingerprint;
pub mod indicators;
pub mod strategy;

pub use config::SimConfig;
pub use engine::{backtest, run_backtest, RunResult};
pub use error::PipelineError;
