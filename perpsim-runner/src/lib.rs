//! PerpSim Runner: run configuration, data supply, and performance summary.
//!
//! This crate builds on `perpsim-core` to provide:
//! - TOML run configs with content-addressed run ids
//! - CSV candle loading with sort/dedup and a timeframe self-check
//! - Seeded synthetic candles for offline runs
//! - Single and parallel batch runs with a performance summary

pub mod config;
pub mod loader;
pub mod metrics;
pub mod runner;
pub mod synthetic;

pub use config::{BacktestConfig, ConfigError, RunId};
pub use loader::{load_candles, LoadError};
pub use metrics::{PerformanceSummary, ReasonPnl, SideStats, StopBreakdown, StopStats};
pub use runner::{load_inputs, run_batch, run_single, run_with_data, BacktestOutput, RunError, RunInputs};
pub use synthetic::SyntheticConfig;

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn config_is_send_sync() {
        assert_send::<BacktestConfig>();
        assert_sync::<BacktestConfig>();
    }

    #[test]
    fn output_is_send_sync() {
        assert_send::<BacktestOutput>();
        assert_sync::<BacktestOutput>();
        assert_send::<PerformanceSummary>();
        assert_sync::<PerformanceSummary>();
    }

    #[test]
    fn run_error_is_send() {
        assert_send::<RunError>();
    }
}
