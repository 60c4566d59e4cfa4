//! Backtest engine: cost model, per-bar replay loop and run results.
//!
//! The engine owns the position. Each bar it asks the rule engine for a
//! decision, fills it at close-derived prices and records one equity point.

pub mod cost_model;
pub mod event_loop;
pub mod state;

pub use cost_model::CostModel;
pub use event_loop::{backtest, run_backtest, BarStep, Simulation};
pub use state::{RunCounters, RunResult};
