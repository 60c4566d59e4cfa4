//! Backtest runner: wires together data supply, the core engine and metrics.
//!
//! Entry points:
//! - `run_single()`: loads data named by the config (or generates synthetic
//!   candles), then runs. Used by the CLI.
//! - `run_with_data()`: takes pre-loaded candles. No I/O.
//! - `run_batch()`: independent configs in parallel, one result per config.

use perpsim_core::data::{drop_incomplete_tail, resample, validate_timeframe, TimeframeCheck};
use perpsim_core::domain::{Candle, Timeframe};
use perpsim_core::error::SeriesKind;
use perpsim_core::fingerprint::dataset_hash;
use perpsim_core::{backtest, PipelineError, RunResult};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{BacktestConfig, ConfigError, RunId};
use crate::loader::{load_candles, LoadError};
use crate::metrics::PerformanceSummary;
use crate::synthetic;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),
    #[error(
        "{series} data does not look like {timeframe} candles \
         (modal spacing {mode_ms}ms, expected {expected_ms}ms, bar ratio {ratio:.2})"
    )]
    TimeframeCheckFailed {
        series: SeriesKind,
        timeframe: Timeframe,
        mode_ms: i64,
        expected_ms: i64,
        ratio: f64,
    },
    #[error("no trading data for '{0}' (set trading_data or use --synthetic)")]
    MissingData(String),
}

/// Candles for one run.
#[derive(Debug, Clone)]
pub struct RunInputs {
    pub trading: Vec<Candle>,
    pub filter: Vec<Candle>,
    /// The filter series was derived from the trading series.
    pub filter_resampled: bool,
    pub synthetic: bool,
}

/// Complete result of a single run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestOutput {
    pub symbol: String,
    pub run_id: RunId,
    pub dataset_hash: String,
    pub has_synthetic: bool,
    pub filter_resampled: bool,
    pub timeframe_check: Option<TimeframeCheck>,
    pub summary: PerformanceSummary,
    pub result: RunResult,
}

/// Read (or generate) the candles a config names.
pub fn load_inputs(config: &BacktestConfig, use_synthetic: bool) -> Result<RunInputs, RunError> {
    let sim = &config.sim;
    let trading = match (&config.trading_data, use_synthetic) {
        (_, true) => synthetic::generate(&config.synthetic, sim.trading_tf),
        (Some(path), false) => load_candles(path)?,
        (None, false) => return Err(RunError::MissingData(config.symbol.clone())),
    };

    let (filter, filter_resampled) = match (&config.filter_data, use_synthetic) {
        (Some(path), false) => (load_candles(path)?, false),
        _ => {
            let mut f = resample(&trading, sim.filter_tf);
            drop_incomplete_tail(&mut f, &trading, sim.filter_tf, sim.trading_tf);
            (f, true)
        }
    };

    Ok(RunInputs {
        trading,
        filter,
        filter_resampled,
        synthetic: use_synthetic,
    })
}

fn check_timeframe(
    candles: &[Candle],
    tf: Timeframe,
    series: SeriesKind,
) -> Result<Option<TimeframeCheck>, RunError> {
    let check = validate_timeframe(candles, tf);
    if let Some(c) = &check {
        if !c.ok {
            warn!(%series, timeframe = %tf, mode_ms = c.mode_ms, ratio = c.ratio, "timeframe check failed");
            return Err(RunError::TimeframeCheckFailed {
                series,
                timeframe: tf,
                mode_ms: c.mode_ms,
                expected_ms: c.expected_ms,
                ratio: c.ratio,
            });
        }
    }
    Ok(check)
}

/// Run a backtest on pre-loaded candles.
pub fn run_with_data(
    config: &BacktestConfig,
    inputs: &RunInputs,
) -> Result<BacktestOutput, RunError> {
    let sim = &config.sim;
    let timeframe_check = check_timeframe(&inputs.trading, sim.trading_tf, SeriesKind::Trading)?;
    if !inputs.filter_resampled {
        check_timeframe(&inputs.filter, sim.filter_tf, SeriesKind::Filter)?;
    }

    let requested = config.requested_range()?;
    let result = backtest(&inputs.trading, &inputs.filter, sim, requested)?;
    let summary = PerformanceSummary::compute(&result, sim.trading_tf);

    info!(
        symbol = %config.symbol,
        trades = summary.trade_count,
        total_return = summary.total_return,
        synthetic = inputs.synthetic,
        "run finished"
    );

    Ok(BacktestOutput {
        symbol: config.symbol.clone(),
        run_id: config.run_id(),
        dataset_hash: dataset_hash(&inputs.trading),
        has_synthetic: inputs.synthetic,
        filter_resampled: inputs.filter_resampled,
        timeframe_check,
        summary,
        result,
    })
}

pub fn run_single(config: &BacktestConfig, use_synthetic: bool) -> Result<BacktestOutput, RunError> {
    let inputs = load_inputs(config, use_synthetic)?;
    run_with_data(config, &inputs)
}

/// Run independent configs in parallel. Results keep the input order.
pub fn run_batch(
    configs: &[BacktestConfig],
    use_synthetic: bool,
) -> Vec<Result<BacktestOutput, RunError>> {
    configs
        .par_iter()
        .map(|cfg| run_single(cfg, use_synthetic))
        .collect()
}
