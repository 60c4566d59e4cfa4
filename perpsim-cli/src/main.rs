//! PerpSim CLI: run backtests and check candle files.
//!
//! Commands:
//! - `run`: execute one or more backtests from TOML config files
//! - `check`: timeframe self-check and gap report for a candle CSV

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use perpsim_core::data::{interior_gaps, validate_timeframe};
use perpsim_core::domain::{format_ms, Timeframe};
use perpsim_runner::{load_candles, run_batch, run_single, BacktestConfig, BacktestOutput};
use std::path::{Path, PathBuf};
use tracing::error;

#[derive(Parser)]
#[command(name = "perpsim", about = "PerpSim: perpetual futures backtest engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute backtests from TOML config files. Several configs run in parallel.
    Run {
        /// Path to a TOML config file (repeatable).
        #[arg(long = "config", required = true)]
        configs: Vec<PathBuf>,

        /// Use seeded synthetic candles instead of the configured CSV files.
        #[arg(long, default_value_t = false)]
        synthetic: bool,

        /// Include the full trade ledger and equity curve in the output.
        #[arg(long, default_value_t = false)]
        full: bool,
    },
    /// Validate that a candle CSV matches a timeframe and report its gaps.
    Check {
        /// Path to a candle CSV.
        #[arg(long)]
        data: PathBuf,

        /// Expected timeframe, e.g. 15m, 4h, 1d.
        #[arg(long)]
        timeframe: String,
    },
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            configs,
            synthetic,
            full,
        } => run_cmd(&configs, synthetic, full),
        Commands::Check { data, timeframe } => check_cmd(&data, &timeframe),
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn run_cmd(paths: &[PathBuf], synthetic: bool, full: bool) -> Result<()> {
    let configs = paths
        .iter()
        .map(|p| {
            BacktestConfig::from_file(p).with_context(|| format!("loading {}", p.display()))
        })
        .collect::<Result<Vec<_>>>()?;

    if let [config] = configs.as_slice() {
        let out = run_single(config, synthetic)?;
        println!("{}", render(&out, full)?);
        return Ok(());
    }

    let mut failed = 0usize;
    for (path, result) in paths.iter().zip(run_batch(&configs, synthetic)) {
        match result {
            Ok(out) => println!("{}", render(&out, full)?),
            Err(e) => {
                error!(config = %path.display(), error = %e, "run failed");
                failed += 1;
            }
        }
    }
    if failed > 0 {
        bail!("{failed} of {} runs failed", configs.len());
    }
    Ok(())
}

fn render(out: &BacktestOutput, full: bool) -> Result<String> {
    let value = if full {
        serde_json::to_value(out)?
    } else {
        let r = &out.result;
        serde_json::json!({
            "symbol": out.symbol,
            "run_id": out.run_id,
            "dataset_hash": out.dataset_hash,
            "synthetic": out.has_synthetic,
            "window": {
                "start": format_ms(r.window.start),
                "end": format_ms(r.window.end),
            },
            "truncation_note": r.truncation_note,
            "warnings": r.warnings.iter().map(|w| w.to_string()).collect::<Vec<_>>(),
            "bars": r.bar_count,
            "final_equity": r.final_equity,
            "open_position": r.open_position,
            "ledger_digest": r.ledger_digest(),
            "summary": out.summary,
            "counters": r.counters,
        })
    };
    Ok(serde_json::to_string_pretty(&value)?)
}

fn check_cmd(path: &Path, timeframe: &str) -> Result<()> {
    let tf = Timeframe::parse(timeframe)?;
    let candles = load_candles(path)?;
    let Some(check) = validate_timeframe(&candles, tf) else {
        bail!("{} holds fewer than two candles", path.display());
    };
    let gaps = interior_gaps(&candles, tf.duration_ms());
    let report = serde_json::json!({
        "file": path.display().to_string(),
        "timeframe": tf.to_string(),
        "first": candles.first().map(|c| format_ms(c.open_time)),
        "last": candles.last().map(|c| format_ms(c.open_time)),
        "check": check,
        "gaps": gaps,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    if !check.ok {
        bail!(
            "{} does not look like {tf} candles (modal spacing {}ms)",
            path.display(),
            check.mode_ms
        );
    }
    Ok(())
}
