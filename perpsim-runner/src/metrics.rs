//! Performance summary: pure functions over a run result.
//!
//! Equity curve and/or trade list in, scalar out. Annualisation uses the
//! trading timeframe's periods per year (crypto perps trade 24/7).

use perpsim_core::domain::{ExitReason, Side, Timeframe, Trade};
use perpsim_core::RunResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SideStats {
    pub trades: usize,
    pub total_pnl: f64,
    pub win_rate: f64,
    pub profit_factor: f64,
}

/// Count and P&L of the trades closed for one exit reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasonPnl {
    pub count: usize,
    pub total_pnl: f64,
    pub avg_pnl: f64,
}

/// Statistics over one class of stop exit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StopStats {
    pub count: usize,
    pub total_pnl: f64,
    pub avg_pnl: f64,
    pub win_rate: f64,
    pub hold_hours_p25: f64,
    pub hold_hours_p50: f64,
    pub hold_hours_p75: f64,
}

impl StopStats {
    fn compute(trades: &[&Trade], bar_hours: f64) -> Self {
        if trades.is_empty() {
            return Self::default();
        }
        let count = trades.len();
        let total_pnl: f64 = trades.iter().map(|t| t.realized_pnl).sum();
        let mut hours: Vec<f64> = trades.iter().map(|t| t.hold_bars as f64 * bar_hours).collect();
        hours.sort_by(f64::total_cmp);
        Self {
            count,
            total_pnl,
            avg_pnl: total_pnl / count as f64,
            win_rate: trades.iter().filter(|t| t.is_winner()).count() as f64 / count as f64,
            hold_hours_p25: quantile(&hours, 0.25),
            hold_hours_p50: quantile(&hours, 0.5),
            hold_hours_p75: quantile(&hours, 0.75),
        }
    }
}

/// Stop exits split by outcome.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StopBreakdown {
    /// `stop_loss` exits.
    pub loss_stop: StopStats,
    /// `trail_stop` exits.
    pub profit_stop: StopStats,
}

/// Aggregate statistics for a single run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSummary {
    pub total_return: f64,
    pub net_pnl: f64,
    pub fees_paid: f64,
    pub max_drawdown: f64,
    pub sharpe: f64,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub trade_count: usize,
    /// Fraction of trades whose stop profit protection tightened.
    pub tp2_rate: f64,
    pub exit_reasons: BTreeMap<ExitReason, usize>,
    pub exit_reason_pnl: BTreeMap<ExitReason, ReasonPnl>,
    pub stop_breakdown: StopBreakdown,
    pub per_side: BTreeMap<String, SideStats>,
}

impl PerformanceSummary {
    pub fn compute(result: &RunResult, trading_tf: Timeframe) -> Self {
        let equity: Vec<f64> = result.equity.iter().map(|p| p.equity).collect();
        let trades = &result.trades;
        let bar_hours = trading_tf.duration_ms() as f64 / 3_600_000.0;

        let mut exit_reasons = BTreeMap::new();
        for t in trades {
            *exit_reasons.entry(t.exit_reason).or_insert(0) += 1;
        }
        let exit_reason_pnl = exit_reason_pnl(trades);
        let stops = |reason: ExitReason| {
            let subset: Vec<&Trade> = trades.iter().filter(|t| t.exit_reason == reason).collect();
            StopStats::compute(&subset, bar_hours)
        };
        let stop_breakdown = StopBreakdown {
            loss_stop: stops(ExitReason::StopLoss),
            profit_stop: stops(ExitReason::TrailStop),
        };

        let mut per_side = BTreeMap::new();
        for (side, name) in [(Side::Long, "long"), (Side::Short, "short")] {
            let side_trades: Vec<Trade> =
                trades.iter().filter(|t| t.side == side).cloned().collect();
            per_side.insert(
                name.to_string(),
                SideStats {
                    trades: side_trades.len(),
                    total_pnl: side_trades.iter().map(|t| t.realized_pnl).sum(),
                    win_rate: win_rate(&side_trades),
                    profit_factor: profit_factor(&side_trades),
                },
            );
        }

        Self {
            total_return: total_return(result.initial_capital, result.final_equity),
            net_pnl: result.net_pnl(),
            fees_paid: result.fees_paid,
            max_drawdown: max_drawdown(&equity),
            sharpe: sharpe_ratio(&equity, trading_tf.periods_per_year()),
            win_rate: win_rate(trades),
            profit_factor: profit_factor(trades),
            trade_count: trades.len(),
            tp2_rate: tp2_rate(trades),
            exit_reasons,
            exit_reason_pnl,
            stop_breakdown,
            per_side,
        }
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// (final - initial) / initial. Zero when there is no starting capital.
pub fn total_return(initial: f64, final_equity: f64) -> f64 {
    if initial <= 0.0 {
        return 0.0;
    }
    (final_equity - initial) / initial
}

/// Maximum drawdown as a negative fraction (e.g., -0.15 = 15% drawdown).
///
/// Points while the running peak is not positive are ignored.
pub fn max_drawdown(equity_curve: &[f64]) -> f64 {
    let Some(&first) = equity_curve.first() else {
        return 0.0;
    };
    let mut peak = first;
    let mut max_dd = 0.0_f64;
    for &eq in equity_curve {
        if eq > peak {
            peak = eq;
        }
        if peak > 0.0 {
            max_dd = max_dd.min((eq - peak) / peak);
        }
    }
    max_dd
}

/// Annualised Sharpe ratio of per-bar returns (risk-free rate zero).
///
/// Returns 0.0 with fewer than two returns or zero variance.
pub fn sharpe_ratio(equity_curve: &[f64], periods_per_year: f64) -> f64 {
    let returns = bar_returns(equity_curve);
    if returns.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(&returns);
    let std = std_dev(&returns);
    if std < 1e-15 {
        return 0.0;
    }
    mean / std * periods_per_year.sqrt()
}

pub fn win_rate(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    trades.iter().filter(|t| t.is_winner()).count() as f64 / trades.len() as f64
}

/// Gross profits / gross losses, capped at 100.0 (all winners).
pub fn profit_factor(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let gross_profit: f64 = trades
        .iter()
        .filter(|t| t.realized_pnl > 0.0)
        .map(|t| t.realized_pnl)
        .sum();
    let gross_loss: f64 = trades
        .iter()
        .filter(|t| t.realized_pnl < 0.0)
        .map(|t| t.realized_pnl.abs())
        .sum();
    if gross_loss < 1e-10 {
        return if gross_profit > 0.0 { 100.0 } else { 0.0 };
    }
    (gross_profit / gross_loss).min(100.0)
}

pub fn tp2_rate(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    trades.iter().filter(|t| t.tp2_tightened).count() as f64 / trades.len() as f64
}

pub fn exit_reason_pnl(trades: &[Trade]) -> BTreeMap<ExitReason, ReasonPnl> {
    let mut out: BTreeMap<ExitReason, ReasonPnl> = BTreeMap::new();
    for t in trades {
        let entry = out.entry(t.exit_reason).or_insert(ReasonPnl {
            count: 0,
            total_pnl: 0.0,
            avg_pnl: 0.0,
        });
        entry.count += 1;
        entry.total_pnl += t.realized_pnl;
    }
    for r in out.values_mut() {
        r.avg_pnl = r.total_pnl / r.count as f64;
    }
    out
}

// ─── Helpers ────────────────────────────────────────────────────────

/// Linearly interpolated quantile of an ascending slice; 0.0 when empty.
pub fn quantile(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let pos = q.clamp(0.0, 1.0) * (n - 1) as f64;
            let lo = pos.floor() as usize;
            let hi = pos.ceil() as usize;
            sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
        }
    }
}

/// Simple returns between consecutive positive equity points.
pub fn bar_returns(equity_curve: &[f64]) -> Vec<f64> {
    equity_curve
        .windows(2)
        .filter(|w| w[0] > 0.0)
        .map(|w| (w[1] - w[0]) / w[0])
        .collect()
}

fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation.
fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean_f64(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    var.sqrt()
}
