//! The bar-by-bar replay loop.
//!
//! `Simulation` is an iterator over the aligned series. Each step:
//!
//! 1. advances the hold counter of an open position
//! 2. asks the rule engine for a decision on this bar
//! 3. turns the decision into fills through the cost model
//! 4. marks the position to the close and records one equity point
//!
//! Bar i is fully processed before bar i+1 is looked at. A stop update made
//! at bar i's close is first checked against bar i+1's range.

use super::cost_model::CostModel;
use super::state::{RunCounters, RunResult};
use crate::config::SimConfig;
use crate::data::{align, AlignedBar, AlignedSeries};
use crate::domain::{
    Candle, EquityPoint, ExitReason, OpenPosition, PositionState, TimeRange, Trade,
};
use crate::error::PipelineError;
use crate::fingerprint::config_hash;
use crate::indicators::{IndicatorEngine, IndicatorSnapshot};
use crate::strategy::{
    evaluate, ratchet, AccountView, Decision, EntryPlan, EntryRejection, Evaluation,
    IndicatorWindow,
};
use tracing::{debug, info, warn};

/// Outcome of one simulated bar.
#[derive(Debug, Clone, PartialEq)]
pub struct BarStep {
    pub index: usize,
    pub time: i64,
    pub evaluation: Evaluation,
    /// Trade closed on this bar.
    pub trade: Option<Trade>,
    pub equity: f64,
    pub position: PositionState,
}

pub struct Simulation<'a> {
    series: &'a AlignedSeries,
    config: &'a SimConfig,
    snapshots: Vec<IndicatorSnapshot>,
    cost: CostModel,
    position: PositionState,
    cursor: usize,
    realized_gross: f64,
    fees: f64,
    counters: RunCounters,
    trades: Vec<Trade>,
    equity: Vec<EquityPoint>,
}

impl<'a> Simulation<'a> {
    pub fn new(series: &'a AlignedSeries, config: &'a SimConfig) -> Self {
        let engine = IndicatorEngine::from_config(config);
        let snapshots = engine.compute_segments(&series.candles(), &series.segments);
        Self {
            series,
            config,
            snapshots,
            cost: CostModel::from_config(config),
            position: PositionState::Flat,
            cursor: 0,
            realized_gross: 0.0,
            fees: 0.0,
            counters: RunCounters::default(),
            trades: Vec::new(),
            equity: Vec::with_capacity(series.len()),
        }
    }

    pub fn position(&self) -> &PositionState {
        &self.position
    }

    pub fn snapshots(&self) -> &[IndicatorSnapshot] {
        &self.snapshots
    }

    /// Equity with no position marked: capital plus realized P&L minus fees.
    fn settled_equity(&self) -> f64 {
        self.config.initial_capital + self.realized_gross - self.fees
    }

    fn window(&self, bar: &AlignedBar) -> IndicatorWindow<'_> {
        let start = self
            .series
            .segments
            .get(bar.segment)
            .map_or(0, |seg| seg.start);
        IndicatorWindow::new(&self.snapshots[start..=bar.index])
    }

    fn open(&mut self, bar: &AlignedBar, plan: &EntryPlan) {
        let fee = self.cost.fee(plan.fill_price, plan.quantity);
        self.fees += fee;
        self.counters.record_entry(plan.side);
        debug!(
            bar = bar.index,
            side = ?plan.side,
            price = plan.fill_price,
            qty = plan.quantity,
            stop = plan.stop,
            "open"
        );
        self.position = PositionState::Open(OpenPosition {
            side: plan.side,
            entry_price: plan.fill_price,
            entry_time: bar.open_time(),
            entry_bar_index: bar.index,
            quantity: plan.quantity,
            stop_price: plan.stop,
            initial_stop: plan.stop,
            entry_fee: fee,
            peak_unrealized_pnl: 0.0,
            hold_bars: 0,
            tp2_tightened: false,
        });
    }

    fn close(
        &mut self,
        bar: &AlignedBar,
        exit_price: f64,
        reason: Option<ExitReason>,
    ) -> Option<Trade> {
        let PositionState::Open(pos) = std::mem::take(&mut self.position) else {
            return None;
        };
        let gross = pos.unrealized_pnl(exit_price);
        let exit_fee = self.cost.fee(exit_price, pos.quantity);
        self.fees += exit_fee;
        self.realized_gross += gross;
        let realized_pnl = gross - pos.entry_fee - exit_fee;

        // Stop exits are classified by outcome.
        let exit_reason = reason.unwrap_or(if realized_pnl > 0.0 {
            ExitReason::TrailStop
        } else {
            ExitReason::StopLoss
        });

        let trade = Trade {
            side: pos.side,
            entry_time: pos.entry_time,
            exit_time: bar.open_time(),
            entry_bar: pos.entry_bar_index,
            exit_bar: bar.index,
            entry_price: pos.entry_price,
            exit_price,
            quantity: pos.quantity,
            fee_paid: pos.entry_fee + exit_fee,
            realized_pnl,
            exit_reason,
            hold_bars: pos.hold_bars,
            initial_stop: pos.initial_stop,
            tp2_tightened: pos.tp2_tightened,
        };
        debug!(
            bar = bar.index,
            side = ?trade.side,
            price = exit_price,
            pnl = realized_pnl,
            reason = trade.exit_reason.as_str(),
            "close"
        );
        self.counters.record_exit(&trade);
        self.trades.push(trade.clone());
        Some(trade)
    }

    fn apply(&mut self, bar: &AlignedBar, eval: &Evaluation) -> Option<Trade> {
        match eval.decision {
            Decision::NoAction => None,
            Decision::OpenLong(plan) | Decision::OpenShort(plan) => {
                if self.position.is_flat() {
                    self.open(bar, &plan);
                }
                None
            }
            Decision::UpdateStop { new_stop } => {
                if let PositionState::Open(pos) = &mut self.position {
                    pos.stop_price = ratchet(pos.side, pos.stop_price, new_stop);
                    pos.tp2_tightened |= eval.tp2_tightened;
                }
                None
            }
            Decision::CloseAtStop { stop } => {
                let side = self.position.side()?;
                let price = self.cost.exit_fill(side, stop);
                self.close(bar, price, None)
            }
            Decision::CloseForProfitProtection => {
                let side = self.position.side()?;
                let price = self.cost.exit_fill(side, bar.candle.close);
                self.close(bar, price, Some(ExitReason::ProfitProtection))
            }
        }
    }

    fn step(&mut self, bar: &AlignedBar) -> BarStep {
        if let PositionState::Open(pos) = &mut self.position {
            pos.hold_bars += 1;
        }

        let account = AccountView {
            equity: self.settled_equity(),
        };
        let eval = evaluate(bar, self.window(bar), &self.position, &account, self.config);
        self.counters.record(&eval);
        if let Some(snapshot) = self.snapshots.get(bar.index) {
            self.counters.record_band_touch(&bar.candle, snapshot);
        }
        if let Some(EntryRejection::InvalidStop { entry, stop }) = &eval.rejection {
            warn!(bar = bar.index, entry, stop, "entry rejected: invalid stop");
        }

        let mut trade = self.apply(bar, &eval);

        let last = bar.index + 1 == self.series.len();
        if last && self.config.close_at_end {
            let held = self
                .position
                .open()
                .map(|p| (p.side, p.entry_bar_index != bar.index));
            if let Some((side, true)) = held {
                let price = self.cost.exit_fill(side, bar.candle.close);
                trade = self.close(bar, price, Some(ExitReason::EndOfData)).or(trade);
            }
        }

        let close = bar.candle.close;
        let unrealized = match &mut self.position {
            PositionState::Open(pos) => {
                let u = pos.unrealized_pnl(close);
                pos.peak_unrealized_pnl = pos.peak_unrealized_pnl.max(u);
                u
            }
            PositionState::Flat => 0.0,
        };
        let equity = self.settled_equity() + unrealized;
        self.equity.push(EquityPoint {
            time: bar.open_time(),
            equity,
        });

        BarStep {
            index: bar.index,
            time: bar.open_time(),
            evaluation: eval,
            trade,
            equity,
            position: self.position.clone(),
        }
    }

    /// Consume the remaining bars and produce the run result.
    pub fn finish(mut self) -> RunResult {
        while self.next().is_some() {}
        let final_equity = self
            .equity
            .last()
            .map_or(self.config.initial_capital, |p| p.equity);
        RunResult {
            window: self.series.window,
            truncation_note: self.series.truncation_note.clone(),
            warnings: self.series.warnings.clone(),
            gaps: self.series.gaps.clone(),
            initial_capital: self.config.initial_capital,
            final_equity,
            fees_paid: self.fees,
            bar_count: self.series.len(),
            open_position: self.position.side(),
            config_hash: config_hash(self.config),
            counters: self.counters,
            trades: self.trades,
            equity: self.equity,
        }
    }
}

impl Iterator for Simulation<'_> {
    type Item = BarStep;

    fn next(&mut self) -> Option<BarStep> {
        let series = self.series;
        let bar = series.bars.get(self.cursor)?;
        self.cursor += 1;
        Some(self.step(bar))
    }
}

/// Replay an aligned series.
pub fn run_backtest(series: &AlignedSeries, config: &SimConfig) -> RunResult {
    let result = Simulation::new(series, config).finish();
    info!(
        bars = result.bar_count,
        trades = result.trades.len(),
        final_equity = result.final_equity,
        window = %result.window,
        "backtest complete"
    );
    result
}

/// Align both candle sequences, then replay.
pub fn backtest(
    trading: &[Candle],
    filter: &[Candle],
    config: &SimConfig,
    requested: Option<TimeRange>,
) -> Result<RunResult, PipelineError> {
    let series = align(trading, filter, config, requested)?;
    Ok(run_backtest(&series, config))
}
