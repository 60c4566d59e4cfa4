//! Run counters and the run result.

use crate::data::{Gap, PipelineWarning};
use crate::domain::{Candle, EquityPoint, ExitReason, Side, TimeRange, Trade};
use crate::indicators::IndicatorSnapshot;
use crate::strategy::{EntryRejection, Evaluation, Tp2Outcome};
use serde::{Deserialize, Serialize};

/// Diagnostic counts accumulated over a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunCounters {
    pub long_signals: usize,
    pub short_signals: usize,
    pub long_entries: usize,
    pub short_entries: usize,
    pub bear_gate_pass: usize,
    /// Short signals rejected by BearGate.
    pub bear_gate_fail: usize,
    pub range_blocked: usize,
    pub invalid_stop: usize,
    pub indicator_unavailable: usize,
    pub zero_quantity: usize,
    pub tp2_blocked_loss: usize,
    pub tp2_blocked_profit: usize,
    pub tp2_blocked_hold: usize,
    pub tp2_allowed: usize,
    pub tp2_tightened: usize,
    /// Exits of positions whose stop profit protection had tightened.
    pub exits_after_tp2: usize,
    pub stop_loss_exits: usize,
    pub trail_stop_exits: usize,
    pub profit_protection_exits: usize,
    pub end_of_data_exits: usize,
    /// Bars whose low reached the lower Bollinger band.
    pub band_touch_long: usize,
    /// Bars whose high reached the upper Bollinger band.
    pub band_touch_short: usize,
}

impl RunCounters {
    pub fn record(&mut self, eval: &Evaluation) {
        match eval.signal {
            Some(Side::Long) => self.long_signals += 1,
            Some(Side::Short) => self.short_signals += 1,
            None => {}
        }
        match eval.gate {
            Some(g) if g.is_pass() => self.bear_gate_pass += 1,
            Some(_) => self.bear_gate_fail += 1,
            None => {}
        }
        if eval.range_blocked {
            self.range_blocked += 1;
        }
        match &eval.rejection {
            Some(EntryRejection::InvalidStop { .. }) => self.invalid_stop += 1,
            Some(EntryRejection::IndicatorUnavailable { .. }) => self.indicator_unavailable += 1,
            Some(EntryRejection::ZeroQuantity) => self.zero_quantity += 1,
            None => {}
        }
        match eval.tp2 {
            Some(Tp2Outcome::Loss) => self.tp2_blocked_loss += 1,
            Some(Tp2Outcome::ProfitGate) => self.tp2_blocked_profit += 1,
            Some(Tp2Outcome::HoldGate) => self.tp2_blocked_hold += 1,
            Some(Tp2Outcome::Allow) => self.tp2_allowed += 1,
            None => {}
        }
        if eval.tp2_tightened {
            self.tp2_tightened += 1;
        }
    }

    pub fn record_band_touch(&mut self, candle: &Candle, snapshot: &IndicatorSnapshot) {
        if snapshot.boll_lower.is_some_and(|lower| candle.low <= lower) {
            self.band_touch_long += 1;
        }
        if snapshot.boll_upper.is_some_and(|upper| candle.high >= upper) {
            self.band_touch_short += 1;
        }
    }

    pub fn record_entry(&mut self, side: Side) {
        match side {
            Side::Long => self.long_entries += 1,
            Side::Short => self.short_entries += 1,
        }
    }

    pub fn record_exit(&mut self, trade: &Trade) {
        match trade.exit_reason {
            ExitReason::StopLoss => self.stop_loss_exits += 1,
            ExitReason::TrailStop => self.trail_stop_exits += 1,
            ExitReason::ProfitProtection => self.profit_protection_exits += 1,
            ExitReason::EndOfData => self.end_of_data_exits += 1,
        }
        if trade.tp2_tightened {
            self.exits_after_tp2 += 1;
        }
    }
}

/// Everything one simulation produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub trades: Vec<Trade>,
    pub equity: Vec<EquityPoint>,
    pub window: TimeRange,
    pub truncation_note: Option<String>,
    pub warnings: Vec<PipelineWarning>,
    pub gaps: Vec<Gap>,
    pub counters: RunCounters,
    pub initial_capital: f64,
    pub final_equity: f64,
    pub fees_paid: f64,
    pub bar_count: usize,
    /// Position still open after the last bar, if any.
    pub open_position: Option<Side>,
    pub config_hash: String,
}

impl RunResult {
    /// BLAKE3 over the serialized trade ledger and equity curve.
    ///
    /// Two runs over the same inputs and config produce the same digest.
    pub fn ledger_digest(&self) -> String {
        let bytes = serde_json::to_vec(&(&self.trades, &self.equity)).unwrap_or_default();
        blake3::hash(&bytes).to_hex().to_string()
    }

    pub fn net_pnl(&self) -> f64 {
        self.final_equity - self.initial_capital
    }
}
