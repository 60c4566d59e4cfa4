//! Trade: a closed round trip, and the per-bar equity point.

use super::position::Side;
use serde::{Deserialize, Serialize};

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    /// Stop hit with a non-positive realized result.
    StopLoss,
    /// Stop hit after it trailed into profit.
    TrailStop,
    /// Closed by the profit-protection rule.
    ProfitProtection,
    /// Still open on the last bar and closed there.
    EndOfData,
}

impl ExitReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExitReason::StopLoss => "stop_loss",
            ExitReason::TrailStop => "trail_stop",
            ExitReason::ProfitProtection => "profit_protection",
            ExitReason::EndOfData => "end_of_data",
        }
    }
}

/// A closed position record. Appended at exit, never modified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub side: Side,
    pub entry_time: i64,
    pub exit_time: i64,
    pub entry_bar: usize,
    pub exit_bar: usize,
    pub entry_price: f64,
    pub exit_price: f64,
    pub quantity: f64,
    /// Entry fee plus exit fee.
    pub fee_paid: f64,
    /// Net of both fees.
    pub realized_pnl: f64,
    pub exit_reason: ExitReason,
    pub hold_bars: usize,
    pub initial_stop: f64,
    pub tp2_tightened: bool,
}

impl Trade {
    pub fn gross_pnl(&self) -> f64 {
        self.realized_pnl + self.fee_paid
    }

    pub fn is_winner(&self) -> bool {
        self.realized_pnl > 0.0
    }

    /// Net return as a fraction of entry notional.
    pub fn return_pct(&self) -> f64 {
        let notional = self.entry_price * self.quantity;
        if notional == 0.0 {
            return 0.0;
        }
        self.realized_pnl / notional
    }
}

/// Account equity at a bar's close.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub time: i64,
    pub equity: f64,
}
