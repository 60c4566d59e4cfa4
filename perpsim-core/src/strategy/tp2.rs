//! Profit protection ("TP2 invalid").
//!
//! Once a position is in profit by at least the threshold and has been held
//! long enough, its stop is pulled in toward price (or, when configured, the
//! position is closed).

use super::stops::ratchet;
use crate::config::{SimConfig, TightenTarget};
use crate::domain::{OpenPosition, Side};
use serde::{Deserialize, Serialize};

/// Gate result, checked in order: loss, profit threshold, hold time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tp2Outcome {
    Loss,
    ProfitGate,
    HoldGate,
    Allow,
}

pub fn tp2_check(position: &OpenPosition, close: f64, config: &SimConfig) -> Tp2Outcome {
    if position.unrealized_pnl(close) <= 0.0 {
        return Tp2Outcome::Loss;
    }
    if position.unrealized_return(close) < config.min_profit_for(position.side) {
        return Tp2Outcome::ProfitGate;
    }
    if position.hold_bars < config.min_hold_bars {
        return Tp2Outcome::HoldGate;
    }
    Tp2Outcome::Allow
}

/// Target stop level for profit protection.
///
/// `trail` is the current ATR trail and `boll_mid` the Bollinger middle
/// band; each is `None` when unavailable.
pub fn tp2_target(
    side: Side,
    entry: f64,
    close: f64,
    trail: Option<f64>,
    boll_mid: Option<f64>,
    target: TightenTarget,
) -> Option<f64> {
    let mid = (entry + close) / 2.0;
    match target {
        TightenTarget::Mid => Some(mid),
        TightenTarget::AtrTrail => trail,
        TightenTarget::BollMid => boll_mid,
        TightenTarget::Tighter => Some(match trail {
            Some(t) => ratchet(side, mid, t),
            None => mid,
        }),
    }
}
