//! Position lifecycle state.
//!
//! At most one position exists at any simulated time. The engine owns the
//! state; the rule engine only reads it.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Long,
    Short,
}

impl Side {
    /// +1 for long, -1 for short.
    pub fn sign(&self) -> f64 {
        match self {
            Side::Long => 1.0,
            Side::Short => -1.0,
        }
    }

    /// The tighter of two stop levels: higher for longs, lower for shorts.
    pub fn tighter_stop(&self, a: f64, b: f64) -> f64 {
        match self {
            Side::Long => a.max(b),
            Side::Short => a.min(b),
        }
    }

    /// True when `price` has reached `stop` on the adverse side.
    pub fn stop_hit(&self, stop: f64, low: f64, high: f64) -> bool {
        match self {
            Side::Long => low <= stop,
            Side::Short => high >= stop,
        }
    }
}

/// An open position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenPosition {
    pub side: Side,
    pub entry_price: f64,
    pub entry_time: i64,
    pub entry_bar_index: usize,
    pub quantity: f64,
    pub stop_price: f64,
    pub initial_stop: f64,
    pub entry_fee: f64,
    /// Best unrealized P&L marked at any close since entry.
    pub peak_unrealized_pnl: f64,
    /// Bars elapsed since the entry bar (0 on the entry bar itself).
    pub hold_bars: usize,
    /// Set once profit protection has ratcheted the stop.
    pub tp2_tightened: bool,
}

impl OpenPosition {
    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        self.side.sign() * (price - self.entry_price) * self.quantity
    }

    /// Unrealized return as a fraction of the entry price.
    pub fn unrealized_return(&self, price: f64) -> f64 {
        if self.entry_price <= 0.0 {
            return 0.0;
        }
        self.side.sign() * (price - self.entry_price) / self.entry_price
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum PositionState {
    #[default]
    Flat,
    Open(OpenPosition),
}

impl PositionState {
    pub fn is_flat(&self) -> bool {
        matches!(self, PositionState::Flat)
    }

    pub fn open(&self) -> Option<&OpenPosition> {
        match self {
            PositionState::Open(p) => Some(p),
            PositionState::Flat => None,
        }
    }

    pub fn side(&self) -> Option<Side> {
        self.open().map(|p| p.side)
    }
}
