//! BearGate: the extra condition every short entry must pass.
//!
//! Filter-timeframe ADX >= threshold AND filter-timeframe EMA slope < 0, both
//! read from the snapshot attached to the current bar. A missing snapshot or
//! missing value fails the gate.

use crate::data::FilterSnapshot;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateOutcome {
    Pass,
    Unavailable,
    AdxBelowThreshold,
    SlopeNotNegative,
}

impl GateOutcome {
    pub fn is_pass(&self) -> bool {
        matches!(self, GateOutcome::Pass)
    }
}

pub fn bear_gate(filter: Option<&FilterSnapshot>, adx_threshold: f64) -> GateOutcome {
    let Some((adx, slope)) = filter.and_then(|f| f.adx.zip(f.ema_slope)) else {
        return GateOutcome::Unavailable;
    };
    if adx < adx_threshold {
        GateOutcome::AdxBelowThreshold
    } else if slope >= 0.0 {
        GateOutcome::SlopeNotNegative
    } else {
        GateOutcome::Pass
    }
}
