//! Stop placement and the ratchet rule.
//!
//! Stops may tighten, never loosen: for longs a stop only rises, for shorts
//! it only falls, whatever the ATR does.

use crate::domain::Side;
use crate::indicators::IndicatorSnapshot;

/// entry ∓ multiplier × ATR.
pub fn atr_stop(side: Side, entry: f64, atr: f64, multiplier: f64) -> f64 {
    entry - side.sign() * multiplier * atr
}

/// Structural low (long) or high (short) from the snapshot of the bar
/// before entry.
pub fn structural_stop(side: Side, previous: &IndicatorSnapshot) -> Option<f64> {
    match side {
        Side::Long => previous.structural_low,
        Side::Short => previous.structural_high,
    }
}

/// The bound closer to entry on the loss side: max for longs, min for shorts.
pub fn initial_stop(side: Side, atr_stop: f64, structural_stop: f64) -> f64 {
    side.tighter_stop(atr_stop, structural_stop)
}

/// Trailing candidate from the current close and ATR.
pub fn trail_candidate(side: Side, close: f64, atr: f64, multiplier: f64) -> f64 {
    close - side.sign() * multiplier * atr
}

/// Apply the ratchet: the proposed level is accepted only if it tightens.
pub fn ratchet(side: Side, current: f64, proposed: f64) -> f64 {
    if proposed.is_nan() {
        return current;
    }
    side.tighter_stop(current, proposed)
}

/// True when `new` is strictly tighter than `old`.
pub fn is_tighter(side: Side, old: f64, new: f64) -> bool {
    match side {
        Side::Long => new > old,
        Side::Short => new < old,
    }
}
