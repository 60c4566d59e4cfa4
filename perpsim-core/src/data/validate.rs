//! Timeframe self-check for a candle sequence.

use super::gaps::estimate_bars;
use crate::domain::{Candle, Timeframe};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Estimated/actual bar count ratio above which the check fails.
pub const MAX_BAR_RATIO: f64 = 10.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeframeCheck {
    pub ok: bool,
    /// Most frequent spacing between consecutive open times.
    pub mode_ms: i64,
    pub expected_ms: i64,
    pub bars_est: usize,
    pub bars_actual: usize,
    pub ratio: f64,
}

/// Check that `candles` really are `tf` candles.
///
/// Passes when the modal open-time spacing equals the timeframe duration and
/// the grid estimate and actual count differ by at most `MAX_BAR_RATIO`.
/// Returns `None` for fewer than two candles.
pub fn validate_timeframe(candles: &[Candle], tf: Timeframe) -> Option<TimeframeCheck> {
    if candles.len() < 2 {
        return None;
    }
    let expected_ms = tf.duration_ms();

    let mut counts: BTreeMap<i64, usize> = BTreeMap::new();
    for pair in candles.windows(2) {
        *counts.entry(pair[1].open_time - pair[0].open_time).or_default() += 1;
    }
    // Ties resolve to the smallest spacing.
    let mode_ms = counts
        .iter()
        .fold((0i64, 0usize), |best, (&d, &n)| if n > best.1 { (d, n) } else { best })
        .0;

    let first = candles[0].open_time;
    let last = candles[candles.len() - 1].open_time;
    let bars_est = estimate_bars(first, last, expected_ms);
    let bars_actual = candles.len();
    let est = bars_est.max(1) as f64;
    let act = bars_actual.max(1) as f64;
    let ratio = (act / est).max(est / act);

    Some(TimeframeCheck {
        ok: mode_ms == expected_ms && ratio <= MAX_BAR_RATIO,
        mode_ms,
        expected_ms,
        bars_est,
        bars_actual,
        ratio,
    })
}
