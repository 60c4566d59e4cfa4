//! Average True Range (ATR).
//!
//! True Range: max(high-low, |high-prev_close|, |low-prev_close|)
//! Smoothing is either Wilder (alpha = 1/period, SMA seed) or a simple
//! rolling mean of the last `period` true ranges.
//! Lookback: period (TR[0] has no previous close and is discarded).

use super::Indicator;
use crate::domain::Candle;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Smoothing {
    Wilder,
    Simple,
}

#[derive(Debug, Clone)]
pub struct Atr {
    period: usize,
    smoothing: Smoothing,
    name: String,
}

impl Atr {
    pub fn new(period: usize, smoothing: Smoothing) -> Self {
        let period = period.max(1);
        let tag = match smoothing {
            Smoothing::Wilder => "w",
            Smoothing::Simple => "s",
        };
        Self {
            period,
            smoothing,
            name: format!("atr_{tag}{period}"),
        }
    }

    pub fn wilder(period: usize) -> Self {
        Self::new(period, Smoothing::Wilder)
    }

    pub fn simple(period: usize) -> Self {
        Self::new(period, Smoothing::Simple)
    }
}

/// True Range series.
/// TR[0] = high[0] - low[0] (no previous close).
pub fn true_range(candles: &[Candle]) -> Vec<f64> {
    let n = candles.len();
    let mut tr = vec![f64::NAN; n];
    if n == 0 {
        return tr;
    }

    let (h, l) = (candles[0].high, candles[0].low);
    if !(h.is_nan() || l.is_nan()) {
        tr[0] = h - l;
    }
    for i in 1..n {
        let h = candles[i].high;
        let l = candles[i].low;
        let pc = candles[i - 1].close;
        // f64::max drops a NaN operand, so missing inputs are checked up front.
        if h.is_nan() || l.is_nan() || pc.is_nan() {
            continue;
        }
        tr[i] = (h - l).max((h - pc).abs()).max((l - pc).abs());
    }
    tr
}

/// Wilder smoothing. Seed: mean of the first `period` consecutive valid values.
/// A NaN after the seed invalidates the rest of the series.
pub fn wilder_smooth(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if n < period || period == 0 {
        return result;
    }

    let Some(seed_start) = first_valid_run(values, period) else {
        return result;
    };
    let seed_end = seed_start + period;
    let seed: f64 = values[seed_start..seed_end].iter().sum::<f64>() / period as f64;
    result[seed_end - 1] = seed;

    let alpha = 1.0 / period as f64;
    let mut prev = seed;
    for i in seed_end..n {
        if values[i].is_nan() {
            return result;
        }
        let smoothed = alpha * values[i] + (1.0 - alpha) * prev;
        result[i] = smoothed;
        prev = smoothed;
    }
    result
}

/// Rolling mean over the last `period` values; NaN if any is NaN.
pub fn rolling_mean(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if n < period || period == 0 {
        return result;
    }
    for i in (period - 1)..n {
        let window = &values[i + 1 - period..=i];
        if window.iter().any(|v| v.is_nan()) {
            continue;
        }
        result[i] = window.iter().sum::<f64>() / period as f64;
    }
    result
}

fn first_valid_run(values: &[f64], period: usize) -> Option<usize> {
    let mut run = 0;
    for (i, v) in values.iter().enumerate() {
        if v.is_nan() {
            run = 0;
            continue;
        }
        run += 1;
        if run == period {
            return Some(i + 1 - period);
        }
    }
    None
}

impl Indicator for Atr {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, candles: &[Candle]) -> Vec<f64> {
        let mut tr = true_range(candles);
        if let Some(first) = tr.first_mut() {
            *first = f64::NAN;
        }
        match self.smoothing {
            Smoothing::Wilder => wilder_smooth(&tr, self.period),
            Smoothing::Simple => rolling_mean(&tr, self.period),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_ohlc, DEFAULT_EPSILON};

    fn five_bars() -> Vec<Candle> {
        make_ohlc(&[
            (100.0, 105.0, 95.0, 102.0),  // TR = 10
            (102.0, 108.0, 100.0, 106.0), // TR = 8
            (106.0, 107.0, 98.0, 99.0),   // TR = 9
            (99.0, 103.0, 97.0, 101.0),   // TR = 6
            (101.0, 106.0, 100.0, 105.0), // TR = 6
        ])
    }

    #[test]
    fn true_range_basic() {
        let tr = true_range(&five_bars());
        assert_approx(tr[0], 10.0, DEFAULT_EPSILON);
        assert_approx(tr[1], 8.0, DEFAULT_EPSILON);
        assert_approx(tr[2], 9.0, DEFAULT_EPSILON);
    }

    #[test]
    fn true_range_gap_up() {
        let candles = make_ohlc(&[(98.0, 102.0, 97.0, 100.0), (110.0, 115.0, 108.0, 112.0)]);
        let tr = true_range(&candles);
        assert_approx(tr[1], 15.0, DEFAULT_EPSILON);
    }

    #[test]
    fn wilder_atr_period_3() {
        let result = Atr::wilder(3).compute(&five_bars());
        assert!(result[..3].iter().all(|v| v.is_nan()));
        // seed over TR[1..=3] = [8, 9, 6]
        assert_approx(result[3], 23.0 / 3.0, DEFAULT_EPSILON);
        assert_approx(result[4], 64.0 / 9.0, DEFAULT_EPSILON);
    }

    #[test]
    fn simple_atr_period_3() {
        let result = Atr::simple(3).compute(&five_bars());
        assert!(result[..3].iter().all(|v| v.is_nan()));
        assert_approx(result[3], 23.0 / 3.0, DEFAULT_EPSILON);
        // mean(9, 6, 6)
        assert_approx(result[4], 7.0, DEFAULT_EPSILON);
    }

    #[test]
    fn nan_input_gives_nan_true_range() {
        let mut candles = five_bars();
        candles[0].low = f64::NAN;
        candles[2].high = f64::NAN;
        candles[3].close = f64::NAN;
        let tr = true_range(&candles);
        assert!(tr[0].is_nan());
        assert!(!tr[1].is_nan());
        assert!(tr[2].is_nan());
        // bar 4 has no valid previous close
        assert!(tr[4].is_nan());
    }

    #[test]
    fn simple_atr_recovers_after_nan() {
        let mut candles = five_bars();
        candles[1].high = f64::NAN;
        let result = Atr::simple(2).compute(&candles);
        assert!(result[1].is_nan());
        assert!(result[2].is_nan());
        assert!(!result[3].is_nan());
    }

    #[test]
    fn wilder_nan_after_seed_invalidates_tail() {
        let mut candles = five_bars();
        candles[4].low = f64::NAN;
        let result = Atr::wilder(2).compute(&candles);
        assert!(!result[3].is_nan());
        assert!(result[4].is_nan());
    }

    #[test]
    fn atr_lookback() {
        assert_eq!(Atr::wilder(14).lookback(), 14);
        assert_eq!(Atr::simple(5).name(), "atr_s5");
    }
}
