//! Exponential Moving Average (EMA) and its slope.
//!
//! EMA[t] = alpha * close[t] + (1 - alpha) * EMA[t-1], alpha = 2 / (period + 1)
//! Seed: EMA[period-1] = SMA of the first `period` closes.
//! Lookback: period - 1.

use super::Indicator;
use crate::domain::Candle;

#[derive(Debug, Clone)]
pub struct Ema {
    period: usize,
    name: String,
}

impl Ema {
    pub fn new(period: usize) -> Self {
        let period = period.max(1);
        Self {
            period,
            name: format!("ema_{period}"),
        }
    }
}

impl Indicator for Ema {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, candles: &[Candle]) -> Vec<f64> {
        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        ema_of_series(&closes, self.period)
    }
}

/// EMA over an arbitrary series. NaN in the seed window yields all NaN;
/// NaN after the seed invalidates the rest.
pub fn ema_of_series(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if n < period || period == 0 {
        return result;
    }

    let seed_window = &values[..period];
    if seed_window.iter().any(|v| v.is_nan()) {
        return result;
    }
    let seed = seed_window.iter().sum::<f64>() / period as f64;
    result[period - 1] = seed;

    let alpha = 2.0 / (period as f64 + 1.0);
    let mut prev = seed;
    for i in period..n {
        if values[i].is_nan() {
            return result;
        }
        let ema = alpha * values[i] + (1.0 - alpha) * prev;
        result[i] = ema;
        prev = ema;
    }
    result
}

/// slope[t] = ema[t] - ema[t - lookback].
pub fn ema_slope(ema: &[f64], lookback: usize) -> Vec<f64> {
    let lookback = lookback.max(1);
    let mut result = vec![f64::NAN; ema.len()];
    for t in lookback..ema.len() {
        result[t] = ema[t] - ema[t - lookback];
    }
    result
}
