//! MACD histogram.
//!
//! line   = EMA(close, fast) - EMA(close, slow)
//! signal = EMA(line, signal)
//! hist   = line - signal
//!
//! Lookback: (slow - 1) + (signal - 1).

use super::ema::ema_of_series;
use super::Indicator;
use crate::domain::Candle;

#[derive(Debug, Clone)]
pub struct Macd {
    fast: usize,
    slow: usize,
    signal: usize,
    name: String,
}

impl Macd {
    pub fn new(fast: usize, slow: usize, signal: usize) -> Self {
        let fast = fast.max(1);
        let slow = slow.max(fast);
        let signal = signal.max(1);
        Self {
            fast,
            slow,
            signal,
            name: format!("macd_hist_{fast}_{slow}_{signal}"),
        }
    }
}

impl Indicator for Macd {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        (self.slow - 1) + (self.signal - 1)
    }

    fn compute(&self, candles: &[Candle]) -> Vec<f64> {
        let n = candles.len();
        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        let fast = ema_of_series(&closes, self.fast);
        let slow = ema_of_series(&closes, self.slow);
        let line: Vec<f64> = fast.iter().zip(&slow).map(|(f, s)| f - s).collect();

        let mut hist = vec![f64::NAN; n];
        let Some(start) = line.iter().position(|v| !v.is_nan()) else {
            return hist;
        };
        let signal = ema_of_series(&line[start..], self.signal);
        for (offset, sig) in signal.iter().enumerate() {
            hist[start + offset] = line[start + offset] - sig;
        }
        hist
    }
}
