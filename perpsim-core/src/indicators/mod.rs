//! Technical indicators over a candle sequence.
//!
//! Every indicator is a pure function of a candle slice: value `t` depends
//! only on candles `0..=t`. Warmup positions hold `f64::NAN`; snapshot
//! assembly turns them into `None` ("not yet available").

pub mod adx;
pub mod atr;
pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod rsi;
pub mod snapshot;
pub mod structure;

pub use adx::Adx;
pub use atr::{Atr, Smoothing};
pub use bollinger::{Bollinger, BollingerBand};
pub use ema::{ema_slope, Ema};
pub use macd::Macd;
pub use rsi::Rsi;
pub use snapshot::{IndicatorEngine, IndicatorSnapshot};
pub use structure::{Structural, StructuralBand};

use crate::domain::Candle;

/// A single-series indicator.
///
/// # Look-ahead guard
/// No value at index t may depend on a candle at t+1 or later. Every
/// indicator must pass the truncated-vs-full series test.
pub trait Indicator: Send + Sync {
    fn name(&self) -> &str;

    /// Number of leading warmup values (NaN) in the output.
    fn lookback(&self) -> usize;

    /// Output has the same length as `candles`.
    fn compute(&self, candles: &[Candle]) -> Vec<f64>;
}

/// `None` for warmup or non-finite values.
pub fn available(v: f64) -> Option<f64> {
    if v.is_finite() {
        Some(v)
    } else {
        None
    }
}

/// Synthetic candles from closes, one hour apart.
///
/// open = prev close, high = max(open, close) + 1, low = min(open, close) - 1.
#[cfg(test)]
pub fn make_candles(closes: &[f64]) -> Vec<Candle> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Candle::new(
                i as i64 * 3_600_000,
                open,
                open.max(close) + 1.0,
                open.min(close) - 1.0,
                close,
                1000.0,
            )
        })
        .collect()
}

#[cfg(test)]
pub fn make_ohlc(data: &[(f64, f64, f64, f64)]) -> Vec<Candle> {
    data.iter()
        .enumerate()
        .map(|(i, &(o, h, l, c))| Candle::new(i as i64 * 3_600_000, o, h, l, c, 1000.0))
        .collect()
}

#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
