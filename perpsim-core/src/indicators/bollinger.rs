//! Bollinger Bands: SMA(close, period) +/- multiplier * stddev.
//!
//! Population stddev. Lookback: period - 1.

use super::Indicator;
use crate::domain::Candle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BollingerBand {
    Upper,
    Middle,
    Lower,
}

#[derive(Debug, Clone)]
pub struct Bollinger {
    period: usize,
    multiplier: f64,
    band: BollingerBand,
    name: String,
}

impl Bollinger {
    pub fn new(band: BollingerBand, period: usize, multiplier: f64) -> Self {
        let period = period.max(1);
        let tag = match band {
            BollingerBand::Upper => "upper",
            BollingerBand::Middle => "mid",
            BollingerBand::Lower => "lower",
        };
        Self {
            period,
            multiplier,
            band,
            name: format!("boll_{tag}_{period}_{multiplier}"),
        }
    }

    pub fn upper(period: usize, multiplier: f64) -> Self {
        Self::new(BollingerBand::Upper, period, multiplier)
    }

    pub fn middle(period: usize) -> Self {
        Self::new(BollingerBand::Middle, period, 0.0)
    }

    pub fn lower(period: usize, multiplier: f64) -> Self {
        Self::new(BollingerBand::Lower, period, multiplier)
    }
}

impl Indicator for Bollinger {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, candles: &[Candle]) -> Vec<f64> {
        let n = candles.len();
        let mut result = vec![f64::NAN; n];
        if n < self.period {
            return result;
        }

        for i in (self.period - 1)..n {
            let window = &candles[i + 1 - self.period..=i];
            if window.iter().any(|c| c.close.is_nan()) {
                continue;
            }
            let mean = window.iter().map(|c| c.close).sum::<f64>() / self.period as f64;
            if self.band == BollingerBand::Middle {
                result[i] = mean;
                continue;
            }
            let variance = window
                .iter()
                .map(|c| (c.close - mean).powi(2))
                .sum::<f64>()
                / self.period as f64;
            let offset = self.multiplier * variance.sqrt();
            result[i] = match self.band {
                BollingerBand::Upper => mean + offset,
                _ => mean - offset,
            };
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_candles, DEFAULT_EPSILON};

    #[test]
    fn middle_is_sma() {
        let result = Bollinger::middle(3).compute(&make_candles(&[10.0, 11.0, 12.0, 13.0, 14.0]));
        assert!(result[0].is_nan());
        assert!(result[1].is_nan());
        assert_approx(result[2], 11.0, DEFAULT_EPSILON);
        assert_approx(result[4], 13.0, DEFAULT_EPSILON);
    }

    #[test]
    fn bands_are_symmetric() {
        let candles = make_candles(&[10.0, 11.0, 12.0, 13.0, 14.0]);
        let upper = Bollinger::upper(3, 2.0).compute(&candles);
        let middle = Bollinger::middle(3).compute(&candles);
        let lower = Bollinger::lower(3, 2.0).compute(&candles);
        for i in 2..5 {
            assert_approx(upper[i] - middle[i], middle[i] - lower[i], DEFAULT_EPSILON);
            assert!(upper[i] > middle[i]);
        }
    }

    #[test]
    fn constant_price_collapses_bands() {
        let candles = make_candles(&[100.0; 4]);
        assert_approx(Bollinger::upper(3, 2.0).compute(&candles)[3], 100.0, DEFAULT_EPSILON);
        assert_approx(Bollinger::lower(3, 2.0).compute(&candles)[3], 100.0, DEFAULT_EPSILON);
    }

    #[test]
    fn nan_in_window_is_unavailable() {
        let mut candles = make_candles(&[10.0, 11.0, 12.0, 13.0, 14.0, 15.0]);
        candles[2].close = f64::NAN;
        let result = Bollinger::upper(3, 2.0).compute(&candles);
        assert!(result[2..5].iter().all(|v| v.is_nan()));
        assert!(!result[5].is_nan());
    }

    #[test]
    fn bollinger_lookback() {
        assert_eq!(Bollinger::upper(20, 2.0).lookback(), 19);
    }
}
