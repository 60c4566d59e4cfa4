//! Relative Strength Index (RSI), Wilder-smoothed.
//!
//! RSI = 100 - 100 / (1 + avg_gain / avg_loss)
//! Lookback: period.

use super::atr::wilder_smooth;
use super::Indicator;
use crate::domain::Candle;

#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    name: String,
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        let period = period.max(1);
        Self {
            period,
            name: format!("rsi_{period}"),
        }
    }
}

impl Indicator for Rsi {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, candles: &[Candle]) -> Vec<f64> {
        let n = candles.len();
        let mut gains = vec![f64::NAN; n];
        let mut losses = vec![f64::NAN; n];
        for i in 1..n {
            let change = candles[i].close - candles[i - 1].close;
            if change.is_nan() {
                continue;
            }
            gains[i] = change.max(0.0);
            losses[i] = (-change).max(0.0);
        }

        let avg_gain = wilder_smooth(&gains, self.period);
        let avg_loss = wilder_smooth(&losses, self.period);
        avg_gain
            .iter()
            .zip(&avg_loss)
            .map(|(&g, &l)| {
                if g.is_nan() || l.is_nan() {
                    f64::NAN
                } else {
                    rsi_value(g, l)
                }
            })
            .collect()
    }
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 && avg_gain == 0.0 {
        50.0
    } else if avg_loss == 0.0 {
        100.0
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_candles};

    #[test]
    fn all_gains_is_100() {
        let result = Rsi::new(3).compute(&make_candles(&[100.0, 101.0, 102.0, 103.0, 104.0]));
        assert!(result[..3].iter().all(|v| v.is_nan()));
        assert_approx(result[3], 100.0, 1e-9);
        assert_approx(result[4], 100.0, 1e-9);
    }

    #[test]
    fn all_losses_is_0() {
        let result = Rsi::new(3).compute(&make_candles(&[104.0, 103.0, 102.0, 101.0]));
        assert_approx(result[3], 0.0, 1e-9);
    }

    #[test]
    fn mixed_seed_value() {
        // changes +0.34, -0.25, -0.48: avg_gain 0.34/3, avg_loss 0.73/3
        let result = Rsi::new(3).compute(&make_candles(&[44.0, 44.34, 44.09, 43.61]));
        assert_approx(result[3], 100.0 - 100.0 / (1.0 + 0.34 / 0.73), 1e-9);
    }

    #[test]
    fn flat_prices_are_neutral() {
        let result = Rsi::new(2).compute(&make_candles(&[10.0, 10.0, 10.0, 10.0]));
        assert_approx(result[3], 50.0, 1e-9);
    }

    #[test]
    fn bounded() {
        let closes = [100.0, 105.0, 98.0, 110.0, 95.0, 115.0, 90.0, 120.0];
        for &v in Rsi::new(3).compute(&make_candles(&closes)).iter() {
            assert!(v.is_nan() || (0.0..=100.0).contains(&v));
        }
    }

    #[test]
    fn nan_close_in_seed_is_unavailable() {
        let mut candles = make_candles(&[100.0, 101.0, 102.0, 103.0]);
        candles[2].close = f64::NAN;
        assert!(Rsi::new(3).compute(&candles).iter().all(|v| v.is_nan()));
    }

    #[test]
    fn rsi_lookback() {
        assert_eq!(Rsi::new(14).lookback(), 14);
    }
}
