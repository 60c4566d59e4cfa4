//! ADX: Average Directional Index (Wilder).
//!
//! 1. +DM / -DM from consecutive candles
//! 2. Wilder-smooth +DM, -DM and TR
//! 3. DX = 100 * |+DI - -DI| / (+DI + -DI)
//! 4. ADX = Wilder-smoothed DX
//!
//! Lookback: 2 * period - 1.

use super::atr::{true_range, wilder_smooth};
use super::Indicator;
use crate::domain::Candle;

#[derive(Debug, Clone)]
pub struct Adx {
    period: usize,
    name: String,
}

impl Adx {
    pub fn new(period: usize) -> Self {
        let period = period.max(1);
        Self {
            period,
            name: format!("adx_{period}"),
        }
    }
}

impl Indicator for Adx {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        2 * self.period - 1
    }

    fn compute(&self, candles: &[Candle]) -> Vec<f64> {
        let n = candles.len();
        if n < 2 {
            return vec![f64::NAN; n];
        }

        let mut plus_dm = vec![f64::NAN; n];
        let mut minus_dm = vec![f64::NAN; n];
        for i in 1..n {
            let up = candles[i].high - candles[i - 1].high;
            let down = candles[i - 1].low - candles[i].low;
            if up.is_nan() || down.is_nan() {
                continue;
            }
            plus_dm[i] = if up > down && up > 0.0 { up } else { 0.0 };
            minus_dm[i] = if down > up && down > 0.0 { down } else { 0.0 };
        }

        let mut tr = true_range(candles);
        tr[0] = f64::NAN;
        let smooth_tr = wilder_smooth(&tr, self.period);
        let smooth_plus = wilder_smooth(&plus_dm, self.period);
        let smooth_minus = wilder_smooth(&minus_dm, self.period);

        let mut dx = vec![f64::NAN; n];
        for i in 0..n {
            let (tr, p, m) = (smooth_tr[i], smooth_plus[i], smooth_minus[i]);
            if tr.is_nan() || p.is_nan() || m.is_nan() {
                continue;
            }
            if tr == 0.0 {
                dx[i] = 0.0;
                continue;
            }
            let plus_di = 100.0 * p / tr;
            let minus_di = 100.0 * m / tr;
            let sum = plus_di + minus_di;
            dx[i] = if sum == 0.0 {
                0.0
            } else {
                100.0 * (plus_di - minus_di).abs() / sum
            };
        }

        wilder_smooth(&dx, self.period)
    }
}
