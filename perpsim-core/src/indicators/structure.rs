//! Structural high / low: highest high and lowest low over the trailing
//! `n` candles including the current one.
//!
//! Lookback: n - 1.

use super::Indicator;
use crate::domain::Candle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructuralBand {
    High,
    Low,
}

#[derive(Debug, Clone)]
pub struct Structural {
    period: usize,
    band: StructuralBand,
    name: String,
}

impl Structural {
    pub fn high(period: usize) -> Self {
        let period = period.max(1);
        Self {
            period,
            band: StructuralBand::High,
            name: format!("structural_high_{period}"),
        }
    }

    pub fn low(period: usize) -> Self {
        let period = period.max(1);
        Self {
            period,
            band: StructuralBand::Low,
            name: format!("structural_low_{period}"),
        }
    }
}

impl Indicator for Structural {
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
            let mut acc = match self.band {
                StructuralBand::High => f64::NEG_INFINITY,
                StructuralBand::Low => f64::INFINITY,
            };
            let mut has_nan = false;
            for c in window {
                let v = match self.band {
                    StructuralBand::High => c.high,
                    StructuralBand::Low => c.low,
                };
                if v.is_nan() {
                    has_nan = true;
                    break;
                }
                acc = match self.band {
                    StructuralBand::High => acc.max(v),
                    StructuralBand::Low => acc.min(v),
                };
            }
            if !has_nan {
                result[i] = acc;
            }
        }
        result
    }
}
