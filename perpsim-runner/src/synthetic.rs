//! Synthetic candles for offline smoke runs.
//!
//! A seeded random walk with mild drift regimes. Clearly fake; results on
//! synthetic data are tagged as such in the run summary.

use perpsim_core::domain::{Candle, Timeframe};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticConfig {
    pub bars: usize,
    pub seed: u64,
    pub start_price: f64,
    /// Per-bar return range is `[-volatility, volatility]` around the drift.
    pub volatility: f64,
    /// Open time of the first candle, epoch milliseconds.
    pub start_time: i64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            bars: 3_000,
            seed: 42,
            start_price: 100.0,
            volatility: 0.01,
            start_time: 1_704_067_200_000,
        }
    }
}

/// Generate `config.bars` contiguous candles of timeframe `tf`.
///
/// The same config always produces the same candles.
pub fn generate(config: &SyntheticConfig, tf: Timeframe) -> Vec<Candle> {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let dur = tf.duration_ms();
    // Align to the timeframe grid so resampled buckets line up.
    let start = config.start_time.div_euclid(dur) * dur;

    let vol = config.volatility.abs().max(1e-6);
    let mut price = config.start_price.max(1e-6);
    let mut drift = 0.0_f64;
    let mut bars = Vec::with_capacity(config.bars);

    for i in 0..config.bars {
        // Regime switch roughly every 200 bars.
        if rng.gen_range(0..200) == 0 {
            drift = rng.gen_range(-0.3..0.3) * vol;
        }
        let ret: f64 = drift + rng.gen_range(-vol..vol);
        let open = price;
        let close = (price * (1.0 + ret)).max(1e-6);
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..vol));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..vol));
        let volume = rng.gen_range(100.0..10_000.0);

        bars.push(Candle::new(start + i as i64 * dur, open, high, low, close, volume));
        price = close;
    }
    bars
}
