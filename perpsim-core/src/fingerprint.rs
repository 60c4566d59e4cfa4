//! Deterministic identification of configurations and datasets.
//!
//! Hashes are BLAKE3 over canonical serde_json output, hex encoded.

use crate::config::SimConfig;
use crate::domain::Candle;

/// Hash of every simulation parameter.
pub fn config_hash(config: &SimConfig) -> String {
    let json = serde_json::to_vec(config).unwrap_or_default();
    blake3::hash(&json).to_hex().to_string()
}

/// Hash of a candle sequence, over open time and OHLCV bit patterns.
pub fn dataset_hash(candles: &[Candle]) -> String {
    let mut hasher = blake3::Hasher::new();
    for c in candles {
        hasher.update(&c.open_time.to_le_bytes());
        for v in [c.open, c.high, c.low, c.close, c.volume] {
            hasher.update(&v.to_bits().to_le_bytes());
        }
    }
    hasher.finalize().to_hex().to_string()
}
