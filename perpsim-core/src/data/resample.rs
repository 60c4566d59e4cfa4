//! Resampling a fine candle sequence into a coarser timeframe.

use crate::domain::{Candle, Timeframe};

/// Aggregate candles into buckets aligned to epoch multiples of `tf`.
///
/// open = first, high = max, low = min, close = last, volume = sum.
/// Input must be sorted by open time. Empty buckets produce no candle.
pub fn resample(candles: &[Candle], tf: Timeframe) -> Vec<Candle> {
    let dur = tf.duration_ms();
    let mut out: Vec<Candle> = Vec::new();
    for c in candles {
        let bucket = c.open_time.div_euclid(dur) * dur;
        match out.last_mut() {
            Some(last) if last.open_time == bucket => {
                last.high = last.high.max(c.high);
                last.low = last.low.min(c.low);
                last.close = c.close;
                last.volume += c.volume;
            }
            _ => out.push(Candle::new(bucket, c.open, c.high, c.low, c.close, c.volume)),
        }
    }
    out
}

/// Drop a trailing bucket that is not yet fully covered by `source`.
///
/// The last resampled candle is complete only when the source holds the
/// final sub-bar of its bucket.
pub fn drop_incomplete_tail(
    resampled: &mut Vec<Candle>,
    source: &[Candle],
    tf: Timeframe,
    source_tf: Timeframe,
) {
    let (Some(last), Some(src_last)) = (resampled.last(), source.last()) else {
        return;
    };
    let bucket_end = last.open_time + tf.duration_ms();
    if src_last.open_time + source_tf.duration_ms() < bucket_end {
        resampled.pop();
    }
}
