//! Missing-bar detection.
//!
//! Gaps are reported, never filled: no synthetic candle is created for a
//! missing open time.

use crate::domain::{Candle, TimeRange};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// A run of absent candles, as the inclusive range of their open times.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gap {
    pub missing: TimeRange,
    pub bars: usize,
}

impl Gap {
    fn new(start: i64, end: i64, interval_ms: i64) -> Self {
        Self {
            missing: TimeRange::new(start, end),
            bars: estimate_bars(start, end, interval_ms),
        }
    }
}

/// Number of grid slots in `[start, end]` for a given interval.
pub fn estimate_bars(start: i64, end: i64, interval_ms: i64) -> usize {
    if end < start || interval_ms <= 0 {
        return 0;
    }
    ((end - start) / interval_ms + 1) as usize
}

/// Missing open-time segments within `[start, end]`, leading, interior and
/// trailing. `open_times` must be sorted.
pub fn missing_segments(start: i64, end: i64, interval_ms: i64, open_times: &[i64]) -> Vec<Gap> {
    if start > end || interval_ms <= 0 {
        return Vec::new();
    }
    let (Some(&first), Some(&last)) = (open_times.first(), open_times.last()) else {
        return vec![Gap::new(start, end, interval_ms)];
    };

    let mut segments = Vec::new();
    if first > start {
        let seg_end = (first - interval_ms).min(end);
        if start <= seg_end {
            segments.push(Gap::new(start, seg_end, interval_ms));
        }
    }
    for pair in open_times.windows(2) {
        let (prev, next) = (pair[0], pair[1]);
        if next - prev > interval_ms {
            let seg_start = (prev + interval_ms).max(start);
            let seg_end = (next - interval_ms).min(end);
            if seg_start <= seg_end {
                segments.push(Gap::new(seg_start, seg_end, interval_ms));
            }
        }
    }
    if last < end {
        let seg_start = (last + interval_ms).max(start);
        if seg_start <= end {
            segments.push(Gap::new(seg_start, end, interval_ms));
        }
    }
    segments
}

/// Interior gaps of a sorted candle sequence.
pub fn interior_gaps(candles: &[Candle], interval_ms: i64) -> Vec<Gap> {
    match (candles.first(), candles.last()) {
        (Some(first), Some(last)) => {
            let times: Vec<i64> = candles.iter().map(|c| c.open_time).collect();
            missing_segments(first.open_time, last.open_time, interval_ms, &times)
        }
        _ => Vec::new(),
    }
}

/// Index ranges of maximal runs whose consecutive open times are exactly
/// one interval apart.
pub fn contiguous_runs(candles: &[Candle], interval_ms: i64) -> Vec<Range<usize>> {
    let mut runs = Vec::new();
    if candles.is_empty() {
        return runs;
    }
    let mut start = 0;
    for i in 1..candles.len() {
        if candles[i].open_time - candles[i - 1].open_time != interval_ms {
            runs.push(start..i);
            start = i;
        }
    }
    runs.push(start..candles.len());
    runs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn times(segs: &[Gap]) -> Vec<(i64, i64)> {
        segs.iter().map(|g| (g.missing.start, g.missing.end)).collect()
    }

    #[test]
    fn interior_segments() {
        let segs = missing_segments(0, 9, 1, &[0, 1, 2, 5, 6, 9]);
        assert_eq!(times(&segs), vec![(3, 4), (7, 8)]);
        assert_eq!(segs[0].bars, 2);
    }

    #[test]
    fn no_data_is_one_segment() {
        assert_eq!(times(&missing_segments(0, 9, 1, &[])), vec![(0, 9)]);
    }

    #[test]
    fn leading_and_trailing_segments() {
        let segs = missing_segments(0, 10, 2, &[4, 6]);
        assert_eq!(times(&segs), vec![(0, 2), (8, 10)]);
    }

    #[test]
    fn inverted_range_is_empty() {
        assert!(missing_segments(5, 1, 1, &[2]).is_empty());
    }

    #[test]
    fn estimate_bars_inclusive() {
        assert_eq!(estimate_bars(0, 9, 1), 10);
        assert_eq!(estimate_bars(0, 14_400_000 * 5, 14_400_000), 6);
        assert_eq!(estimate_bars(5, 0, 1), 0);
    }

    #[test]
    fn runs_split_at_gaps() {
        let candles: Vec<Candle> = [0, 1, 2, 6, 7, 9]
            .iter()
            .map(|&t| Candle::new(t, 1.0, 1.0, 1.0, 1.0, 0.0))
            .collect();
        assert_eq!(contiguous_runs(&candles, 1), vec![0..3, 3..5, 5..6]);
        assert_eq!(times(&interior_gaps(&candles, 1)), vec![(3, 5), (8, 8)]);
    }

    #[test]
    fn runs_of_empty_input() {
        assert!(contiguous_runs(&[], 1).is_empty());
    }
}
