//! Candle: the fundamental market data unit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// OHLCV candle for one instrument on one timeframe.
///
/// `open_time` is milliseconds since the Unix epoch (UTC), as delivered by
/// perpetual-futures exchanges.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub open_time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    pub fn new(open_time: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            open_time,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Returns true if any OHLC field is NaN.
    pub fn is_void(&self) -> bool {
        self.open.is_nan() || self.high.is_nan() || self.low.is_nan() || self.close.is_nan()
    }

    /// Basic OHLC sanity check: high bounds the body from above, low from below.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.open > 0.0
            && self.close > 0.0
            && self.volume >= 0.0
    }

    pub fn open_datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.open_time)
    }
}

/// Inclusive range of candle open times, in epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: i64,
    pub end: i64,
}

impl TimeRange {
    pub fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, t: i64) -> bool {
        t >= self.start && t <= self.end
    }

    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }

    /// Intersection of two ranges, `None` when they do not overlap.
    pub fn intersect(&self, other: &TimeRange) -> Option<TimeRange> {
        let r = TimeRange::new(self.start.max(other.start), self.end.min(other.end));
        (!r.is_empty()).then_some(r)
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // i64::MIN / i64::MAX stand for an unbounded side.
        let bound = |ms: i64| match ms {
            i64::MIN | i64::MAX => "open".to_string(),
            _ => format_ms(ms),
        };
        write!(f, "[{}, {}]", bound(self.start), bound(self.end))
    }
}

/// Render an epoch-millisecond timestamp as `YYYY-MM-DD HH:MM` UTC.
pub fn format_ms(ms: i64) -> String {
    match DateTime::from_timestamp_millis(ms) {
        Some(dt) => dt.format("%Y-%m-%d %H:%M").to_string(),
        None => format!("{ms}ms"),
    }
}
