//! Candle timeframes ("15m", "4h", "1d").

use crate::error::TimeframeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const MS_PER_MINUTE: i64 = 60_000;

/// A candle period, stored in whole minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Timeframe {
    minutes: u32,
}

impl Timeframe {
    pub const fn from_minutes(minutes: u32) -> Self {
        Self { minutes }
    }

    pub fn parse(s: &str) -> Result<Self, TimeframeError> {
        let tf = s.trim().to_ascii_lowercase();
        let unsupported = || TimeframeError::Unsupported(s.to_string());
        if tf.len() < 2 {
            return Err(unsupported());
        }
        let (num, unit) = tf.split_at(tf.len() - 1);
        let n: u32 = num.parse().map_err(|_| unsupported())?;
        if n == 0 {
            return Err(unsupported());
        }
        let minutes = match unit {
            "m" => Some(n),
            "h" => n.checked_mul(60),
            "d" => n.checked_mul(60 * 24),
            _ => None,
        }
        .ok_or_else(unsupported)?;
        Ok(Self { minutes })
    }

    pub fn minutes(&self) -> u32 {
        self.minutes
    }

    /// Candle duration in milliseconds.
    pub fn duration_ms(&self) -> i64 {
        self.minutes as i64 * MS_PER_MINUTE
    }

    /// Number of candles of this timeframe in a 365-day year.
    pub fn periods_per_year(&self) -> f64 {
        (365.0 * 24.0 * 60.0) / self.minutes as f64
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = self.minutes;
        if m % (60 * 24) == 0 {
            write!(f, "{}d", m / (60 * 24))
        } else if m % 60 == 0 {
            write!(f, "{}h", m / 60)
        } else {
            write!(f, "{m}m")
        }
    }
}

impl FromStr for Timeframe {
    type Err = TimeframeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Timeframe {
    type Error = TimeframeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Timeframe> for String {
    fn from(tf: Timeframe) -> Self {
        tf.to_string()
    }
}
