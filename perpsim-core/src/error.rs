//! Error types shared across the core.
//!
//! Only pipeline and configuration errors abort a run. Per-bar problems
//! (rejected entries, unavailable indicators) are reported through the rule
//! engine's evaluation record instead.

use crate::domain::TimeRange;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimeframeError {
    #[error("unsupported timeframe '{0}' (expected forms like 15m, 4h, 1d)")]
    Unsupported(String),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid config field `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("filter timeframe {filter} is finer than trading timeframe {trading}")]
    TimeframeMismatch { trading: String, filter: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Which input sequence an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeriesKind {
    Trading,
    Filter,
}

impl fmt::Display for SeriesKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeriesKind::Trading => f.write_str("trading"),
            SeriesKind::Filter => f.write_str("filter"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PipelineError {
    #[error("{series} candle sequence is empty")]
    EmptyInput { series: SeriesKind },

    #[error("{series} candles are not strictly increasing at index {index}")]
    Unsorted { series: SeriesKind, index: usize },

    #[error("insufficient data: indicator lookback needs {required} bars, {available} available")]
    InsufficientData { required: usize, available: usize },

    #[error(
        "empty backtest window: requested {requested}, available {}",
        describe_available(.available)
    )]
    EmptyWindow {
        requested: TimeRange,
        available: Option<TimeRange>,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

fn describe_available(available: &Option<TimeRange>) -> String {
    match available {
        Some(r) => r.to_string(),
        None => "no overlapping data".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_window_message_names_both_ranges() {
        let err = PipelineError::EmptyWindow {
            requested: TimeRange::new(0, 3_600_000),
            available: None,
        };
        let msg = err.to_string();
        assert!(msg.contains("1970-01-01 00:00"));
        assert!(msg.contains("no overlapping data"));
    }

    #[test]
    fn insufficient_data_reports_counts() {
        let err = PipelineError::InsufficientData {
            required: 50,
            available: 12,
        };
        assert_eq!(
            err.to_string(),
            "insufficient data: indicator lookback needs 50 bars, 12 available"
        );
    }
}
