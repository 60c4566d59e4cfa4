//! Serializable run configuration, read from TOML.
//!
//! ```toml
//! symbol = "BTCUSDT"
//! trading_data = "data/btcusdt_4h.csv"
//! filter_data = "data/btcusdt_1d.csv"   # optional, resampled when absent
//! start_date = "2023-01-01"             # optional, inclusive
//! end_date = "2023-12-31"               # optional, inclusive
//!
//! [synthetic]                           # optional, used with --synthetic
//! bars = 3000
//! seed = 7
//!
//! [sim]
//! trading_tf = "4h"
//! filter_tf = "1d"
//! risk_budget = { type = "amount", amount = 200 }
//! ```

use chrono::{NaiveDate, NaiveTime};
use perpsim_core::domain::TimeRange;
use perpsim_core::SimConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::synthetic::SyntheticConfig;

/// Unique identifier for a run (content-addressable hash).
pub type RunId = String;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid {field} '{value}' (expected YYYY-MM-DD)")]
    InvalidDate { field: &'static str, value: String },

    #[error("start_date {start} is after end_date {end}")]
    InvertedRange { start: NaiveDate, end: NaiveDate },

    #[error(transparent)]
    Sim(#[from] perpsim_core::error::ConfigError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    pub symbol: String,
    /// CSV of trading-timeframe candles.
    #[serde(default)]
    pub trading_data: Option<PathBuf>,
    /// CSV of filter-timeframe candles.
    #[serde(default)]
    pub filter_data: Option<PathBuf>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub synthetic: SyntheticConfig,
    #[serde(default)]
    pub sim: SimConfig,
}

impl BacktestConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: BacktestConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml_str(&content)?;
        // Data paths are relative to the config file.
        if let Some(dir) = path.parent() {
            config.trading_data = config.trading_data.map(|p| resolve(dir, p));
            config.filter_data = config.filter_data.map(|p| resolve(dir, p));
        }
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.sim.validate()?;
        self.requested_range()?;
        Ok(())
    }

    /// Computes a deterministic hash ID for this configuration.
    pub fn run_id(&self) -> RunId {
        let json = serde_json::to_string(self).unwrap_or_default();
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }

    /// The requested window in epoch milliseconds, both dates inclusive (UTC).
    ///
    /// A missing bound is open on that side.
    pub fn requested_range(&self) -> Result<Option<TimeRange>, ConfigError> {
        let start = self
            .start_date
            .as_deref()
            .map(|s| parse_date("start_date", s))
            .transpose()?;
        let end = self
            .end_date
            .as_deref()
            .map(|s| parse_date("end_date", s))
            .transpose()?;

        if let (Some(s), Some(e)) = (start, end) {
            if s > e {
                return Err(ConfigError::InvertedRange { start: s, end: e });
            }
        }
        if start.is_none() && end.is_none() {
            return Ok(None);
        }

        let start_ms = start.map_or(i64::MIN, day_start_ms);
        let end_ms = end.map_or(i64::MAX, |d| {
            day_start_ms(d).saturating_add(86_400_000 - 1)
        });
        Ok(Some(TimeRange::new(start_ms, end_ms)))
    }
}

fn resolve(dir: &Path, p: PathBuf) -> PathBuf {
    if p.is_absolute() {
        p
    } else {
        dir.join(p)
    }
}

fn parse_date(field: &'static str, value: &str) -> Result<NaiveDate, ConfigError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| ConfigError::InvalidDate {
        field,
        value: value.to_string(),
    })
}

fn day_start_ms(d: NaiveDate) -> i64 {
    d.and_time(NaiveTime::MIN).and_utc().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;
    use perpsim_core::config::{RiskBudget, TradeMode};
    use perpsim_core::domain::Timeframe;

    const SAMPLE: &str = r#"
symbol = "BTCUSDT"
trading_data = "btc_4h.csv"
start_date = "2024-01-01"
end_date = "2024-01-31"

[sim]
trading_tf = "4h"
filter_tf = "1d"
trade_mode = "long_only"
risk_budget = { type = "equity_fraction", fraction = 0.01 }
min_hold_bars = 8
"#;

    #[test]
    fn parses_sample() {
        let cfg = BacktestConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(cfg.symbol, "BTCUSDT");
        assert_eq!(cfg.trading_data, Some(PathBuf::from("btc_4h.csv")));
        assert_eq!(cfg.filter_data, None);
        assert_eq!(cfg.sim.trading_tf, Timeframe::from_minutes(240));
        assert_eq!(cfg.sim.trade_mode, TradeMode::LongOnly);
        assert_eq!(
            cfg.sim.risk_budget,
            RiskBudget::EquityFraction { fraction: 0.01 }
        );
        assert_eq!(cfg.sim.min_hold_bars, 8);
        // Unspecified fields take defaults.
        assert_eq!(cfg.sim.adx_threshold, 25.0);
    }

    #[test]
    fn requested_range_is_inclusive_of_end_day() {
        let cfg = BacktestConfig::from_toml_str(SAMPLE).unwrap();
        let range = cfg.requested_range().unwrap().unwrap();
        assert_eq!(range.start, 1_704_067_200_000);
        assert_eq!(range.end, 1_706_745_600_000 - 1);
    }

    #[test]
    fn open_ended_range() {
        let cfg = BacktestConfig::from_toml_str("symbol = \"X\"\nstart_date = \"2024-01-01\"").unwrap();
        let range = cfg.requested_range().unwrap().unwrap();
        assert_eq!(range.end, i64::MAX);
        let none = BacktestConfig::from_toml_str("symbol = \"X\"").unwrap();
        assert_eq!(none.requested_range().unwrap(), None);
    }

    #[test]
    fn bad_date_is_rejected() {
        let err = BacktestConfig::from_toml_str("symbol = \"X\"\nstart_date = \"01/02/2024\"")
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidDate { field: "start_date", .. }));
    }

    #[test]
    fn inverted_range_is_rejected() {
        let toml = "symbol = \"X\"\nstart_date = \"2024-02-01\"\nend_date = \"2024-01-01\"";
        assert!(matches!(
            BacktestConfig::from_toml_str(toml),
            Err(ConfigError::InvertedRange { .. })
        ));
    }

    #[test]
    fn invalid_sim_is_rejected() {
        let toml = "symbol = \"X\"\n[sim]\natr_period = 0";
        assert!(matches!(
            BacktestConfig::from_toml_str(toml),
            Err(ConfigError::Sim(_))
        ));
    }

    #[test]
    fn run_id_is_deterministic() {
        let a = BacktestConfig::from_toml_str(SAMPLE).unwrap();
        let mut b = a.clone();
        assert_eq!(a.run_id(), b.run_id());
        b.sim.atr_multiplier = 3.0;
        assert_ne!(a.run_id(), b.run_id());
    }
}
