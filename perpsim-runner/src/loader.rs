//! CSV candle supply.
//!
//! Expected header: `open_time,open,high,low,close,volume`. Extra columns are
//! ignored. `open_time` is either integer epoch milliseconds or an RFC 3339
//! timestamp. Rows are sorted by open time; exact duplicates are dropped
//! (keep-first), divergent duplicates are an error. Rows with non-finite or
//! inconsistent OHLC are skipped with a warning.

use chrono::DateTime;
use perpsim_core::domain::Candle;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed CSV in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("invalid open_time '{value}' at row {row}")]
    InvalidTime { row: usize, value: String },

    #[error("divergent duplicate candle at open_time {open_time}")]
    DivergentDuplicate { open_time: i64 },

    #[error("no usable candles in {0}")]
    Empty(PathBuf),
}

#[derive(Debug, Deserialize)]
struct Row {
    open_time: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(default)]
    volume: f64,
}

pub fn load_candles(path: &Path) -> Result<Vec<Candle>, LoadError> {
    let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let candles = read_candles(file, path)?;
    if candles.is_empty() {
        return Err(LoadError::Empty(path.to_path_buf()));
    }
    debug!(path = %path.display(), candles = candles.len(), "loaded candles");
    Ok(candles)
}

/// Parse candles from any reader. `path` is used for error messages only.
pub fn read_candles<R: std::io::Read>(reader: R, path: &Path) -> Result<Vec<Candle>, LoadError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut candles = Vec::new();
    let mut skipped = 0usize;

    for (row_idx, record) in rdr.deserialize::<Row>().enumerate() {
        let row = record.map_err(|source| LoadError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        let open_time = parse_open_time(&row.open_time).ok_or_else(|| LoadError::InvalidTime {
            row: row_idx + 1,
            value: row.open_time.clone(),
        })?;
        let candle = Candle::new(open_time, row.open, row.high, row.low, row.close, row.volume);
        if !candle.is_sane() {
            skipped += 1;
            continue;
        }
        candles.push(candle);
    }
    if skipped > 0 {
        warn!(path = %path.display(), rows = skipped, "skipped rows with invalid OHLC");
    }

    // Stable sort keeps file order among equal open times.
    candles.sort_by_key(|c| c.open_time);
    dedup(candles)
}

fn dedup(candles: Vec<Candle>) -> Result<Vec<Candle>, LoadError> {
    let mut out: Vec<Candle> = Vec::with_capacity(candles.len());
    for c in candles {
        match out.last() {
            Some(last) if last.open_time == c.open_time => {
                if *last != c {
                    return Err(LoadError::DivergentDuplicate {
                        open_time: c.open_time,
                    });
                }
            }
            _ => out.push(c),
        }
    }
    Ok(out)
}

fn parse_open_time(s: &str) -> Option<i64> {
    if let Ok(ms) = s.parse::<i64>() {
        return Some(ms);
    }
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.timestamp_millis())
}
