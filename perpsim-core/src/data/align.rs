//! Dual-timeframe alignment.
//!
//! Each trading candle at open time T is joined with the most recent filter
//! candle that had fully closed by T (`open_time + duration <= T`). The join
//! only ever looks backward. Trading candles before the first completed
//! filter candle, or after filter coverage ends, are truncated from the
//! window. Missing trading candles split the series into segments; indicator
//! windows never cross a segment boundary.

use super::gaps::{contiguous_runs, interior_gaps, Gap};
use crate::config::SimConfig;
use crate::domain::{format_ms, Candle, TimeRange};
use crate::error::{PipelineError, SeriesKind};
use crate::indicators::IndicatorEngine;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;
use tracing::{debug, info, warn};

/// Filter-timeframe trend state known at a trading bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterSnapshot {
    /// Open time of the filter candle the values were computed on.
    pub open_time: i64,
    /// Close time of that candle; never later than the trading bar's open.
    pub available_at: i64,
    pub adx: Option<f64>,
    pub ema: Option<f64>,
    pub ema_slope: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignedBar {
    /// Position in the aligned series.
    pub index: usize,
    pub candle: Candle,
    /// `None` when the filter series has a gap covering this bar.
    pub filter: Option<FilterSnapshot>,
    /// Contiguous segment id, counting from 0.
    pub segment: usize,
    /// True for the first bar after a trading-timeframe gap.
    pub gap_before: bool,
}

impl AlignedBar {
    pub fn open_time(&self) -> i64 {
        self.candle.open_time
    }
}

/// Non-fatal conditions found while building the series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PipelineWarning {
    /// The longest contiguous trading segment is shorter than the indicator lookback.
    InsufficientData { required: usize, available: usize },
    /// The longest contiguous filter run is shorter than the trend-filter lookback.
    InsufficientFilterData { required: usize, available: usize },
    TradingGap { gap: Gap },
    FilterGap { gap: Gap },
    StaleFilter { bars: usize },
}

impl fmt::Display for PipelineWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineWarning::InsufficientData {
                required,
                available,
            } => write!(
                f,
                "insufficient data: indicator lookback needs {required} contiguous bars, \
                 longest segment has {available}"
            ),
            PipelineWarning::InsufficientFilterData {
                required,
                available,
            } => write!(
                f,
                "insufficient filter data: trend filter needs {required} contiguous bars, \
                 longest run has {available}"
            ),
            PipelineWarning::TradingGap { gap } => {
                write!(f, "trading gap of {} bars at {}", gap.bars, gap.missing)
            }
            PipelineWarning::FilterGap { gap } => {
                write!(f, "filter gap of {} bars at {}", gap.bars, gap.missing)
            }
            PipelineWarning::StaleFilter { bars } => {
                write!(f, "{bars} trading bars have no current filter snapshot")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlignedSeries {
    pub bars: Vec<AlignedBar>,
    /// Open times of the first and last usable bar.
    pub window: TimeRange,
    pub gaps: Vec<Gap>,
    pub filter_gaps: Vec<Gap>,
    pub segments: Vec<Range<usize>>,
    pub warnings: Vec<PipelineWarning>,
    /// Human-readable note when the window is smaller than requested.
    pub truncation_note: Option<String>,
}

impl AlignedSeries {
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn candles(&self) -> Vec<Candle> {
        self.bars.iter().map(|b| b.candle).collect()
    }
}

fn check_sorted(candles: &[Candle], series: SeriesKind) -> Result<(), PipelineError> {
    if candles.is_empty() {
        return Err(PipelineError::EmptyInput { series });
    }
    for (i, pair) in candles.windows(2).enumerate() {
        if pair[1].open_time <= pair[0].open_time {
            return Err(PipelineError::Unsorted {
                series,
                index: i + 1,
            });
        }
    }
    Ok(())
}

fn longest(runs: &[Range<usize>]) -> usize {
    runs.iter().map(|r| r.len()).max().unwrap_or(0)
}

/// Filter snapshots per filter candle, computed per contiguous filter run.
fn filter_snapshots(
    filter: &[Candle],
    runs: &[Range<usize>],
    engine: &IndicatorEngine,
    duration_ms: i64,
) -> Vec<FilterSnapshot> {
    let snaps = engine.compute_segments(filter, runs);
    filter
        .iter()
        .zip(snaps)
        .map(|(c, s)| FilterSnapshot {
            open_time: c.open_time,
            available_at: c.open_time + duration_ms,
            adx: s.adx,
            ema: s.ema,
            ema_slope: s.ema_slope,
        })
        .collect()
}

/// Build the aligned, gap-annotated series.
///
/// `requested` clips the trading candles; filter history before it is still
/// used. Fails with `EmptyWindow` when no usable bar remains.
pub fn align(
    trading: &[Candle],
    filter: &[Candle],
    config: &SimConfig,
    requested: Option<TimeRange>,
) -> Result<AlignedSeries, PipelineError> {
    config.validate()?;
    check_sorted(trading, SeriesKind::Trading)?;
    check_sorted(filter, SeriesKind::Filter)?;

    let tdur = config.trading_tf.duration_ms();
    let fdur = config.filter_tf.duration_ms();
    let engine = IndicatorEngine::from_config(config);
    let filter_engine = IndicatorEngine::filter_from_config(config);

    let trading_range = TimeRange::new(trading[0].open_time, trading[trading.len() - 1].open_time);
    let requested_range = requested.unwrap_or(trading_range);
    let filter_coverage = TimeRange::new(
        filter[0].open_time + fdur,
        filter[filter.len() - 1].open_time + 2 * fdur - 1,
    );
    let empty_window = || PipelineError::EmptyWindow {
        requested: requested_range,
        available: trading_range.intersect(&filter_coverage),
    };

    let mut warnings = Vec::new();
    let filter_gaps = interior_gaps(filter, fdur);
    for gap in &filter_gaps {
        warn!(bars = gap.bars, missing = %gap.missing, "filter series gap");
        warnings.push(PipelineWarning::FilterGap { gap: *gap });
    }
    let filter_runs = contiguous_runs(filter, fdur);
    let filter_required = filter_engine.filter_lookback() + 1;
    let filter_available = longest(&filter_runs);
    if filter_available < filter_required {
        warn!(
            required = filter_required,
            available = filter_available,
            "filter series too short for the trend filter"
        );
        warnings.push(PipelineWarning::InsufficientFilterData {
            required: filter_required,
            available: filter_available,
        });
    }
    let fsnaps = filter_snapshots(filter, &filter_runs, &filter_engine, fdur);

    let mut kept: Vec<(Candle, Option<FilterSnapshot>)> = Vec::new();
    let mut leading = 0usize;
    let mut trailing = 0usize;
    let mut stale = 0usize;
    let mut next = 0usize;

    for candle in trading.iter().filter(|c| requested_range.contains(c.open_time)) {
        let t = candle.open_time;
        while next < fsnaps.len() && fsnaps[next].available_at <= t {
            next += 1;
        }
        if next == 0 {
            leading += 1;
            continue;
        }
        let latest = fsnaps[next - 1];
        if t >= latest.available_at + fdur {
            if next == fsnaps.len() {
                trailing += 1;
                continue;
            }
            stale += 1;
            kept.push((*candle, None));
        } else {
            kept.push((*candle, Some(latest)));
        }
    }

    if kept.is_empty() {
        let err = empty_window();
        warn!(error = %err, "no usable bars");
        return Err(err);
    }
    if stale > 0 {
        warn!(bars = stale, "trading bars without a current filter snapshot");
        warnings.push(PipelineWarning::StaleFilter { bars: stale });
    }

    let candles: Vec<Candle> = kept.iter().map(|(c, _)| *c).collect();
    let segments = contiguous_runs(&candles, tdur);
    let gaps = interior_gaps(&candles, tdur);
    for gap in &gaps {
        warn!(bars = gap.bars, missing = %gap.missing, "trading series gap");
        warnings.push(PipelineWarning::TradingGap { gap: *gap });
    }

    let mut bars = Vec::with_capacity(kept.len());
    for (seg_id, seg) in segments.iter().enumerate() {
        for i in seg.clone() {
            let (candle, filter) = kept[i];
            bars.push(AlignedBar {
                index: i,
                candle,
                filter,
                segment: seg_id,
                gap_before: seg_id > 0 && i == seg.start,
            });
        }
    }

    let window = TimeRange::new(candles[0].open_time, candles[candles.len() - 1].open_time);

    // Warmup restarts in every segment, so only a single segment can satisfy it.
    let required = engine.lookback() + 1;
    let available = longest(&segments);
    if available < required {
        if config.strict_lookback {
            return Err(PipelineError::InsufficientData {
                required,
                available,
            });
        }
        warn!(required, available, "insufficient data for indicator lookback");
        warnings.push(PipelineWarning::InsufficientData {
            required,
            available,
        });
    }

    let truncation_note = (leading > 0 || trailing > 0).then(|| {
        format!(
            "window truncated to {window} (requested {requested_range}): \
             {leading} leading bars before the first completed {} filter bar, \
             {trailing} trailing bars after filter coverage ends at {}",
            config.filter_tf,
            format_ms(filter_coverage.end + 1),
        )
    });
    if let Some(note) = &truncation_note {
        info!("{note}");
    }
    debug!(
        bars = bars.len(),
        segments = segments.len(),
        window = %window,
        "aligned series built"
    );

    Ok(AlignedSeries {
        bars,
        window,
        gaps,
        filter_gaps,
        segments,
        warnings,
        truncation_note,
    })
}
