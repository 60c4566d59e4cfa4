//! Per-bar indicator snapshots.
//!
//! `IndicatorEngine` owns the configured indicator set and turns a candle
//! sequence into one `IndicatorSnapshot` per candle. Series are computed once
//! per contiguous segment so no window ever spans a data gap.

use super::{
    available, ema_slope, Adx, Atr, Bollinger, Ema, Indicator, Macd, Rsi, Smoothing, Structural,
};
use crate::config::{SignalParams, SimConfig};
use crate::domain::Candle;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Indicator values at one bar, computed from candles up to and including it.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub atr: Option<f64>,
    pub adx: Option<f64>,
    pub ema: Option<f64>,
    pub ema_slope: Option<f64>,
    pub structural_high: Option<f64>,
    pub structural_low: Option<f64>,
    // Signal stack; always `None` when the engine runs without it.
    pub rsi: Option<f64>,
    pub macd_hist: Option<f64>,
    pub ema_slow: Option<f64>,
    pub boll_mid: Option<f64>,
    pub boll_upper: Option<f64>,
    pub boll_lower: Option<f64>,
}

#[derive(Debug, Clone)]
struct SignalStack {
    rsi: Rsi,
    macd: Macd,
    ema_slow: Ema,
    boll_mid: Bollinger,
    boll_upper: Bollinger,
    boll_lower: Bollinger,
}

impl SignalStack {
    fn new(p: &SignalParams) -> Self {
        Self {
            rsi: Rsi::new(p.rsi_period),
            macd: Macd::new(p.macd_fast, p.macd_slow, p.macd_signal),
            ema_slow: Ema::new(p.ema_slow_period),
            boll_mid: Bollinger::middle(p.boll_period),
            boll_upper: Bollinger::upper(p.boll_period, p.boll_std),
            boll_lower: Bollinger::lower(p.boll_period, p.boll_std),
        }
    }

    fn lookback(&self) -> usize {
        [
            self.rsi.lookback(),
            self.macd.lookback(),
            self.ema_slow.lookback(),
            self.boll_mid.lookback(),
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
    }

    fn indicators(&self) -> [&dyn Indicator; 6] {
        [
            &self.rsi,
            &self.macd,
            &self.ema_slow,
            &self.boll_mid,
            &self.boll_upper,
            &self.boll_lower,
        ]
    }
}

#[derive(Debug, Clone)]
pub struct IndicatorEngine {
    atr: Atr,
    adx: Adx,
    ema: Ema,
    slope_lookback: usize,
    structural_high: Structural,
    structural_low: Structural,
    signals: Option<SignalStack>,
}

impl IndicatorEngine {
    pub fn new(
        atr_period: usize,
        smoothing: Smoothing,
        adx_period: usize,
        ema_period: usize,
        slope_lookback: usize,
        structural_lookback: usize,
    ) -> Self {
        Self {
            atr: Atr::new(atr_period, smoothing),
            adx: Adx::new(adx_period),
            ema: Ema::new(ema_period),
            slope_lookback: slope_lookback.max(1),
            structural_high: Structural::high(structural_lookback),
            structural_low: Structural::low(structural_lookback),
            signals: None,
        }
    }

    /// Also compute RSI, MACD histogram, slow EMA and Bollinger bands.
    pub fn with_signals(mut self, params: &SignalParams) -> Self {
        self.signals = Some(SignalStack::new(params));
        self
    }

    /// Engine for the trading timeframe.
    pub fn from_config(config: &SimConfig) -> Self {
        let engine = Self::filter_from_config(config);
        if config.uses_signal_stack() {
            engine.with_signals(&config.signals)
        } else {
            engine
        }
    }

    /// Engine for the filter timeframe, which never needs the signal stack.
    pub fn filter_from_config(config: &SimConfig) -> Self {
        Self::new(
            config.atr_period,
            config.atr_smoothing,
            config.adx_period,
            config.ema_period,
            config.ema_slope_lookback,
            config.structural_lookback,
        )
    }

    /// Bars a contiguous segment needs before every snapshot field is available.
    pub fn lookback(&self) -> usize {
        [
            self.atr.lookback(),
            self.adx.lookback(),
            self.ema.lookback() + self.slope_lookback,
            self.structural_high.lookback(),
            self.signals.as_ref().map_or(0, SignalStack::lookback),
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
    }

    /// Bars needed before the trend filter (ADX, EMA slope) is available.
    pub fn filter_lookback(&self) -> usize {
        self.adx
            .lookback()
            .max(self.ema.lookback() + self.slope_lookback)
    }

    /// Snapshots for a single contiguous candle run.
    pub fn compute(&self, candles: &[Candle]) -> Vec<IndicatorSnapshot> {
        let atr = self.atr.compute(candles);
        let adx = self.adx.compute(candles);
        let ema = self.ema.compute(candles);
        let slope = ema_slope(&ema, self.slope_lookback);
        let highs = self.structural_high.compute(candles);
        let lows = self.structural_low.compute(candles);
        let stack: Option<Vec<Vec<f64>>> = self
            .signals
            .as_ref()
            .map(|s| s.indicators().iter().map(|ind| ind.compute(candles)).collect());
        let signal = |k: usize, i: usize| stack.as_ref().and_then(|s| available(s[k][i]));

        (0..candles.len())
            .map(|i| IndicatorSnapshot {
                atr: available(atr[i]),
                adx: available(adx[i]),
                ema: available(ema[i]),
                ema_slope: available(slope[i]),
                structural_high: available(highs[i]),
                structural_low: available(lows[i]),
                rsi: signal(0, i),
                macd_hist: signal(1, i),
                ema_slow: signal(2, i),
                boll_mid: signal(3, i),
                boll_upper: signal(4, i),
                boll_lower: signal(5, i),
            })
            .collect()
    }

    /// Snapshots for a candle sequence split into contiguous segments.
    ///
    /// Each segment restarts warmup, so a value is available only once the
    /// segment itself holds enough history.
    pub fn compute_segments(
        &self,
        candles: &[Candle],
        segments: &[Range<usize>],
    ) -> Vec<IndicatorSnapshot> {
        let mut out = vec![IndicatorSnapshot::default(); candles.len()];
        for seg in segments {
            let snaps = self.compute(&candles[seg.clone()]);
            out[seg.clone()].copy_from_slice(&snaps);
        }
        out
    }
}
