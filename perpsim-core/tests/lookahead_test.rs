//! Look-ahead contamination tests.
//!
//! No value attached to bar t may depend on data from bar t+1 or later.
//!
//! Method: run on a truncated input and on the full input, then assert the
//! shared prefix is identical. Any difference means future data leaked into
//! past values.

use perpsim_core::config::{SignalParams, SimConfig, TradeMode};
use perpsim_core::data::{align, resample};
use perpsim_core::domain::{Candle, Timeframe};
use perpsim_core::engine::Simulation;
use perpsim_core::indicators::{
    Adx, Atr, Bollinger, Ema, Indicator, IndicatorEngine, Macd, Rsi, Smoothing, Structural,
};
use perpsim_core::strategy::EntryTrigger;

const H: i64 = 3_600_000;

/// Deterministic pseudo-random walk of hourly candles.
fn make_test_candles(n: usize) -> Vec<Candle> {
    let mut candles = Vec::with_capacity(n);
    let mut price = 100.0;
    for i in 0..n {
        let seed = (i as u64).wrapping_mul(6364136223846793005).wrapping_add(1);
        let change = ((seed >> 33) % 200) as f64 / 100.0 - 1.0;
        let open = price;
        price = (price + change).max(10.0);
        let close = price;
        let high = open.max(close) + 0.7;
        let low = open.min(close) - 0.6;
        candles.push(Candle::new(i as i64 * H, open, high, low, close, 1_000.0 + i as f64));
    }
    candles
}

fn assert_no_lookahead(indicator: &dyn Indicator, full: &[Candle], truncated_len: usize) {
    let full_result = indicator.compute(full);
    let truncated_result = indicator.compute(&full[..truncated_len]);

    assert_eq!(truncated_result.len(), truncated_len, "{}", indicator.name());
    assert_eq!(full_result.len(), full.len(), "{}", indicator.name());

    for i in 0..truncated_len {
        let t = truncated_result[i];
        let f = full_result[i];
        if t.is_nan() && f.is_nan() {
            continue;
        }
        assert!(
            !t.is_nan() && !f.is_nan(),
            "{}: NaN mismatch at bar {i} (truncated={t}, full={f})",
            indicator.name()
        );
        assert!(
            (t - f).abs() < 1e-10,
            "{}: value mismatch at bar {i} (truncated={t}, full={f})",
            indicator.name()
        );
    }
}

#[test]
fn indicators_have_no_lookahead() {
    let candles = make_test_candles(300);
    let indicators: Vec<Box<dyn Indicator>> = vec![
        Box::new(Atr::wilder(14)),
        Box::new(Atr::simple(14)),
        Box::new(Adx::new(14)),
        Box::new(Ema::new(20)),
        Box::new(Ema::new(50)),
        Box::new(Structural::high(5)),
        Box::new(Structural::low(5)),
        Box::new(Rsi::new(14)),
        Box::new(Macd::new(12, 26, 9)),
        Box::new(Bollinger::middle(20)),
        Box::new(Bollinger::upper(20, 2.0)),
        Box::new(Bollinger::lower(20, 2.0)),
    ];
    for ind in &indicators {
        for cut in [30, 120, 299] {
            assert_no_lookahead(ind.as_ref(), &candles, cut);
        }
    }
}

#[test]
fn snapshots_have_no_lookahead() {
    let candles = make_test_candles(250);
    let engine = IndicatorEngine::new(14, Smoothing::Wilder, 14, 50, 3, 5)
        .with_signals(&SignalParams::default());
    let full = engine.compute(&candles);
    let truncated = engine.compute(&candles[..120]);
    assert_eq!(&full[..120], &truncated[..]);
}

fn config() -> SimConfig {
    SimConfig {
        trading_tf: Timeframe::from_minutes(60),
        filter_tf: Timeframe::from_minutes(240),
        entry_trigger: EntryTrigger::EmaTrend,
        trade_mode: TradeMode::Both,
        atr_period: 5,
        adx_period: 5,
        adx_threshold: 15.0,
        ema_period: 8,
        structural_lookback: 3,
        min_hold_bars: 3,
        ..SimConfig::default()
    }
}

/// Filter candles that had fully closed by `t`.
fn closed_by(filter: &[Candle], tf: Timeframe, t: i64) -> Vec<Candle> {
    filter
        .iter()
        .filter(|c| c.open_time + tf.duration_ms() <= t)
        .copied()
        .collect()
}

#[test]
fn alignment_has_no_lookahead() {
    let cfg = config();
    let trading = make_test_candles(400);
    let filter = resample(&trading, cfg.filter_tf);

    let full = align(&trading, &filter, &cfg, None).unwrap();
    let cut = 250;
    let last_open = trading[cut - 1].open_time;
    let part = align(
        &trading[..cut],
        &closed_by(&filter, cfg.filter_tf, last_open),
        &cfg,
        None,
    )
    .unwrap();

    assert_eq!(part.bars[..], full.bars[..part.len()]);
    for bar in &full.bars {
        let snap = bar.filter.expect("contiguous filter covers every bar");
        assert!(snap.available_at <= bar.open_time());
    }
}

#[test]
fn simulation_has_no_lookahead() {
    let cfg = config();
    let trading = make_test_candles(400);
    let filter = resample(&trading, cfg.filter_tf);

    let full = align(&trading, &filter, &cfg, None).unwrap();
    let cut = 260;
    let last_open = trading[cut - 1].open_time;
    let part = align(
        &trading[..cut],
        &closed_by(&filter, cfg.filter_tf, last_open),
        &cfg,
        None,
    )
    .unwrap();

    let full_steps: Vec<_> = Simulation::new(&full, &cfg).collect();
    let part_steps: Vec<_> = Simulation::new(&part, &cfg).collect();
    assert_eq!(part_steps.len(), part.len());
    assert_eq!(part_steps[..], full_steps[..part_steps.len()]);
}

#[test]
fn v5_simulation_has_no_lookahead() {
    let cfg = SimConfig {
        entry_trigger: EntryTrigger::V5,
        signals: SignalParams {
            ema_slow_period: 30,
            ..SignalParams::default()
        },
        ..config()
    };
    let trading = make_test_candles(400);
    let filter = resample(&trading, cfg.filter_tf);

    let full = align(&trading, &filter, &cfg, None).unwrap();
    let cut = 240;
    let last_open = trading[cut - 1].open_time;
    let part = align(
        &trading[..cut],
        &closed_by(&filter, cfg.filter_tf, last_open),
        &cfg,
        None,
    )
    .unwrap();

    let full_steps: Vec<_> = Simulation::new(&full, &cfg).collect();
    let part_steps: Vec<_> = Simulation::new(&part, &cfg).collect();
    assert_eq!(part_steps[..], full_steps[..part_steps.len()]);
}
