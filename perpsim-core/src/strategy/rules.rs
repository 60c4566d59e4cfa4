//! The rule engine: one pure evaluation per bar.
//!
//! With a position open, the order is fixed: stop check first (a hit closes
//! at the stop and nothing else runs), then the ATR trail, then profit
//! protection. With no position, the base trigger is consulted for a long,
//! then for a short behind BearGate.

use super::beargate::bear_gate;
use super::decision::{Decision, EntryPlan, Evaluation};
use super::sizing::{position_size, EntryRejection};
use super::stops::{atr_stop, initial_stop, is_tighter, ratchet, structural_stop, trail_candidate};
use super::tp2::{tp2_check, tp2_target, Tp2Outcome};
use crate::config::{SimConfig, Tp2Action};
use crate::data::AlignedBar;
use crate::domain::{OpenPosition, PositionState, Side};
use crate::engine::CostModel;
use crate::indicators::IndicatorSnapshot;

/// Indicator snapshots of the current segment, ending at the current bar.
#[derive(Debug, Clone, Copy)]
pub struct IndicatorWindow<'a> {
    snapshots: &'a [IndicatorSnapshot],
}

impl<'a> IndicatorWindow<'a> {
    pub fn new(snapshots: &'a [IndicatorSnapshot]) -> Self {
        Self { snapshots }
    }

    pub fn current(&self) -> Option<&'a IndicatorSnapshot> {
        self.snapshots.last()
    }

    /// Snapshot of the bar before the current one, within the same segment.
    pub fn previous(&self) -> Option<&'a IndicatorSnapshot> {
        let n = self.snapshots.len();
        if n >= 2 {
            self.snapshots.get(n - 2)
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

/// Account state visible to the rules.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AccountView {
    pub equity: f64,
}

pub fn evaluate(
    bar: &AlignedBar,
    window: IndicatorWindow<'_>,
    position: &PositionState,
    account: &AccountView,
    config: &SimConfig,
) -> Evaluation {
    match position {
        PositionState::Open(pos) => manage_open(bar, window, pos, config),
        PositionState::Flat => consider_entry(bar, window, account, config),
    }
}

fn manage_open(
    bar: &AlignedBar,
    window: IndicatorWindow<'_>,
    pos: &OpenPosition,
    config: &SimConfig,
) -> Evaluation {
    let candle = &bar.candle;
    if pos.side.stop_hit(pos.stop_price, candle.low, candle.high) {
        return Evaluation::new(Decision::CloseAtStop {
            stop: pos.stop_price,
        });
    }

    let current = window.current();
    let trail = current
        .and_then(|s| s.atr)
        .map(|atr| trail_candidate(pos.side, candle.close, atr, config.trail_multiplier()));

    let mut new_stop = match trail {
        Some(t) => ratchet(pos.side, pos.stop_price, t),
        None => pos.stop_price,
    };

    let tp2 = tp2_check(pos, candle.close, config);
    let mut tp2_tightened = false;
    if tp2 == Tp2Outcome::Allow {
        if config.tp2_action == Tp2Action::Close {
            let mut eval = Evaluation::new(Decision::CloseForProfitProtection);
            eval.tp2 = Some(tp2);
            return eval;
        }
        if let Some(target) = tp2_target(
            pos.side,
            pos.entry_price,
            candle.close,
            trail,
            current.and_then(|s| s.boll_mid),
            config.tp2_tighten_to,
        ) {
            let tightened = ratchet(pos.side, new_stop, target);
            tp2_tightened = is_tighter(pos.side, new_stop, tightened);
            new_stop = tightened;
        }
    }

    let decision = if is_tighter(pos.side, pos.stop_price, new_stop) {
        Decision::UpdateStop { new_stop }
    } else {
        Decision::NoAction
    };
    let mut eval = Evaluation::new(decision);
    eval.tp2 = Some(tp2);
    eval.tp2_tightened = tp2_tightened;
    eval
}

fn consider_entry(
    bar: &AlignedBar,
    window: IndicatorWindow<'_>,
    account: &AccountView,
    config: &SimConfig,
) -> Evaluation {
    let mut eval = Evaluation::new(Decision::NoAction);
    let Some(current) = window.current() else {
        return eval;
    };
    let close = bar.candle.close;
    let previous = window.previous();

    if let Some(floor) = config.range_filter_adx_below {
        if !current.adx.is_some_and(|adx| adx >= floor) {
            eval.range_blocked = true;
            return eval;
        }
    }

    let wants = |side: Side| {
        config.trade_mode.allows(side) && config.entry_trigger.fires(side, close, current, previous)
    };

    let side = if wants(Side::Long) {
        Side::Long
    } else if wants(Side::Short) {
        let gate = bear_gate(bar.filter.as_ref(), config.adx_threshold);
        eval.signal = Some(Side::Short);
        eval.gate = Some(gate);
        if !gate.is_pass() {
            return eval;
        }
        Side::Short
    } else {
        return eval;
    };
    eval.signal = Some(side);

    match plan_entry(side, close, current, previous, account, config) {
        Ok(plan) => {
            eval.decision = match side {
                Side::Long => Decision::OpenLong(plan),
                Side::Short => Decision::OpenShort(plan),
            };
        }
        Err(rejection) => eval.rejection = Some(rejection),
    }
    eval
}

fn plan_entry(
    side: Side,
    close: f64,
    current: &IndicatorSnapshot,
    previous: Option<&IndicatorSnapshot>,
    account: &AccountView,
    config: &SimConfig,
) -> Result<EntryPlan, EntryRejection> {
    let unavailable = |indicator: &str| EntryRejection::IndicatorUnavailable {
        indicator: indicator.to_string(),
    };
    let atr = current.atr.ok_or_else(|| unavailable("atr"))?;
    let structural = previous
        .and_then(|p| structural_stop(side, p))
        .ok_or_else(|| unavailable("structural"))?;

    let fill_price = CostModel::from_config(config).entry_fill(side, close);
    let atr_stop = atr_stop(side, fill_price, atr, config.atr_multiplier);
    let stop = initial_stop(side, atr_stop, structural);
    let sizing = position_size(side, fill_price, stop, account.equity, config)?;

    Ok(EntryPlan {
        side,
        fill_price,
        stop,
        quantity: sizing.quantity,
        atr_stop,
        structural_stop: structural,
        capped: sizing.capped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::FilterSnapshot;
    use crate::domain::Candle;
    use crate::strategy::{EntryTrigger, GateOutcome};

    fn bar(close: f64, low: f64, high: f64, filter: Option<FilterSnapshot>) -> AlignedBar {
        AlignedBar {
            index: 5,
            candle: Candle::new(0, close, high, low, close, 1.0),
            filter,
            segment: 0,
            gap_before: false,
        }
    }

    fn bearish_filter() -> FilterSnapshot {
        FilterSnapshot {
            open_time: 0,
            available_at: 0,
            adx: Some(30.0),
            ema: Some(100.0),
            ema_slope: Some(-1.0),
        }
    }

    fn snaps(atr: f64, low: f64, high: f64) -> Vec<IndicatorSnapshot> {
        let s = IndicatorSnapshot {
            atr: Some(atr),
            adx: Some(30.0),
            ema: Some(100.0),
            ema_slope: Some(0.0),
            structural_high: Some(high),
            structural_low: Some(low),
            ..IndicatorSnapshot::default()
        };
        vec![s, s]
    }

    fn frictionless(trigger: EntryTrigger) -> SimConfig {
        SimConfig {
            fee_rate: 0.0,
            slippage: 0.0,
            entry_trigger: trigger,
            ..SimConfig::default()
        }
    }

    fn open_long(stop: f64, hold_bars: usize) -> PositionState {
        PositionState::Open(OpenPosition {
            side: Side::Long,
            entry_price: 100.0,
            entry_time: 0,
            entry_bar_index: 0,
            quantity: 100.0,
            stop_price: stop,
            initial_stop: stop,
            entry_fee: 0.0,
            peak_unrealized_pnl: 0.0,
            hold_bars,
            tp2_tightened: false,
        })
    }

    const ACCOUNT: AccountView = AccountView { equity: 10_000.0 };

    #[test]
    fn long_entry_uses_conservative_stop() {
        let cfg = frictionless(EntryTrigger::EveryBar);
        let s = snaps(1.0, 97.0, 103.0);
        let eval = evaluate(
            &bar(100.0, 99.0, 101.0, None),
            IndicatorWindow::new(&s),
            &PositionState::Flat,
            &ACCOUNT,
            &cfg,
        );
        let Decision::OpenLong(plan) = eval.decision else {
            panic!("expected long entry, got {:?}", eval.decision);
        };
        assert_eq!(plan.atr_stop, 98.0);
        assert_eq!(plan.structural_stop, 97.0);
        assert_eq!(plan.stop, 98.0);
        assert_eq!(plan.quantity, 100.0);
    }

    #[test]
    fn short_requires_bear_gate() {
        let cfg = SimConfig {
            trade_mode: crate::config::TradeMode::ShortOnly,
            ..frictionless(EntryTrigger::EveryBar)
        };
        let s = snaps(1.0, 97.0, 103.0);
        let flat = PositionState::Flat;

        let blocked = evaluate(
            &bar(100.0, 99.0, 101.0, None),
            IndicatorWindow::new(&s),
            &flat,
            &ACCOUNT,
            &cfg,
        );
        assert_eq!(blocked.decision, Decision::NoAction);
        assert_eq!(blocked.gate, Some(GateOutcome::Unavailable));

        let ok = evaluate(
            &bar(100.0, 99.0, 101.0, Some(bearish_filter())),
            IndicatorWindow::new(&s),
            &flat,
            &ACCOUNT,
            &cfg,
        );
        let Decision::OpenShort(plan) = ok.decision else {
            panic!("expected short entry, got {:?}", ok.decision);
        };
        // ATR stop 102 vs structural 103: min is 102
        assert_eq!(plan.stop, 102.0);
    }

    #[test]
    fn structural_above_entry_is_invalid_stop() {
        let cfg = frictionless(EntryTrigger::EveryBar);
        let s = snaps(1.0, 101.0, 110.0);
        let eval = evaluate(
            &bar(100.0, 99.0, 101.0, None),
            IndicatorWindow::new(&s),
            &PositionState::Flat,
            &ACCOUNT,
            &cfg,
        );
        assert_eq!(eval.decision, Decision::NoAction);
        assert!(matches!(eval.rejection, Some(EntryRejection::InvalidStop { .. })));
    }

    #[test]
    fn first_bar_of_segment_cannot_enter() {
        let cfg = frictionless(EntryTrigger::EveryBar);
        let s = snaps(1.0, 97.0, 103.0);
        let eval = evaluate(
            &bar(100.0, 99.0, 101.0, None),
            IndicatorWindow::new(&s[..1]),
            &PositionState::Flat,
            &ACCOUNT,
            &cfg,
        );
        assert!(matches!(
            eval.rejection,
            Some(EntryRejection::IndicatorUnavailable { .. })
        ));
    }

    #[test]
    fn stop_hit_wins_over_everything() {
        let cfg = frictionless(EntryTrigger::Never);
        let s = snaps(1.0, 97.0, 103.0);
        // in profit and past min hold, but the low touches the stop
        let eval = evaluate(
            &bar(110.0, 98.0, 111.0, None),
            IndicatorWindow::new(&s),
            &open_long(98.0, 50),
            &ACCOUNT,
            &cfg,
        );
        assert_eq!(eval.decision, Decision::CloseAtStop { stop: 98.0 });
        assert_eq!(eval.tp2, None);
    }

    #[test]
    fn trail_only_tightens() {
        let cfg = frictionless(EntryTrigger::Never);
        let s = snaps(1.0, 97.0, 103.0);
        let up = evaluate(
            &bar(103.0, 102.0, 104.0, None),
            IndicatorWindow::new(&s),
            &open_long(98.0, 1),
            &ACCOUNT,
            &cfg,
        );
        assert_eq!(up.decision, Decision::UpdateStop { new_stop: 101.0 });

        // lower close would loosen: no action
        let down = evaluate(
            &bar(100.5, 99.5, 101.0, None),
            IndicatorWindow::new(&s),
            &open_long(99.0, 1),
            &ACCOUNT,
            &cfg,
        );
        assert_eq!(down.decision, Decision::NoAction);
    }

    #[test]
    fn profit_protection_tightens_after_min_hold() {
        let cfg = SimConfig {
            min_hold_bars: 16,
            ..frictionless(EntryTrigger::Never)
        };
        // atr 4 -> trail 110 - 8 = 102; mid = 105
        let s = snaps(4.0, 97.0, 103.0);
        let before = evaluate(
            &bar(110.0, 108.0, 111.0, None),
            IndicatorWindow::new(&s),
            &open_long(98.0, 15),
            &ACCOUNT,
            &cfg,
        );
        assert_eq!(before.tp2, Some(Tp2Outcome::HoldGate));
        assert_eq!(before.decision, Decision::UpdateStop { new_stop: 102.0 });
        assert!(!before.tp2_tightened);

        let after = evaluate(
            &bar(110.0, 108.0, 111.0, None),
            IndicatorWindow::new(&s),
            &open_long(98.0, 16),
            &ACCOUNT,
            &cfg,
        );
        assert_eq!(after.tp2, Some(Tp2Outcome::Allow));
        assert_eq!(after.decision, Decision::UpdateStop { new_stop: 105.0 });
        assert!(after.tp2_tightened);
    }

    #[test]
    fn profit_protection_to_bollinger_mid() {
        let cfg = SimConfig {
            tp2_tighten_to: crate::config::TightenTarget::BollMid,
            ..frictionless(EntryTrigger::Never)
        };
        let mut s = snaps(4.0, 97.0, 103.0);
        s[1].boll_mid = Some(106.5);
        let eval = evaluate(
            &bar(110.0, 108.0, 111.0, None),
            IndicatorWindow::new(&s),
            &open_long(98.0, 20),
            &ACCOUNT,
            &cfg,
        );
        assert_eq!(eval.tp2, Some(Tp2Outcome::Allow));
        assert_eq!(eval.decision, Decision::UpdateStop { new_stop: 106.5 });
        assert!(eval.tp2_tightened);

        // without the band only the ATR trail applies
        s[1].boll_mid = None;
        let eval = evaluate(
            &bar(110.0, 108.0, 111.0, None),
            IndicatorWindow::new(&s),
            &open_long(98.0, 20),
            &ACCOUNT,
            &cfg,
        );
        assert_eq!(eval.decision, Decision::UpdateStop { new_stop: 102.0 });
        assert!(!eval.tp2_tightened);
    }

    #[test]
    fn v5_entry_from_signal_stack() {
        let cfg = frictionless(EntryTrigger::V5);
        let mut s = snaps(1.0, 97.0, 103.0);
        s[1].rsi = Some(62.0);
        s[1].macd_hist = Some(0.3);
        s[1].ema = Some(99.0);
        s[1].ema_slow = Some(95.0);
        s[1].boll_mid = Some(98.0);
        let eval = evaluate(
            &bar(100.0, 99.0, 101.0, None),
            IndicatorWindow::new(&s),
            &PositionState::Flat,
            &ACCOUNT,
            &cfg,
        );
        assert!(matches!(eval.decision, Decision::OpenLong(_)));

        s[1].rsi = Some(45.0);
        let eval = evaluate(
            &bar(100.0, 99.0, 101.0, None),
            IndicatorWindow::new(&s),
            &PositionState::Flat,
            &ACCOUNT,
            &cfg,
        );
        assert_eq!(eval.decision, Decision::NoAction);
        assert_eq!(eval.signal, None);
    }

    #[test]
    fn profit_protection_close_action() {
        let cfg = SimConfig {
            tp2_action: Tp2Action::Close,
            ..frictionless(EntryTrigger::Never)
        };
        let s = snaps(4.0, 97.0, 103.0);
        let eval = evaluate(
            &bar(110.0, 108.0, 111.0, None),
            IndicatorWindow::new(&s),
            &open_long(98.0, 20),
            &ACCOUNT,
            &cfg,
        );
        assert_eq!(eval.decision, Decision::CloseForProfitProtection);
    }

    #[test]
    fn range_filter_blocks_entries() {
        let cfg = SimConfig {
            range_filter_adx_below: Some(40.0),
            ..frictionless(EntryTrigger::EveryBar)
        };
        let s = snaps(1.0, 97.0, 103.0);
        let eval = evaluate(
            &bar(100.0, 99.0, 101.0, None),
            IndicatorWindow::new(&s),
            &PositionState::Flat,
            &ACCOUNT,
            &cfg,
        );
        assert!(eval.range_blocked);
        assert_eq!(eval.decision, Decision::NoAction);
    }
}
