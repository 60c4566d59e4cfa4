//! Base entry triggers.

use crate::domain::Side;
use crate::indicators::IndicatorSnapshot;
use serde::{Deserialize, Serialize};

/// Predicate that proposes an entry on a bar. Unavailable inputs mean no signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryTrigger {
    /// Never fires.
    Never,
    /// Fires on every bar for both sides.
    EveryBar,
    /// Long: close above EMA with rising slope. Short: close below EMA with falling slope.
    EmaTrend,
    /// Long: close above the previous bar's structural high. Short: below its structural low.
    StructureBreakout,
    /// Long: RSI > 50, MACD histogram > 0, close > fast EMA > slow EMA and
    /// close above the Bollinger middle band. Short: the mirror image.
    V5,
}

impl EntryTrigger {
    pub fn fires(
        &self,
        side: Side,
        close: f64,
        current: &IndicatorSnapshot,
        previous: Option<&IndicatorSnapshot>,
    ) -> bool {
        match self {
            EntryTrigger::Never => false,
            EntryTrigger::EveryBar => true,
            EntryTrigger::EmaTrend => match (current.ema, current.ema_slope) {
                (Some(ema), Some(slope)) => match side {
                    Side::Long => close > ema && slope > 0.0,
                    Side::Short => close < ema && slope < 0.0,
                },
                _ => false,
            },
            EntryTrigger::StructureBreakout => {
                let Some(prev) = previous else {
                    return false;
                };
                match side {
                    Side::Long => prev.structural_high.is_some_and(|h| close > h),
                    Side::Short => prev.structural_low.is_some_and(|l| close < l),
                }
            }
            EntryTrigger::V5 => v5_fires(side, close, current),
        }
    }
}

fn v5_fires(side: Side, close: f64, s: &IndicatorSnapshot) -> bool {
    let (Some(rsi), Some(hist), Some(fast), Some(slow), Some(mid)) =
        (s.rsi, s.macd_hist, s.ema, s.ema_slow, s.boll_mid)
    else {
        return false;
    };
    match side {
        Side::Long => rsi > 50.0 && hist > 0.0 && close > fast && fast > slow && close > mid,
        Side::Short => rsi < 50.0 && hist < 0.0 && close < fast && fast < slow && close < mid,
    }
}
