//! Risk-budget position sizing.
//!
//! ```text
//! stop_distance = entry - stop      (long)
//!               = stop - entry      (short)
//! quantity      = risk_budget / stop_distance
//! ```
//! Shorts use `risk_budget_short` when it is set.
//! Shorts are additionally capped so that entry notional never exceeds
//! `max_notional_pct_short × equity`. The cap only ever reduces size.

use crate::config::SimConfig;
use crate::domain::Side;
use serde::{Deserialize, Serialize};

/// Why a proposed entry was turned into `NoAction`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntryRejection {
    #[error("invalid stop: stop {stop} is not on the loss side of entry {entry}")]
    InvalidStop { entry: f64, stop: f64 },

    #[error("indicator unavailable: {indicator}")]
    IndicatorUnavailable { indicator: String },

    #[error("position size rounds to zero")]
    ZeroQuantity,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sizing {
    pub quantity: f64,
    pub stop_distance: f64,
    pub risk_amount: f64,
    /// True when the short notional cap reduced the quantity.
    pub capped: bool,
}

pub fn position_size(
    side: Side,
    entry: f64,
    stop: f64,
    equity: f64,
    config: &SimConfig,
) -> Result<Sizing, EntryRejection> {
    let stop_distance = side.sign() * (entry - stop);
    if !(stop_distance > 0.0) {
        return Err(EntryRejection::InvalidStop { entry, stop });
    }

    let risk_amount = config.risk_budget_for(side).amount_for(equity);
    let mut quantity = risk_amount / stop_distance;
    let mut capped = false;

    if side == Side::Short {
        let max_quantity = config.max_notional_pct_short * equity / entry;
        if quantity > max_quantity {
            quantity = max_quantity;
            capped = true;
        }
    }

    if !(quantity > 0.0) || !quantity.is_finite() {
        return Err(EntryRejection::ZeroQuantity);
    }

    Ok(Sizing {
        quantity,
        stop_distance,
        risk_amount,
        capped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RiskBudget;

    #[test]
    fn long_quantity_is_budget_over_distance() {
        let cfg = SimConfig::default();
        let s = position_size(Side::Long, 100.0, 98.0, 10_000.0, &cfg).unwrap();
        assert_eq!(s.quantity, 100.0);
        assert_eq!(s.stop_distance, 2.0);
        assert!(!s.capped);
    }

    #[test]
    fn stop_on_wrong_side_is_invalid() {
        let cfg = SimConfig::default();
        assert_eq!(
            position_size(Side::Long, 100.0, 100.0, 10_000.0, &cfg),
            Err(EntryRejection::InvalidStop {
                entry: 100.0,
                stop: 100.0
            })
        );
        assert!(matches!(
            position_size(Side::Short, 100.0, 99.0, 10_000.0, &cfg),
            Err(EntryRejection::InvalidStop { .. })
        ));
    }

    #[test]
    fn short_notional_is_capped() {
        let cfg = SimConfig {
            risk_budget: RiskBudget::Amount { amount: 200.0 },
            max_notional_pct_short: 0.5,
            ..SimConfig::default()
        };
        // uncapped: 200 / 0.5 = 400 units = 40_000 notional
        let s = position_size(Side::Short, 100.0, 100.5, 10_000.0, &cfg).unwrap();
        assert!(s.capped);
        assert!((s.quantity - 50.0).abs() < 1e-12);
        assert!(s.quantity * 100.0 <= 0.5 * 10_000.0 + 1e-9);
    }

    #[test]
    fn cap_never_increases_size() {
        let cfg = SimConfig::default();
        let s = position_size(Side::Short, 100.0, 110.0, 10_000.0, &cfg).unwrap();
        assert!(!s.capped);
        assert_eq!(s.quantity, 20.0);
    }

    #[test]
    fn equity_fraction_budget() {
        let cfg = SimConfig {
            risk_budget: RiskBudget::EquityFraction { fraction: 0.01 },
            ..SimConfig::default()
        };
        let s = position_size(Side::Long, 50.0, 49.0, 20_000.0, &cfg).unwrap();
        assert_eq!(s.risk_amount, 200.0);
        assert_eq!(s.quantity, 200.0);
    }

    #[test]
    fn short_budget_override_sizes_shorts_only() {
        let cfg = SimConfig {
            risk_budget_short: Some(RiskBudget::Amount { amount: 50.0 }),
            ..SimConfig::default()
        };
        let short = position_size(Side::Short, 100.0, 102.0, 10_000.0, &cfg).unwrap();
        assert_eq!(short.risk_amount, 50.0);
        assert_eq!(short.quantity, 25.0);
        let long = position_size(Side::Long, 100.0, 98.0, 10_000.0, &cfg).unwrap();
        assert_eq!(long.risk_amount, 200.0);
    }

    #[test]
    fn zero_equity_short_is_rejected() {
        let cfg = SimConfig::default();
        assert_eq!(
            position_size(Side::Short, 100.0, 102.0, 0.0, &cfg),
            Err(EntryRejection::ZeroQuantity)
        );
    }
}
