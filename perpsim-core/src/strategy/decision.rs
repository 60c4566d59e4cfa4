//! The per-bar decision produced by the rule engine.

use super::beargate::GateOutcome;
use super::sizing::EntryRejection;
use super::tp2::Tp2Outcome;
use crate::domain::Side;
use serde::{Deserialize, Serialize};

/// A fully sized entry, ready to execute at the bar close.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EntryPlan {
    pub side: Side,
    /// Slipped fill price; also the entry price the stop was placed from.
    pub fill_price: f64,
    pub stop: f64,
    pub quantity: f64,
    pub atr_stop: f64,
    pub structural_stop: f64,
    pub capped: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Decision {
    NoAction,
    OpenLong(EntryPlan),
    OpenShort(EntryPlan),
    UpdateStop { new_stop: f64 },
    CloseAtStop { stop: f64 },
    CloseForProfitProtection,
}

impl Decision {
    pub fn is_entry(&self) -> bool {
        matches!(self, Decision::OpenLong(_) | Decision::OpenShort(_))
    }

    pub fn is_exit(&self) -> bool {
        matches!(
            self,
            Decision::CloseAtStop { .. } | Decision::CloseForProfitProtection
        )
    }
}

/// A decision together with the gate results that led to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub decision: Decision,
    /// Base trigger fired for this side while flat.
    pub signal: Option<Side>,
    /// BearGate result when a short was considered.
    pub gate: Option<GateOutcome>,
    pub rejection: Option<EntryRejection>,
    /// Entry blocked by the trading-timeframe range filter.
    pub range_blocked: bool,
    pub tp2: Option<Tp2Outcome>,
    /// Profit protection moved the stop on this bar.
    pub tp2_tightened: bool,
}

impl Evaluation {
    pub fn new(decision: Decision) -> Self {
        Self {
            decision,
            signal: None,
            gate: None,
            rejection: None,
            range_blocked: false,
            tp2: None,
            tp2_tightened: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_and_entry_classification() {
        assert!(Decision::CloseAtStop { stop: 1.0 }.is_exit());
        assert!(Decision::CloseForProfitProtection.is_exit());
        assert!(!Decision::UpdateStop { new_stop: 1.0 }.is_exit());
        assert!(!Decision::NoAction.is_entry());
    }

    #[test]
    fn decision_serializes_with_action_tag() {
        let json = serde_json::to_string(&Decision::UpdateStop { new_stop: 2.5 }).unwrap();
        assert_eq!(json, r#"{"action":"update_stop","new_stop":2.5}"#);
    }
}
