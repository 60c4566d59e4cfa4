//! Strategy rules: entry triggers, BearGate, stop placement, sizing, profit
//! protection and the per-bar rule evaluation that combines them.

pub mod beargate;
pub mod decision;
pub mod rules;
pub mod sizing;
pub mod stops;
pub mod tp2;
pub mod trigger;

pub use beargate::{bear_gate, GateOutcome};
pub use decision::{Decision, EntryPlan, Evaluation};
pub use rules::{evaluate, AccountView, IndicatorWindow};
pub use sizing::{position_size, EntryRejection, Sizing};
pub use stops::{atr_stop, initial_stop, ratchet, structural_stop, trail_candidate};
pub use tp2::{tp2_check, tp2_target, Tp2Outcome};
pub use trigger::EntryTrigger;
