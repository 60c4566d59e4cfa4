//! Immutable simulation parameters.
//!
//! One `SimConfig` value is built before a run and passed by reference into
//! every pipeline, indicator, rule and engine call. Nothing reads parameters
//! from global state.

use crate::domain::{Side, Timeframe};
use crate::error::ConfigError;
use crate::indicators::Smoothing;
use crate::strategy::EntryTrigger;
use serde::{Deserialize, Serialize};

/// How much capital a trade may lose if its initial stop is hit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RiskBudget {
    /// Fixed amount in quote currency.
    Amount { amount: f64 },
    /// Fraction of current account equity.
    EquityFraction { fraction: f64 },
}

impl RiskBudget {
    pub fn amount_for(&self, equity: f64) -> f64 {
        match *self {
            RiskBudget::Amount { amount } => amount,
            RiskBudget::EquityFraction { fraction } => equity * fraction,
        }
    }

    fn validate(&self, field: &'static str) -> Result<(), ConfigError> {
        match *self {
            RiskBudget::Amount { amount } if !(amount > 0.0) => {
                Err(ConfigError::invalid(field, "amount must be > 0"))
            }
            RiskBudget::EquityFraction { fraction } if !(fraction > 0.0 && fraction <= 1.0) => {
                Err(ConfigError::invalid(field, "fraction must be in (0, 1]"))
            }
            _ => Ok(()),
        }
    }
}

/// Which entry directions are allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeMode {
    Both,
    LongOnly,
    ShortOnly,
}

impl TradeMode {
    pub fn allows(&self, side: Side) -> bool {
        match (self, side) {
            (TradeMode::Both, _) => true,
            (TradeMode::LongOnly, Side::Long) => true,
            (TradeMode::ShortOnly, Side::Short) => true,
            _ => false,
        }
    }
}

/// What the profit-protection rule does once its gates pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tp2Action {
    TightenStop,
    Close,
}

/// Where profit protection moves the stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TightenTarget {
    /// Closer to price of `Mid` and `AtrTrail`.
    Tighter,
    /// Midpoint of entry price and current close.
    Mid,
    /// Current ATR trail level.
    AtrTrail,
    /// Bollinger middle band on the trading timeframe.
    BollMid,
}

/// Periods of the RSI / MACD / Bollinger / slow-EMA stack behind the `v5`
/// trigger. The fast EMA is `ema_period`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalParams {
    pub rsi_period: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub boll_period: usize,
    pub boll_std: f64,
    pub ema_slow_period: usize,
}

impl Default for SignalParams {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            boll_period: 20,
            boll_std: 2.0,
            ema_slow_period: 200,
        }
    }
}

impl SignalParams {
    fn validate(&self) -> Result<(), ConfigError> {
        for (field, period) in [
            ("signals.rsi_period", self.rsi_period),
            ("signals.macd_fast", self.macd_fast),
            ("signals.macd_signal", self.macd_signal),
            ("signals.boll_period", self.boll_period),
            ("signals.ema_slow_period", self.ema_slow_period),
        ] {
            if period == 0 {
                return Err(ConfigError::invalid(field, "must be >= 1"));
            }
        }
        if self.macd_slow <= self.macd_fast {
            return Err(ConfigError::invalid(
                "signals.macd_slow",
                "must be greater than macd_fast",
            ));
        }
        if !(self.boll_std > 0.0) {
            return Err(ConfigError::invalid("signals.boll_std", "must be > 0"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub initial_capital: f64,
    pub risk_budget: RiskBudget,
    /// Budget for short entries; falls back to `risk_budget`.
    pub risk_budget_short: Option<RiskBudget>,
    pub fee_rate: f64,
    pub slippage: f64,
    pub trade_mode: TradeMode,
    pub entry_trigger: EntryTrigger,

    pub atr_period: usize,
    pub atr_smoothing: Smoothing,
    /// Initial stop distance in ATRs.
    pub atr_multiplier: f64,
    /// Trailing stop distance in ATRs; falls back to `atr_multiplier`.
    pub trail_atr_multiplier: Option<f64>,
    pub structural_lookback: usize,

    pub adx_period: usize,
    pub adx_threshold: f64,
    pub ema_period: usize,
    pub ema_slope_lookback: usize,
    /// Entries are blocked while trading-timeframe ADX is below this value.
    pub range_filter_adx_below: Option<f64>,

    /// Minimum unrealized return (fraction of entry price) before profit protection.
    pub min_profit_threshold: f64,
    pub min_profit_threshold_short: Option<f64>,
    pub min_hold_bars: usize,
    pub tp2_action: Tp2Action,
    pub tp2_tighten_to: TightenTarget,

    pub max_notional_pct_short: f64,

    pub signals: SignalParams,

    pub trading_tf: Timeframe,
    pub filter_tf: Timeframe,

    /// Close a position still open on the last bar.
    pub close_at_end: bool,
    /// Fail instead of warn when the window is shorter than indicator lookback.
    pub strict_lookback: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            initial_capital: 10_000.0,
            risk_budget: RiskBudget::Amount { amount: 200.0 },
            risk_budget_short: None,
            fee_rate: 0.0004,
            slippage: 0.0005,
            trade_mode: TradeMode::Both,
            entry_trigger: EntryTrigger::EmaTrend,
            atr_period: 14,
            atr_smoothing: Smoothing::Simple,
            atr_multiplier: 2.0,
            trail_atr_multiplier: None,
            structural_lookback: 5,
            adx_period: 14,
            adx_threshold: 25.0,
            ema_period: 50,
            ema_slope_lookback: 1,
            range_filter_adx_below: None,
            min_profit_threshold: 0.002,
            min_profit_threshold_short: None,
            min_hold_bars: 16,
            tp2_action: Tp2Action::TightenStop,
            tp2_tighten_to: TightenTarget::Tighter,
            max_notional_pct_short: 0.5,
            signals: SignalParams::default(),
            trading_tf: Timeframe::from_minutes(240),
            filter_tf: Timeframe::from_minutes(1440),
            close_at_end: false,
            strict_lookback: false,
        }
    }
}

impl SimConfig {
    pub fn trail_multiplier(&self) -> f64 {
        self.trail_atr_multiplier.unwrap_or(self.atr_multiplier)
    }

    pub fn risk_budget_for(&self, side: Side) -> RiskBudget {
        match side {
            Side::Long => self.risk_budget,
            Side::Short => self.risk_budget_short.unwrap_or(self.risk_budget),
        }
    }

    /// True when the RSI / MACD / Bollinger stack must be computed.
    pub fn uses_signal_stack(&self) -> bool {
        self.entry_trigger == EntryTrigger::V5 || self.tp2_tighten_to == TightenTarget::BollMid
    }

    pub fn min_profit_for(&self, side: Side) -> f64 {
        match side {
            Side::Long => self.min_profit_threshold,
            Side::Short => self
                .min_profit_threshold_short
                .unwrap_or(self.min_profit_threshold),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, period) in [
            ("atr_period", self.atr_period),
            ("structural_lookback", self.structural_lookback),
            ("adx_period", self.adx_period),
            ("ema_period", self.ema_period),
            ("ema_slope_lookback", self.ema_slope_lookback),
        ] {
            if period == 0 {
                return Err(ConfigError::invalid(field, "must be >= 1"));
            }
        }
        if !(self.atr_multiplier > 0.0) {
            return Err(ConfigError::invalid("atr_multiplier", "must be > 0"));
        }
        if let Some(m) = self.trail_atr_multiplier {
            if !(m > 0.0) {
                return Err(ConfigError::invalid("trail_atr_multiplier", "must be > 0"));
            }
        }
        if !(0.0..1.0).contains(&self.fee_rate) {
            return Err(ConfigError::invalid("fee_rate", "must be in [0, 1)"));
        }
        if !(0.0..1.0).contains(&self.slippage) {
            return Err(ConfigError::invalid("slippage", "must be in [0, 1)"));
        }
        if !(self.initial_capital >= 0.0) {
            return Err(ConfigError::invalid("initial_capital", "must be >= 0"));
        }
        self.risk_budget.validate("risk_budget")?;
        if let Some(short) = &self.risk_budget_short {
            short.validate("risk_budget_short")?;
        }
        self.signals.validate()?;
        if !(self.max_notional_pct_short > 0.0) {
            return Err(ConfigError::invalid("max_notional_pct_short", "must be > 0"));
        }
        if self.min_profit_threshold < 0.0 || self.min_profit_threshold_short.is_some_and(|v| v < 0.0)
        {
            return Err(ConfigError::invalid("min_profit_threshold", "must be >= 0"));
        }
        if self.filter_tf < self.trading_tf {
            return Err(ConfigError::TimeframeMismatch {
                trading: self.trading_tf.to_string(),
                filter: self.filter_tf.to_string(),
            });
        }
        Ok(())
    }
}
