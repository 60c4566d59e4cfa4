//! Fill prices and fees.
//!
//! Slippage is directional: buys fill above the reference price, sells below.
//! Fees are a flat fraction of fill notional, charged on entry and on exit.

use crate::config::SimConfig;
use crate::domain::Side;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostModel {
    pub fee_rate: f64,
    pub slippage: f64,
}

impl CostModel {
    pub fn new(fee_rate: f64, slippage: f64) -> Self {
        Self { fee_rate, slippage }
    }

    pub fn from_config(config: &SimConfig) -> Self {
        Self::new(config.fee_rate, config.slippage)
    }

    pub fn frictionless() -> Self {
        Self::new(0.0, 0.0)
    }

    pub fn buy_fill(&self, price: f64) -> f64 {
        price * (1.0 + self.slippage)
    }

    pub fn sell_fill(&self, price: f64) -> f64 {
        price * (1.0 - self.slippage)
    }

    /// Opening a long buys; opening a short sells.
    pub fn entry_fill(&self, side: Side, price: f64) -> f64 {
        match side {
            Side::Long => self.buy_fill(price),
            Side::Short => self.sell_fill(price),
        }
    }

    /// Closing a long sells; closing a short buys.
    pub fn exit_fill(&self, side: Side, price: f64) -> f64 {
        match side {
            Side::Long => self.sell_fill(price),
            Side::Short => self.buy_fill(price),
        }
    }

    pub fn fee(&self, fill_price: f64, quantity: f64) -> f64 {
        fill_price * quantity * self.fee_rate
    }
}
