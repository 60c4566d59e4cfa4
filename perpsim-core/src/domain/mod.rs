//! Domain types for PerpSim

pub mod candle;
pub mod position;
pub mod timeframe;
pub mod trade;

pub use candle::{format_ms, Candle, TimeRange};
pub use position::{OpenPosition, PositionState, Side};
pub use timeframe::Timeframe;
pub use trade::{EquityPoint, ExitReason, Trade};
