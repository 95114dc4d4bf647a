//! Risk Manager
//!
//! Position sizing, trade gating, entry filters and stop management for simulated trades.

pub mod circuit_breaker;
pub mod filters;
pub mod sizing;
pub mod stop_loss;

pub use circuit_breaker::{TradeGate, TradeGateConfig, TripReason};
pub use filters::{HoursFilter, VolatilityFilter};
pub use sizing::{PositionSize, PositionSizer};
pub use stop_loss::{ProtectiveStop, TrailingStop};
