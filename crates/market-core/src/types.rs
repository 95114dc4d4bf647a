//! Core domain types for the backtesting system.

pub mod candle;
pub mod signal;
pub mod trade;

pub use candle::*;
pub use signal::*;
pub use trade::*;
