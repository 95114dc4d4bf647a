//! Market Core Library
//!
//! Shared candle, signal and trade types, run configuration, indicators and
//! the error taxonomy used by the risk manager and the backtester.

pub mod config;
pub mod error;
pub mod indicators;
pub mod interval;
pub mod types;

pub use config::{BacktestConfig, TradingHours, WindowType};
pub use error::{Error, Result};
pub use types::{Candle, Direction, ExitReason, Signal, Target, Trade};
