//! Strategy Lab: Candle Strategy Backtester
//!
//! This is the root crate that provides benchmark and integration test access
//! to the internal modules. For actual functionality, use the individual crates
//! directly:
//!
//! - `market-core`: Candle, signal and trade types, configuration, indicators, errors
//! - `risk-manager`: Position sizing, trade gate, entry filters, stops
//! - `backtester`: Trade simulation, statistics, Monte Carlo, walk-forward, stress tests
//! - `backtest-cli`: Command-line runner

// Re-export for benchmarks
pub use backtester as backtest;
pub use market_core as core;
pub use risk_manager as risk;
