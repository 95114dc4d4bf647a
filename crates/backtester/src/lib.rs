//! Backtester
//!
//! Candle-based simulation framework for testing trading strategies.
//!
//! # Features
//!
//! - **Signal Source Trait**: Pluggable signal interface with an ATR breakout reference source
//! - **Trade Simulator**: Stop, trailing stop and target resolution with slippage and fees
//! - **Backtest Driver**: Bar-by-bar walk with daily caps, loss breaker and entry filters
//! - **Analyses**: Monte Carlo resampling, walk-forward periods and stress scenarios
//! - **Parallel Evaluation**: Rank several strategies over the same candles with rayon
//!
//! # Example
//!
//! ```ignore
//! use backtester::{load_candles, AtrSignalSource, BacktestRunner};
//! use market_core::BacktestConfig;
//!
//! let candles = load_candles("data/BTCUSDT-15m.csv")?;
//! let source = AtrSignalSource::default();
//! let config = BacktestConfig::new("BTCUSDT", "15m", "breakout_master");
//!
//! let result = BacktestRunner::new(config, &source).run(&candles)?;
//! println!("Return: {:.2}%", result.return_percent);
//! ```

pub mod data_store;
pub mod engine;
pub mod export;
pub mod monte_carlo;
pub mod parallel;
pub mod result;
pub mod runner;
pub mod simulator;
pub mod statistics;
pub mod strategy;
pub mod walk_forward;

// Re-exports
pub use data_store::{load_candles, read_csv, read_json, CandleFormat};
pub use engine::BacktestDriver;
pub use export::{to_csv, to_json, write_csv, write_json};
pub use monte_carlo::{resample, resample_seeded, MonteCarloResult};
pub use parallel::{ParallelStrategyEvaluator, StrategyRun};
pub use result::{BacktestResult, TradeLedger};
pub use runner::{performance_rating, BacktestRunner, PerformanceRating};
pub use simulator::{SimulationParams, TradeSimulator};
pub use statistics::{aggregate, strategy_score, RunInfo};
pub use strategy::{AtrSignalSource, SignalSource, StrategyMultipliers};
pub use stress_test::{StressTestHarness, StressTestResult};
pub use walk_forward::{WalkForwardAnalysis, WalkForwardOrchestrator, WalkForwardPeriod};
