//! Top-level backtest session: picks the run mode and attaches optional analyses.

use std::time::Instant;

use market_core::{BacktestConfig, Candle, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::engine::BacktestDriver;
use crate::monte_carlo;
use crate::parallel::ParallelStrategyEvaluator;
use crate::result::BacktestResult;
use crate::statistics::strategy_score;
use crate::stress_test::StressTestHarness;
use crate::strategy::SignalSource;
use crate::walk_forward::WalkForwardOrchestrator;

/// Monte Carlo needs more trades than this to be meaningful.
const MIN_MONTE_CARLO_TRADES: usize = 10;

/// Coarse quality band of a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PerformanceRating {
    Exceptional,
    Excellent,
    Good,
    Moderate,
    Poor,
}

impl PerformanceRating {
    pub fn as_str(&self) -> &'static str {
        match self {
            PerformanceRating::Exceptional => "EXCEPTIONAL",
            PerformanceRating::Excellent => "EXCELLENT",
            PerformanceRating::Good => "GOOD",
            PerformanceRating::Moderate => "MODERATE",
            PerformanceRating::Poor => "POOR",
        }
    }
}

impl std::fmt::Display for PerformanceRating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn performance_rating(result: &BacktestResult) -> PerformanceRating {
    let score = strategy_score(result);
    let wr = result.win_rate;
    let pf = result.profit_factor;

    if score > 100.0 && wr >= 70.0 && pf >= 2.5 {
        PerformanceRating::Exceptional
    } else if score > 50.0 && wr >= 60.0 && pf >= 2.0 {
        PerformanceRating::Excellent
    } else if score > 20.0 && wr >= 55.0 && pf >= 1.5 {
        PerformanceRating::Good
    } else if score > 0.0 && wr >= 50.0 {
        PerformanceRating::Moderate
    } else {
        PerformanceRating::Poor
    }
}

/// Owns one configured backtest session.
pub struct BacktestRunner<'a> {
    config: BacktestConfig,
    source: &'a dyn SignalSource,
}

impl<'a> BacktestRunner<'a> {
    pub fn new(config: BacktestConfig, source: &'a dyn SignalSource) -> Self {
        Self {
            config: config.with_defaults(),
            source,
        }
    }

    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    pub fn run(&self, candles: &[Candle]) -> Result<BacktestResult> {
        let started = Instant::now();
        let config = &self.config;

        info!(
            symbol = %config.symbol,
            interval = %config.interval,
            strategy = %config.strategy,
            candles = candles.len(),
            "Starting backtest"
        );

        let strategies = config.parallel_strategies();
        let mut result = if config.enable_parallel && strategies.len() > 1 {
            ParallelStrategyEvaluator::new(config.clone(), self.source).best(candles, strategies)?
        } else if config.use_walk_forward {
            WalkForwardOrchestrator::new(config.clone(), self.source).run(candles)?
        } else {
            BacktestDriver::new(config.clone(), self.source).run(candles)?
        };

        if config.enable_monte_carlo && result.total_trades > MIN_MONTE_CARLO_TRADES {
            let returns = result.trade_returns();
            let runs = config.monte_carlo_runs;
            result.monte_carlo = match config.monte_carlo_seed {
                Some(seed) => monte_carlo::resample_seeded(&returns, config.start_balance, runs, seed),
                None => {
                    let mut rng = StdRng::from_entropy();
                    monte_carlo::resample(&returns, config.start_balance, runs, &mut rng)
                }
            };
        }

        if config.enable_stress_test {
            result.stress_test = Some(StressTestHarness::new(config.clone(), self.source).run(candles));
        }

        result.duration = format!("{:?}", started.elapsed());

        info!(
            strategy = %result.strategy_name,
            trades = result.total_trades,
            win_rate = result.win_rate,
            return_percent = result.return_percent,
            max_drawdown = result.max_drawdown,
            profit_factor = result.profit_factor,
            rating = %performance_rating(&result),
            duration = %result.duration,
            "Backtest complete"
        );

        Ok(result)
    }
}
