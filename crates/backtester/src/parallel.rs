//! Evaluate several strategies over the same candles in parallel.

use market_core::{BacktestConfig, Candle, Error, Result};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

use crate::engine::BacktestDriver;
use crate::result::BacktestResult;
use crate::statistics::strategy_score;
use crate::strategy::SignalSource;

/// Outcome of one strategy in a parallel evaluation.
#[derive(Debug, Clone, Serialize)]
pub struct StrategyRun {
    pub strategy: String,
    /// `None` when the run failed.
    pub result: Option<BacktestResult>,
    pub score: Option<f64>,
}

/// One driver run per strategy, each on its own rayon task.
///
/// Every task writes only its own result slot; slots are read after all
/// tasks have joined.
pub struct ParallelStrategyEvaluator<'a> {
    config: BacktestConfig,
    source: &'a dyn SignalSource,
}

impl<'a> ParallelStrategyEvaluator<'a> {
    pub fn new(config: BacktestConfig, source: &'a dyn SignalSource) -> Self {
        Self {
            config: config.with_defaults(),
            source,
        }
    }

    /// Run every strategy and report each slot with its score.
    pub fn evaluate_all(&self, candles: &[Candle], strategies: &[String]) -> Vec<StrategyRun> {
        info!(
            strategies = strategies.len(),
            candles = candles.len(),
            "Starting parallel strategy evaluation"
        );

        let mut slots: Vec<Option<BacktestResult>> = vec![None; strategies.len()];

        slots
            .par_iter_mut()
            .zip(strategies.par_iter())
            .for_each(|(slot, strategy)| {
                let config = BacktestConfig {
                    strategy: strategy.clone(),
                    ..self.config.clone()
                };
                match BacktestDriver::new(config, self.source).run(candles) {
                    Ok(result) => *slot = Some(result),
                    Err(e) => warn!(strategy = %strategy, error = %e, "Strategy backtest failed"),
                }
            });

        strategies
            .iter()
            .zip(slots)
            .map(|(strategy, result)| StrategyRun {
                strategy: strategy.clone(),
                score: result.as_ref().map(strategy_score),
                result,
            })
            .collect()
    }

    /// Highest-scoring successful run. Ties keep the earlier strategy.
    pub fn best(&self, candles: &[Candle], strategies: &[String]) -> Result<BacktestResult> {
        let mut best: Option<(f64, BacktestResult)> = None;

        for run in self.evaluate_all(candles, strategies) {
            let (Some(result), Some(score)) = (run.result, run.score) else {
                continue;
            };
            if best.as_ref().map_or(true, |(top, _)| score > *top) {
                best = Some((score, result));
            }
        }

        let (score, result) = best.ok_or(Error::NoSuccessfulRun)?;
        info!(
            strategy = %result.strategy_name,
            score,
            "Best strategy selected"
        );
        Ok(result)
    }
}
