//! Bootstrap resampling of per-trade returns.
//!
//! Trades are assumed exchangeable: each run draws the original number of
//! returns with replacement and compounds them from the starting balance.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::statistics::{mean, std_dev_around};

/// A run is ruined once balance falls below this share of the start.
const RUIN_THRESHOLD: f64 = 0.5;

/// Distribution of simulated total returns, in percent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonteCarloResult {
    pub runs: usize,
    pub mean_return: f64,
    pub median_return: f64,
    pub std_deviation: f64,
    pub best_case: f64,
    pub worst_case: f64,
    pub percentile_5: f64,
    pub percentile_25: f64,
    pub percentile_75: f64,
    pub percentile_95: f64,
    /// Percent of runs ending above the starting balance.
    pub probability_profit: f64,
    /// Percent of runs that hit the ruin threshold.
    pub probability_ruin: f64,
    pub expected_return: f64,
}

/// Resample `returns` (percent per trade) `runs` times with the given RNG.
///
/// Returns `None` when there is nothing to resample.
pub fn resample<R: Rng + ?Sized>(
    returns: &[f64],
    start_balance: f64,
    runs: usize,
    rng: &mut R,
) -> Option<MonteCarloResult> {
    if returns.is_empty() || runs == 0 || start_balance <= 0.0 {
        return None;
    }

    let ruin_level = start_balance * RUIN_THRESHOLD;
    let mut outcomes = Vec::with_capacity(runs);
    let mut profitable = 0usize;
    let mut ruined = 0usize;

    for _ in 0..runs {
        let mut balance = start_balance;
        for _ in 0..returns.len() {
            let r = returns[rng.gen_range(0..returns.len())];
            balance += balance * r / 100.0;
            if balance < ruin_level {
                ruined += 1;
                break;
            }
        }

        let total_return = (balance - start_balance) / start_balance * 100.0;
        if total_return > 0.0 {
            profitable += 1;
        }
        outcomes.push(total_return);
    }

    outcomes.sort_by(|a, b| a.total_cmp(b));

    let percentile = |p: f64| {
        let idx = ((runs as f64 * p) as usize).min(runs - 1);
        outcomes[idx]
    };

    let mean_return = mean(&outcomes);
    let result = MonteCarloResult {
        runs,
        mean_return,
        median_return: outcomes[runs / 2],
        std_deviation: std_dev_around(&outcomes, mean_return),
        best_case: outcomes[runs - 1],
        worst_case: outcomes[0],
        percentile_5: percentile(0.05),
        percentile_25: percentile(0.25),
        percentile_75: percentile(0.75),
        percentile_95: percentile(0.95),
        probability_profit: profitable as f64 / runs as f64 * 100.0,
        probability_ruin: ruined as f64 / runs as f64 * 100.0,
        expected_return: mean_return,
    };

    debug!(
        runs,
        mean = result.mean_return,
        ruin = result.probability_ruin,
        "Monte Carlo resampling finished"
    );

    Some(result)
}

/// Reproducible resampling from a fixed seed.
pub fn resample_seeded(
    returns: &[f64],
    start_balance: f64,
    runs: usize,
    seed: u64,
) -> Option<MonteCarloResult> {
    let mut rng = StdRng::seed_from_u64(seed);
    resample(returns, start_balance, runs, &mut rng)
}
