//! Walk-forward analysis over rolling train/test windows.
//!
//! Each test slice is backtested out of sample, with capital carried from one
//! period to the next. The training slice only positions the window; signal
//! sources in this crate are not fitted.

use market_core::interval::{candles_per_day, interval_hours};
use market_core::{BacktestConfig, Candle, Error, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::engine::BacktestDriver;
use crate::result::{BacktestResult, TradeLedger};
use crate::statistics::{self, mean, std_dev_around, RunInfo};
use crate::strategy::SignalSource;

/// One out-of-sample period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalkForwardPeriod {
    /// 1-based.
    pub period_num: usize,
    pub train_start: usize,
    pub train_end: usize,
    pub test_start: usize,
    /// Exclusive.
    pub test_end: usize,
    pub start_balance: f64,
    pub final_balance: f64,
    pub win_rate: f64,
    pub return_percent: f64,
    pub profit_factor: f64,
    pub total_trades: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WalkForwardAnalysis {
    pub periods: Vec<WalkForwardPeriod>,
    /// Win rate over every out-of-sample trade.
    pub out_of_sample_win_rate: f64,
    /// 100 minus ten times the spread of period returns, floored at 0.
    pub consistency: f64,
}

/// Index bounds of a train/test split.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodBounds {
    pub train_start: usize,
    pub train_end: usize,
    pub test_start: usize,
    pub test_end: usize,
}

/// Split `len` candles into train/test windows stepping by half a test window.
pub fn period_bounds(len: usize, train: usize, test: usize) -> Vec<PeriodBounds> {
    let step = (test / 2).max(1);
    let mut bounds = Vec::new();
    let mut start = 0;
    while start + train + test < len {
        bounds.push(PeriodBounds {
            train_start: start,
            train_end: start + train,
            test_start: start + train,
            test_end: start + train + test,
        });
        start += step;
    }
    bounds
}

pub struct WalkForwardOrchestrator<'a> {
    config: BacktestConfig,
    source: &'a dyn SignalSource,
}

impl<'a> WalkForwardOrchestrator<'a> {
    pub fn new(config: BacktestConfig, source: &'a dyn SignalSource) -> Self {
        Self {
            config: config.with_defaults(),
            source,
        }
    }

    /// Train and test window lengths in candles.
    pub fn window_lengths(&self) -> (usize, usize) {
        let per_day = candles_per_day(&self.config.interval);
        (
            self.config.training_days as usize * per_day,
            self.config.testing_days as usize * per_day,
        )
    }

    pub fn run(&self, candles: &[Candle]) -> Result<BacktestResult> {
        // per-period failures are dropped, so reject this before splitting
        if !self.source.supports(&self.config.strategy) {
            return Err(Error::UnknownStrategy(self.config.strategy.clone()));
        }

        let (train, test) = self.window_lengths();
        let bounds = period_bounds(candles.len(), train, test);
        if bounds.is_empty() {
            return Err(Error::InsufficientCandles {
                required: train + test + 1,
                actual: candles.len(),
            });
        }

        info!(
            strategy = %self.config.strategy,
            periods = bounds.len(),
            train,
            test,
            "Starting walk-forward analysis"
        );

        let mut ledger = TradeLedger::new(self.config.start_balance);
        let mut periods = Vec::with_capacity(bounds.len());
        let mut balance = self.config.start_balance;

        for (n, b) in bounds.iter().enumerate() {
            let config = BacktestConfig {
                start_balance: balance,
                ..self.config.clone()
            };
            let driver = BacktestDriver::new(config, self.source);

            let result = match driver.run(&candles[b.test_start..b.test_end]) {
                Ok(result) => result,
                Err(e) => {
                    debug!(period = n + 1, error = %e, "Dropping walk-forward period");
                    continue;
                }
            };

            debug!(
                period = n + 1,
                trades = result.total_trades,
                return_percent = result.return_percent,
                "Walk-forward period finished"
            );

            for trade in &result.trades {
                let mut trade = trade.clone();
                trade.entry_index += b.test_start;
                ledger.record(trade);
            }

            periods.push(WalkForwardPeriod {
                period_num: periods.len() + 1,
                train_start: b.train_start,
                train_end: b.train_end,
                test_start: b.test_start,
                test_end: b.test_end,
                start_balance: balance,
                final_balance: result.final_balance,
                win_rate: result.win_rate,
                return_percent: result.return_percent,
                profit_factor: result.profit_factor,
                total_trades: result.total_trades,
            });
            balance = result.final_balance;
        }

        let mut result = statistics::aggregate(
            ledger,
            RunInfo {
                strategy_name: self.config.strategy.clone(),
                window_type: self.config.window_type,
                interval_hours: interval_hours(&self.config.interval),
            },
        );

        let consistency = if periods.len() > 1 {
            let returns: Vec<f64> = periods.iter().map(|p| p.return_percent).collect();
            let spread = std_dev_around(&returns, mean(&returns));
            (100.0 - spread * 10.0).max(0.0)
        } else {
            0.0
        };

        result.walk_forward = Some(WalkForwardAnalysis {
            out_of_sample_win_rate: result.win_rate,
            consistency,
            periods,
        });

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use market_core::{Direction, Signal};

    const HOUR_MS: i64 = 3_600_000;

    struct EveryBar;

    impl SignalSource for EveryBar {
        fn supports(&self, _strategy: &str) -> bool {
            true
        }

        fn generate_signal(&self, window: &[Candle], _strategy: &str) -> Option<Signal> {
            let close = window.last()?.close;
            Some(Signal::new(Direction::Buy, close, close - 1.0, &[(close + 1.0, 100)]))
        }
    }

    /// Alternating bars: even bars close winners, odd bars stop out.
    fn zigzag(n: usize) -> Vec<Candle> {
        (0..n)
            .map(|i| {
                let ts = i as i64 * HOUR_MS;
                if i % 2 == 0 {
                    Candle::new(ts, 100.0, 101.5, 99.5, 100.0, 1.0)
                } else {
                    Candle::new(ts, 100.0, 100.5, 98.5, 100.0, 1.0)
                }
            })
            .collect()
    }

    fn config() -> BacktestConfig {
        BacktestConfig {
            interval: "1h".into(),
            strategy: "test".into(),
            min_window: 10,
            max_window: 20,
            forward_horizon: 5,
            skip_ahead: 1,
            training_days: 2,
            testing_days: 1,
            ..Default::default()
        }
    }

    #[test]
    fn test_period_bounds() {
        let bounds = period_bounds(100, 40, 20);

        // starts 0, 10, 20, 30; 40 + 40 + 20 == 100 is excluded
        assert_eq!(bounds.len(), 4);
        assert_eq!(bounds[0].test_start, 40);
        assert_eq!(bounds[0].test_end, 60);
        assert_eq!(bounds[3].train_start, 30);
        assert_eq!(bounds[3].test_end, 90);
    }

    #[test]
    fn test_period_bounds_step_at_least_one() {
        let bounds = period_bounds(5, 2, 1);
        assert_eq!(bounds.len(), 2);
        assert_eq!(bounds[1].train_start, 1);
    }

    #[test]
    fn test_too_short_series_is_fatal() {
        let source = EveryBar;
        let wf = WalkForwardOrchestrator::new(config(), &source);

        let err = wf.run(&zigzag(72)).unwrap_err();
        assert!(matches!(err, Error::InsufficientCandles { required: 73, .. }));
    }

    #[test]
    fn test_unknown_strategy_is_fatal() {
        let mut source = crate::strategy::MockSignalSource::new();
        source.expect_supports().returning(|_| false);
        source.expect_generate_signal().never();

        let wf = WalkForwardOrchestrator::new(config(), &source);
        let err = wf.run(&zigzag(150)).unwrap_err();
        assert!(matches!(err, Error::UnknownStrategy(name) if name == "test"));
    }

    #[test]
    fn test_capital_chains_between_periods() {
        let source = EveryBar;
        let wf = WalkForwardOrchestrator::new(config(), &source);
        let result = wf.run(&zigzag(150)).unwrap();
        let analysis = result.walk_forward.as_ref().unwrap();

        assert!(analysis.periods.len() > 1);
        assert_eq!(analysis.periods[0].start_balance, result.start_balance);
        for pair in analysis.periods.windows(2) {
            assert_eq!(pair[1].start_balance, pair[0].final_balance);
        }

        let last = analysis.periods.last().unwrap();
        assert!((result.final_balance - last.final_balance).abs() < 1e-6);
    }

    #[test]
    fn test_trade_counts_add_up() {
        let source = EveryBar;
        let wf = WalkForwardOrchestrator::new(config(), &source);
        let result = wf.run(&zigzag(150)).unwrap();
        let analysis = result.walk_forward.as_ref().unwrap();

        let total: usize = analysis.periods.iter().map(|p| p.total_trades).sum();
        assert_eq!(total, result.total_trades);
        assert_eq!(analysis.out_of_sample_win_rate, result.win_rate);
        assert!((0.0..=100.0).contains(&analysis.consistency));
    }

    #[test]
    fn test_entry_index_offset_to_absolute() {
        let source = EveryBar;
        let wf = WalkForwardOrchestrator::new(config(), &source);
        let result = wf.run(&zigzag(150)).unwrap();
        let analysis = result.walk_forward.as_ref().unwrap();

        let first = &analysis.periods[0];
        let first_trade = &result.trades[0];
        assert!(first_trade.entry_index >= first.test_start + 10);
        assert!(first_trade.entry_index < first.test_end);
        // candle timestamps ride along unchanged
        assert_eq!(first_trade.entry_time, first_trade.entry_index as i64 * HOUR_MS);
    }

    #[test]
    fn test_short_period_dropped() {
        // a test window of 24 bars cannot hold min_window + forward_horizon = 30
        let source = EveryBar;
        let wf = WalkForwardOrchestrator::new(
            BacktestConfig {
                min_window: 25,
                ..config()
            },
            &source,
        );
        let result = wf.run(&zigzag(150)).unwrap();
        let analysis = result.walk_forward.unwrap();

        assert!(analysis.periods.is_empty());
        assert_eq!(result.total_trades, 0);
        assert_eq!(analysis.consistency, 0.0);
    }
}
