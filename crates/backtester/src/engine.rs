//! Bar-by-bar backtest driver.

use market_core::interval::interval_hours;
use market_core::{BacktestConfig, Candle, Error, Result, WindowType};
use risk_manager::{HoursFilter, TradeGate, TradeGateConfig, VolatilityFilter};
use tracing::{debug, trace};

use crate::result::{BacktestResult, TradeLedger};
use crate::simulator::{SimulationParams, TradeSimulator};
use crate::statistics::{self, RunInfo};
use crate::strategy::SignalSource;

/// Walks a candle series, asking the signal source for entries and
/// simulating each one against the following `forward_horizon` bars.
pub struct BacktestDriver<'a> {
    config: BacktestConfig,
    source: &'a dyn SignalSource,
    simulator: TradeSimulator,
    hours: HoursFilter,
    volatility: VolatilityFilter,
}

impl<'a> BacktestDriver<'a> {
    pub fn new(config: BacktestConfig, source: &'a dyn SignalSource) -> Self {
        let config = config.with_defaults();
        Self {
            simulator: TradeSimulator::new(SimulationParams::from_config(&config)),
            hours: HoursFilter::new(config.trading_hours),
            volatility: VolatilityFilter::new(config.min_volatility, config.max_volatility),
            config,
            source,
        }
    }

    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    /// Run over the whole series and aggregate statistics.
    pub fn run(&self, candles: &[Candle]) -> Result<BacktestResult> {
        let ledger = self.walk(candles)?;
        Ok(statistics::aggregate(
            ledger,
            RunInfo {
                strategy_name: self.config.strategy.clone(),
                window_type: self.config.window_type,
                interval_hours: interval_hours(&self.config.interval),
            },
        ))
    }

    /// Run over the series and return the raw ledger.
    pub fn walk(&self, candles: &[Candle]) -> Result<TradeLedger> {
        let required = self.config.min_candles();
        if candles.len() < required {
            return Err(Error::InsufficientCandles {
                required,
                actual: candles.len(),
            });
        }
        if !self.source.supports(&self.config.strategy) {
            return Err(Error::UnknownStrategy(self.config.strategy.clone()));
        }

        debug!(
            strategy = %self.config.strategy,
            candles = candles.len(),
            window = self.config.window_type.as_str(),
            "Starting backtest walk"
        );

        let mut gate = TradeGate::new(TradeGateConfig {
            max_trades_per_day: self.config.max_trades_per_day,
            max_consecutive_losses: self.config.max_consecutive_loss,
        });
        let mut ledger = TradeLedger::new(self.config.start_balance);

        let end = candles.len() - self.config.forward_horizon;
        let mut i = self.config.min_window;
        while i < end {
            let traded = self.evaluate_bar(candles, i, &mut gate, &mut ledger)?;
            i += if traded { self.config.skip_ahead + 1 } else { 1 };
        }

        debug!(
            strategy = %self.config.strategy,
            trades = ledger.trades().len(),
            final_balance = ledger.balance(),
            "Backtest walk finished"
        );

        Ok(ledger)
    }

    /// Process one bar. Returns whether a trade was recorded.
    fn evaluate_bar(
        &self,
        candles: &[Candle],
        i: usize,
        gate: &mut TradeGate,
        ledger: &mut TradeLedger,
    ) -> Result<bool> {
        let bar = &candles[i];

        gate.roll_day(bar.day());
        if let Some(reason) = gate.check() {
            trace!(index = i, ?reason, "Trade gate closed");
            return Ok(false);
        }

        if self.config.trading_hours_only && !self.hours.allows(bar.timestamp) {
            return Ok(false);
        }

        let window = self.window(candles, i);
        if !self.volatility.allows(window, bar) {
            return Ok(false);
        }

        let Some(signal) = self.source.generate_signal(window, &self.config.strategy) else {
            return Ok(false);
        };
        if !signal.is_actionable() {
            return Ok(false);
        }

        let forward = &candles[i..i + self.config.forward_horizon];
        match self.simulator.simulate(&signal, forward) {
            Ok(Some(mut trade)) => {
                trade.entry_index = i;
                trade.entry_time = bar.timestamp;
                let is_win = trade.is_win();
                let trade = ledger.record(trade);
                trace!(
                    index = i,
                    reason = %trade.exit_reason,
                    profit = trade.profit,
                    balance = trade.balance_after,
                    "Trade closed"
                );
                gate.record_trade(is_win);
                Ok(true)
            }
            Ok(None) => Ok(false),
            Err(e) if !e.is_fatal() => {
                debug!(index = i, error = %e, "Skipping signal");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Lookback window ending just before bar `i`.
    fn window<'c>(&self, candles: &'c [Candle], i: usize) -> &'c [Candle] {
        let size = match self.config.window_type {
            WindowType::Expanding => i.min(self.config.max_window),
            WindowType::Rolling => self.config.max_window.min(i),
            WindowType::Fixed => self.config.min_window.min(i),
        };
        &candles[i - size..i]
    }
}
