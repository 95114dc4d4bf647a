//! Signal sources consumed by the backtest driver.

use std::collections::HashMap;

use market_core::indicators;
use market_core::{Candle, Direction, Signal};
use serde::Serialize;

/// Turns a lookback window into a trading signal.
///
/// Implementations must not panic on odd input; anything that cannot be
/// evaluated is reported as `None`. The window passed in is read-only and is
/// shared across worker threads during parallel evaluation. Partial exits
/// fill targets in `Signal::targets` order, which `Signal::new` keeps
/// nearest-first.
#[cfg_attr(test, mockall::automock)]
pub trait SignalSource: Send + Sync {
    /// Whether this source knows the strategy identifier.
    fn supports(&self, strategy: &str) -> bool;

    /// Produce a signal for the bar following `window`, if any.
    fn generate_signal(&self, window: &[Candle], strategy: &str) -> Option<Signal>;
}

/// ATR multiples that place the stop and the three targets.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StrategyMultipliers {
    pub stop: f64,
    pub target1: f64,
    pub target2: f64,
    pub target3: f64,
    /// Timeframe label attached to emitted signals.
    pub timeframe: &'static str,
}

impl StrategyMultipliers {
    pub const fn new(stop: f64, target1: f64, target2: f64, target3: f64, timeframe: &'static str) -> Self {
        Self {
            stop,
            target1,
            target2,
            target3,
            timeframe,
        }
    }

    /// Built-in table keyed by strategy name.
    pub fn defaults() -> HashMap<String, StrategyMultipliers> {
        [
            ("breakout_master", Self::new(1.0, 4.0, 6.0, 10.0, "15m")),
            ("trend_rider", Self::new(0.5, 3.0, 4.5, 7.5, "4h")),
            ("range_master", Self::new(0.5, 2.0, 3.0, 5.0, "1h")),
            ("momentum_beast", Self::new(1.0, 3.5, 6.0, 9.0, "15m")),
            ("scalper_pro", Self::new(0.5, 1.2, 2.3, 3.5, "5m")),
        ]
        .into_iter()
        .map(|(name, m)| (name.to_string(), m))
        .collect()
    }
}

/// Exit weights attached to every target set, in percent.
const TARGET_WEIGHTS: [u32; 3] = [30, 30, 40];

/// Confluence breakout detector with ATR-scaled stops and targets.
///
/// A long fires when at least `min_score` of these hold on the last bar:
/// close above the prior 20-bar high, volume above 1.1x the 20-bar average,
/// close above EMA-50, RSI-14 in (40, 90), and a contracting 5-bar range.
/// Shorts mirror the price conditions with RSI-14 in (10, 60).
#[derive(Debug, Clone)]
pub struct AtrSignalSource {
    multipliers: HashMap<String, StrategyMultipliers>,
    min_history: usize,
    min_score: u32,
}

impl Default for AtrSignalSource {
    fn default() -> Self {
        Self::new(StrategyMultipliers::defaults())
    }
}

impl AtrSignalSource {
    const LOOKBACK: usize = 20;
    const ATR_PERIOD: usize = 14;
    const EMA_PERIOD: usize = 50;
    const RSI_PERIOD: usize = 14;

    pub fn new(multipliers: HashMap<String, StrategyMultipliers>) -> Self {
        Self {
            multipliers,
            min_history: 100,
            min_score: 4,
        }
    }

    /// Minimum window length before any signal is considered.
    pub fn with_min_history(mut self, min_history: usize) -> Self {
        self.min_history = min_history.max(Self::LOOKBACK + 1);
        self
    }

    pub fn with_min_score(mut self, min_score: u32) -> Self {
        self.min_score = min_score;
        self
    }

    /// Known strategy names, sorted.
    pub fn strategies(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.multipliers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    fn direction(&self, window: &[Candle], atr: f64) -> Direction {
        let idx = window.len() - 1;
        let current = &window[idx];
        let prior = &window[idx - Self::LOOKBACK..idx];

        let recent_high = prior.iter().map(|c| c.high).fold(f64::MIN, f64::max);
        let recent_low = prior.iter().map(|c| c.low).fold(f64::MAX, f64::min);
        let volume_surge = current.volume > indicators::average_volume(prior) * 1.1;

        let ema = indicators::ema(window, Self::EMA_PERIOD);
        let rsi = indicators::rsi(window, Self::RSI_PERIOD);

        let last_five = &window[window.len() - 5..];
        let recent_range = last_five.iter().map(Candle::range).sum::<f64>() / 5.0;
        let consolidating = recent_range < atr * 0.8;

        let score = |conditions: [bool; 5]| conditions.iter().filter(|&&c| c).count() as u32;

        let buy = score([
            current.close > recent_high,
            volume_surge,
            current.close > ema,
            rsi > 40.0 && rsi < 90.0,
            consolidating,
        ]);
        if buy >= self.min_score {
            return Direction::Buy;
        }

        let sell = score([
            current.close < recent_low,
            volume_surge,
            current.close < ema,
            rsi > 10.0 && rsi < 60.0,
            consolidating,
        ]);
        if sell >= self.min_score {
            return Direction::Sell;
        }

        Direction::None
    }
}

impl SignalSource for AtrSignalSource {
    fn supports(&self, strategy: &str) -> bool {
        self.multipliers.contains_key(strategy)
    }

    fn generate_signal(&self, window: &[Candle], strategy: &str) -> Option<Signal> {
        let multipliers = self.multipliers.get(strategy)?;
        if window.len() < self.min_history || window.len() <= Self::LOOKBACK {
            return None;
        }

        let atr = indicators::atr(window, Self::ATR_PERIOD);
        if atr <= 0.0 {
            return None;
        }

        let direction = self.direction(window, atr);
        let sign = direction.sign();
        if sign == 0.0 {
            return None;
        }

        let entry = window[window.len() - 1].close;
        let targets = [multipliers.target1, multipliers.target2, multipliers.target3]
            .iter()
            .zip(TARGET_WEIGHTS)
            .map(|(&m, weight)| (entry + sign * atr * m, weight))
            .collect::<Vec<_>>();

        let mut signal = Signal::new(direction, entry, entry - sign * atr * multipliers.stop, &targets)
            .with_strategy(strategy);
        signal.timeframe = Some(multipliers.timeframe.to_string());
        Some(signal)
    }
}
