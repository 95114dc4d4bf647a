//! Per-run trade gate: daily trade cap and consecutive-loss breaker.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Reason the gate refuses a new trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TripReason {
    /// Daily trade count reached.
    DailyTradeCap,
    /// Too many consecutive losses. Sticky for the rest of the run.
    ConsecutiveLosses,
}

/// Gate thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeGateConfig {
    /// Maximum trades opened per UTC day.
    pub max_trades_per_day: u32,
    /// Consecutive losses before trading stops. Zero disables the breaker.
    pub max_consecutive_losses: u32,
}

impl Default for TradeGateConfig {
    fn default() -> Self {
        Self {
            max_trades_per_day: 20,
            max_consecutive_losses: 0,
        }
    }
}

/// Counters carried across one backtest walk.
#[derive(Debug, Clone, Default)]
pub struct TradeGate {
    config: TradeGateConfig,
    current_day: Option<NaiveDate>,
    trades_today: u32,
    consecutive_losses: u32,
}

impl TradeGate {
    pub fn new(config: TradeGateConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// Move to the day of the current bar, resetting the daily counter on change.
    pub fn roll_day(&mut self, day: Option<NaiveDate>) {
        if day != self.current_day {
            self.current_day = day;
            self.trades_today = 0;
        }
    }

    /// Why a new trade is refused, if it is.
    pub fn check(&self) -> Option<TripReason> {
        if self.trades_today >= self.config.max_trades_per_day {
            return Some(TripReason::DailyTradeCap);
        }
        if self.config.max_consecutive_losses > 0
            && self.consecutive_losses >= self.config.max_consecutive_losses
        {
            return Some(TripReason::ConsecutiveLosses);
        }
        None
    }

    pub fn can_trade(&self) -> bool {
        self.check().is_none()
    }

    /// Record a completed trade.
    pub fn record_trade(&mut self, is_win: bool) {
        self.trades_today += 1;
        if is_win {
            self.consecutive_losses = 0;
        } else {
            self.consecutive_losses += 1;
            if self.config.max_consecutive_losses > 0
                && self.consecutive_losses == self.config.max_consecutive_losses
            {
                debug!(
                    consecutive_losses = self.consecutive_losses,
                    "Consecutive loss limit reached"
                );
            }
        }
    }

    pub fn trades_today(&self) -> u32 {
        self.trades_today
    }

    pub fn consecutive_losses(&self) -> u32 {
        self.consecutive_losses
    }
}
