//! Entry filters applied to each bar before a signal is requested.

use chrono::{Datelike, Timelike, Weekday};
use market_core::indicators;
use market_core::{Candle, TradingHours};
use serde::{Deserialize, Serialize};

/// ATR lookback used by the volatility filter.
pub const VOLATILITY_ATR_PERIOD: usize = 14;

/// Session filter on bar open time (UTC).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HoursFilter {
    pub hours: TradingHours,
}

impl HoursFilter {
    pub fn new(hours: TradingHours) -> Self {
        Self { hours }
    }

    /// Whether a bar opening at `timestamp` (epoch ms) may trade.
    ///
    /// The band is exclusive on both ends: with the default 8..20 session,
    /// bars at 08:xx and 20:xx are rejected.
    pub fn allows(&self, timestamp: i64) -> bool {
        let Some(dt) = chrono::DateTime::from_timestamp_millis(timestamp) else {
            return false;
        };

        if self.hours.weekdays_only && matches!(dt.weekday(), Weekday::Sat | Weekday::Sun) {
            return false;
        }

        let hour = dt.hour();
        hour > self.hours.open_hour && hour < self.hours.close_hour
    }
}

/// Rejects bars whose recent ATR, as a percent of price, is outside a band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolatilityFilter {
    /// Lower bound in percent. Zero disables.
    pub min_percent: f64,
    /// Upper bound in percent. Zero disables.
    pub max_percent: f64,
}

impl VolatilityFilter {
    pub fn new(min_percent: f64, max_percent: f64) -> Self {
        Self {
            min_percent,
            max_percent,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.min_percent > 0.0 || self.max_percent > 0.0
    }

    /// Check the lookback `window` against the current bar.
    pub fn allows(&self, window: &[Candle], bar: &Candle) -> bool {
        if !self.is_enabled() {
            return true;
        }

        let volatility = indicators::volatility_percent(window, bar, VOLATILITY_ATR_PERIOD);
        if self.min_percent > 0.0 && volatility < self.min_percent {
            return false;
        }
        if self.max_percent > 0.0 && volatility > self.max_percent {
            return false;
        }
        true
    }
}
