//! OHLCV candle type.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A single OHLCV bar. Timestamps are epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    pub fn new(timestamp: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// A bar with no movement at all.
    pub fn flat(timestamp: i64, price: f64) -> Self {
        Self::new(timestamp, price, price, price, price, 0.0)
    }

    /// Bar open time in UTC, if the timestamp is representable.
    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.timestamp)
    }

    /// UTC calendar day of the bar, used for daily trade counters.
    pub fn day(&self) -> Option<NaiveDate> {
        self.datetime().map(|dt| dt.date_naive())
    }

    /// Midpoint of the bar's range.
    pub fn mid(&self) -> f64 {
        (self.high + self.low) / 2.0
    }

    /// High minus low.
    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    /// Apply a uniform multiplicative shift to all prices. Volume is unchanged.
    pub fn scaled(&self, multiplier: f64) -> Self {
        Self {
            open: self.open * multiplier,
            high: self.high * multiplier,
            low: self.low * multiplier,
            close: self.close * multiplier,
            ..*self
        }
    }
}

/// Check that a series is ordered by ascending timestamp.
pub fn is_ascending(candles: &[Candle]) -> bool {
    candles.windows(2).all(|w| w[0].timestamp <= w[1].timestamp)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candle_scaled_keeps_volume() {
        let candle = Candle::new(0, 100.0, 110.0, 90.0, 105.0, 42.0);
        let crashed = candle.scaled(0.7);

        assert!((crashed.open - 70.0).abs() < 1e-9);
        assert!((crashed.high - 77.0).abs() < 1e-9);
        assert!((crashed.low - 63.0).abs() < 1e-9);
        assert!((crashed.close - 73.5).abs() < 1e-9);
        assert_eq!(crashed.volume, 42.0);
        assert_eq!(crashed.timestamp, 0);
    }

    #[test]
    fn test_candle_day_is_utc() {
        // 2024-01-01T23:59:59.999Z and the next millisecond
        let late = Candle::flat(1_704_153_599_999, 1.0);
        let next = Candle::flat(1_704_153_600_000, 1.0);

        assert_eq!(late.day(), NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(next.day(), NaiveDate::from_ymd_opt(2024, 1, 2));
    }

    #[test]
    fn test_is_ascending() {
        let candles = vec![Candle::flat(1, 1.0), Candle::flat(2, 1.0), Candle::flat(2, 1.0)];
        assert!(is_ascending(&candles));

        let unordered = vec![Candle::flat(2, 1.0), Candle::flat(1, 1.0)];
        assert!(!is_ascending(&unordered));
    }
}
