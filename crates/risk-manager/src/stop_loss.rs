//! Stop state for a single simulated position.

use market_core::{Candle, Direction};
use serde::{Deserialize, Serialize};

/// Fixed protective stop that can be moved to breakeven once.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProtectiveStop {
    pub direction: Direction,
    pub price: f64,
    pub at_breakeven: bool,
}

impl ProtectiveStop {
    pub fn new(direction: Direction, price: f64) -> Self {
        Self {
            direction,
            price,
            at_breakeven: false,
        }
    }

    /// Whether the bar's range reaches the stop (low for longs, high for shorts).
    pub fn is_hit(&self, candle: &Candle) -> bool {
        match self.direction {
            Direction::Buy => candle.low <= self.price,
            Direction::Sell => candle.high >= self.price,
            Direction::None => false,
        }
    }

    /// Move the stop to the entry price. Later calls are no-ops.
    pub fn move_to_breakeven(&mut self, entry: f64) {
        if !self.at_breakeven {
            self.price = entry;
            self.at_breakeven = true;
        }
    }
}

/// Profit-locking trailing stop.
///
/// Arms once the best favourable excursion reaches `arm_at_r` multiples of the
/// risk distance, then sits at `lock_fraction` of that excursion from entry.
/// The level only ever moves in the position's favour.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrailingStop {
    pub direction: Direction,
    pub entry: f64,
    pub risk_distance: f64,
    pub arm_at_r: f64,
    pub lock_fraction: f64,
    /// Highest high (long) or lowest low (short) seen so far.
    pub extreme: f64,
    /// Current trailing level, once armed.
    pub level: Option<f64>,
}

impl TrailingStop {
    pub const DEFAULT_ARM_AT_R: f64 = 1.0;
    pub const DEFAULT_LOCK_FRACTION: f64 = 0.6;

    pub fn new(direction: Direction, entry: f64, risk_distance: f64) -> Self {
        Self {
            direction,
            entry,
            risk_distance,
            arm_at_r: Self::DEFAULT_ARM_AT_R,
            lock_fraction: Self::DEFAULT_LOCK_FRACTION,
            extreme: entry,
            level: None,
        }
    }

    /// Favourable excursion of the extreme, in price units.
    fn excursion(&self) -> f64 {
        (self.extreme - self.entry) * self.direction.sign()
    }

    /// Track the bar's favourable extreme.
    pub fn observe(&mut self, candle: &Candle) {
        match self.direction {
            Direction::Buy => self.extreme = self.extreme.max(candle.high),
            Direction::Sell => self.extreme = self.extreme.min(candle.low),
            Direction::None => {}
        }
    }

    /// Arm or ratchet the level from the current extreme.
    pub fn update(&mut self) {
        if self.risk_distance <= 0.0 {
            return;
        }

        let excursion = self.excursion();
        if self.level.is_none() && excursion / self.risk_distance < self.arm_at_r {
            return;
        }

        let candidate = self.entry + excursion * self.lock_fraction * self.direction.sign();
        self.level = Some(match (self.level, self.direction) {
            (Some(level), Direction::Buy) => level.max(candidate),
            (Some(level), Direction::Sell) => level.min(candidate),
            _ => candidate,
        });
    }

    /// The trailing level, if armed and breached by the bar.
    pub fn breached(&self, candle: &Candle) -> Option<f64> {
        let level = self.level?;
        let hit = match self.direction {
            Direction::Buy => candle.low <= level,
            Direction::Sell => candle.high >= level,
            Direction::None => false,
        };
        hit.then_some(level)
    }

    pub fn is_armed(&self) -> bool {
        self.level.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(high: f64, low: f64) -> Candle {
        Candle::new(0, low, high, low, high, 1.0)
    }

    #[test]
    fn test_protective_stop_hit() {
        let long = ProtectiveStop::new(Direction::Buy, 99.0);
        assert!(long.is_hit(&bar(101.0, 98.5)));
        assert!(!long.is_hit(&bar(101.0, 99.5)));

        let short = ProtectiveStop::new(Direction::Sell, 101.0);
        assert!(short.is_hit(&bar(101.0, 99.0)));
        assert!(!short.is_hit(&bar(100.5, 99.0)));
    }

    #[test]
    fn test_breakeven_moves_once() {
        let mut stop = ProtectiveStop::new(Direction::Buy, 99.0);
        stop.move_to_breakeven(100.15);
        assert_eq!(stop.price, 100.15);
        assert!(stop.at_breakeven);

        stop.move_to_breakeven(105.0);
        assert_eq!(stop.price, 100.15);
    }

    #[test]
    fn test_trailing_arms_at_one_r() {
        let mut trail = TrailingStop::new(Direction::Buy, 100.0, 1.0);

        trail.observe(&bar(100.8, 100.1));
        trail.update();
        assert!(!trail.is_armed());

        trail.observe(&bar(102.0, 101.5));
        trail.update();
        // 100 + 2.0 * 0.6
        let level = trail.level.unwrap();
        assert!((level - 101.2).abs() < 1e-9);
        assert_eq!(trail.breached(&bar(102.0, 101.5)), None);
        assert_eq!(trail.breached(&bar(101.5, 101.0)), Some(level));
    }

    #[test]
    fn test_trailing_only_ratchets_forward() {
        let mut trail = TrailingStop::new(Direction::Sell, 100.0, 1.0);

        trail.observe(&bar(99.0, 97.0));
        trail.update();
        let first = trail.level.unwrap();
        assert!((first - 98.2).abs() < 1e-9);

        // a pullback never loosens the level
        trail.observe(&bar(99.5, 98.0));
        trail.update();
        assert_eq!(trail.level, Some(first));

        trail.observe(&bar(96.0, 95.0));
        trail.update();
        assert!((trail.level.unwrap() - 97.0).abs() < 1e-9);
    }
}
