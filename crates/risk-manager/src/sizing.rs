//! Fixed-fractional position sizing.

use market_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Sizing parameters for a run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionSizer {
    /// Fraction of the starting balance risked per trade.
    pub risk_percent: f64,
    /// Absolute cap on the risk amount.
    pub max_risk_amount: f64,
    /// Position notional may not exceed this multiple of the risk amount.
    pub max_notional_multiple: f64,
}

/// Result of sizing one trade.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionSize {
    /// Currency at risk between entry and stop.
    pub risk_amount: f64,
    /// Units bought or sold.
    pub quantity: f64,
}

impl PositionSizer {
    pub fn new(risk_percent: f64, max_risk_amount: f64, max_notional_multiple: f64) -> Self {
        Self {
            risk_percent,
            max_risk_amount,
            max_notional_multiple,
        }
    }

    /// Amount risked per trade. Always based on the starting balance, so
    /// position size never compounds with the running balance.
    pub fn risk_amount(&self, start_balance: f64) -> f64 {
        (start_balance * self.risk_percent).min(self.max_risk_amount)
    }

    /// Size a position from the un-slipped entry and stop prices.
    pub fn size(&self, start_balance: f64, entry: f64, stop_loss: f64) -> Result<PositionSize> {
        let distance = (entry - stop_loss).abs();
        if distance <= f64::EPSILON {
            return Err(Error::ZeroRiskDistance { entry, stop_loss });
        }

        let risk_amount = self.risk_amount(start_balance);
        let mut quantity = risk_amount / distance;

        let max_notional = risk_amount * self.max_notional_multiple;
        if entry > 0.0 && quantity * entry > max_notional {
            quantity = max_notional / entry;
        }

        Ok(PositionSize {
            risk_amount,
            quantity,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_amount_uses_cap() {
        let sizer = PositionSizer::new(0.01, 50.0, 10.0);
        assert_eq!(sizer.risk_amount(10_000.0), 50.0);

        let uncapped = PositionSizer::new(0.01, 100_000.0, 10.0);
        assert_eq!(uncapped.risk_amount(10_000.0), 100.0);
    }

    #[test]
    fn test_notional_cap() {
        // 100 risk over a 1.0 distance would be 100 units = 10_000 notional
        let sizer = PositionSizer::new(0.01, 100_000.0, 10.0);
        let size = sizer.size(10_000.0, 100.0, 99.0).unwrap();

        assert_eq!(size.risk_amount, 100.0);
        assert!((size.quantity - 10.0).abs() < 1e-9);
        assert!(size.quantity * 100.0 <= 10.0 * size.risk_amount + 1e-9);
    }

    #[test]
    fn test_wide_stop_not_capped() {
        let sizer = PositionSizer::new(0.01, 100_000.0, 10.0);
        let size = sizer.size(10_000.0, 100.0, 80.0).unwrap();

        // 100 / 20 = 5 units, 500 notional is under the 1000 cap
        assert!((size.quantity - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_distance_rejected() {
        let sizer = PositionSizer::new(0.01, 100_000.0, 10.0);
        let err = sizer.size(10_000.0, 100.0, 100.0).unwrap_err();
        assert!(matches!(err, Error::ZeroRiskDistance { .. }));
    }
}
