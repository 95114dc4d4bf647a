//! Completed simulated trades.

use chrono::{DateTime, Timelike};
use serde::{Deserialize, Serialize};

use super::signal::Direction;

/// Why a simulated trade closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ExitReason {
    #[serde(rename = "Stop Loss")]
    StopLoss,
    #[serde(rename = "Target 1")]
    Target1,
    #[serde(rename = "Target 2")]
    Target2,
    #[serde(rename = "Target 3")]
    Target3,
    #[serde(rename = "Trailing Stop")]
    TrailingStop,
    #[serde(rename = "Timeout")]
    Timeout,
}

impl ExitReason {
    /// Exit reason for the target at a zero-based position. Targets beyond the
    /// third report as `Target3`.
    pub fn for_target(index: usize) -> Self {
        match index {
            0 => ExitReason::Target1,
            1 => ExitReason::Target2,
            _ => ExitReason::Target3,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ExitReason::StopLoss => "Stop Loss",
            ExitReason::Target1 => "Target 1",
            ExitReason::Target2 => "Target 2",
            ExitReason::Target3 => "Target 3",
            ExitReason::TrailingStop => "Trailing Stop",
            ExitReason::Timeout => "Timeout",
        }
    }

    pub fn is_target(&self) -> bool {
        matches!(
            self,
            ExitReason::Target1 | ExitReason::Target2 | ExitReason::Target3
        )
    }
}

impl std::fmt::Display for ExitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A completed simulated trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub direction: Direction,
    /// Entry price after slippage.
    pub entry: f64,
    pub exit: f64,
    /// Stop level in force when the trade closed.
    pub stop_loss: f64,
    pub exit_reason: ExitReason,
    pub candles_held: usize,
    /// Realized profit net of fees.
    pub profit: f64,
    /// Profit relative to the amount risked, in percent.
    pub profit_percent: f64,
    /// Realized move over the original risk distance.
    pub rr: f64,
    pub balance_after: f64,
    /// Index of the originating candle in the walked series.
    pub entry_index: usize,
    /// Open time of the originating candle, epoch milliseconds.
    #[serde(default)]
    pub entry_time: i64,
}

impl Trade {
    pub fn is_win(&self) -> bool {
        self.profit > 0.0
    }

    /// UTC hour of day the trade was entered.
    pub fn entry_hour(&self) -> Option<u32> {
        DateTime::from_timestamp_millis(self.entry_time).map(|dt| dt.hour())
    }
}
