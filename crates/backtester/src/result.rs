//! Backtest results and the running ledger they are built from.

use std::collections::BTreeMap;

use market_core::{ExitReason, Trade, WindowType};
use serde::{Deserialize, Serialize};

use crate::monte_carlo::MonteCarloResult;
use crate::stress_test::StressTestResult;
use crate::walk_forward::WalkForwardAnalysis;

/// Trades and balance path accumulated during a walk.
///
/// Drawdown is tracked as a fraction of the starting balance; the statistics
/// aggregator converts it to percent when the result is built.
#[derive(Debug, Clone)]
pub struct TradeLedger {
    start_balance: f64,
    balance: f64,
    peak_balance: f64,
    max_drawdown: f64,
    trades: Vec<Trade>,
    exit_reasons: BTreeMap<ExitReason, usize>,
}

impl TradeLedger {
    pub fn new(start_balance: f64) -> Self {
        Self {
            start_balance,
            balance: start_balance,
            peak_balance: start_balance,
            max_drawdown: 0.0,
            trades: Vec::new(),
            exit_reasons: BTreeMap::new(),
        }
    }

    /// Append a trade, stamping its `balance_after`.
    pub fn record(&mut self, mut trade: Trade) -> &Trade {
        self.balance += trade.profit;
        trade.balance_after = self.balance;

        if self.balance > self.peak_balance {
            self.peak_balance = self.balance;
        }
        if self.start_balance > 0.0 {
            let drawdown = (self.peak_balance - self.balance) / self.start_balance;
            if drawdown > self.max_drawdown {
                self.max_drawdown = drawdown;
            }
        }

        *self.exit_reasons.entry(trade.exit_reason).or_insert(0) += 1;
        self.trades.push(trade);
        &self.trades[self.trades.len() - 1]
    }

    pub fn start_balance(&self) -> f64 {
        self.start_balance
    }

    pub fn balance(&self) -> f64 {
        self.balance
    }

    pub fn peak_balance(&self) -> f64 {
        self.peak_balance
    }

    /// Largest (peak - balance) / start seen so far, as a fraction.
    pub fn max_drawdown_fraction(&self) -> f64 {
        self.max_drawdown
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn exit_reasons(&self) -> &BTreeMap<ExitReason, usize> {
        &self.exit_reasons
    }

    pub(crate) fn into_parts(self) -> (Vec<Trade>, BTreeMap<ExitReason, usize>) {
        (self.trades, self.exit_reasons)
    }
}

/// Outcome of a backtest run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    pub total_trades: usize,
    pub winning_trades: usize,
    /// Trades with zero or negative profit.
    pub losing_trades: usize,
    /// Percent of trades with positive profit.
    pub win_rate: f64,
    pub total_profit: f64,
    /// Sum of absolute losses.
    pub total_loss: f64,
    pub net_profit: f64,
    pub return_percent: f64,
    /// Total profit over total loss; 0 when nothing was lost.
    pub profit_factor: f64,
    pub average_rr: f64,
    /// Percent of the starting balance.
    pub max_drawdown: f64,
    pub start_balance: f64,
    pub final_balance: f64,
    pub peak_balance: f64,

    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub calmar_ratio: f64,
    pub recovery_factor: f64,
    pub max_consecutive_losses: usize,
    pub win_streak_max: usize,
    pub loss_streak_max: usize,
    pub average_win: f64,
    /// Mean absolute loss.
    pub average_loss: f64,
    pub largest_win: f64,
    /// Most negative trade profit.
    pub largest_loss: f64,
    pub expectancy_per_trade: f64,
    pub avg_trade_hours: f64,
    /// UTC entry hour with the highest summed profit.
    pub best_trading_hour: Option<u32>,
    /// UTC entry hour with the lowest summed profit.
    pub worst_trading_hour: Option<u32>,

    pub trades: Vec<Trade>,
    pub exit_reasons: BTreeMap<ExitReason, usize>,

    pub strategy_name: String,
    pub window_type: WindowType,
    /// Wall-clock time of the run.
    pub duration: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monte_carlo: Option<MonteCarloResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub walk_forward: Option<WalkForwardAnalysis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stress_test: Option<StressTestResult>,
}

impl BacktestResult {
    pub fn is_profitable(&self) -> bool {
        self.final_balance > self.start_balance
    }

    /// Count of trades closed for `reason`.
    pub fn exits_by(&self, reason: ExitReason) -> usize {
        self.exit_reasons.get(&reason).copied().unwrap_or(0)
    }

    /// Per-trade profit as a percent of the starting balance.
    pub fn trade_returns(&self) -> Vec<f64> {
        if self.start_balance <= 0.0 {
            return Vec::new();
        }
        self.trades
            .iter()
            .map(|t| t.profit / self.start_balance * 100.0)
            .collect()
    }
}
