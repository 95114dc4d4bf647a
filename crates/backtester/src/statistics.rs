//! Summary and risk-adjusted metrics derived from a finished ledger.

use std::collections::BTreeMap;

use market_core::{Trade, WindowType};

use crate::result::{BacktestResult, TradeLedger};

/// Trading periods per year used to annualize per-trade ratios.
const ANNUALIZATION_PERIODS: f64 = 252.0;

/// Calmar annualization: returns are treated as covering a 30-day run.
const CALMAR_DAYS_FACTOR: f64 = 365.0 / 30.0;

/// Run metadata carried into the result.
#[derive(Debug, Clone, Default)]
pub struct RunInfo {
    pub strategy_name: String,
    pub window_type: WindowType,
    /// Hours per candle, for average holding time.
    pub interval_hours: f64,
}

/// Build the final result from a ledger.
pub fn aggregate(ledger: TradeLedger, info: RunInfo) -> BacktestResult {
    let start_balance = ledger.start_balance();
    let final_balance = ledger.balance();
    let peak_balance = ledger.peak_balance();
    // converted from fraction to percent here and nowhere else
    let max_drawdown = ledger.max_drawdown_fraction() * 100.0;
    let (trades, exit_reasons) = ledger.into_parts();

    let total_trades = trades.len();
    let winning_trades = trades.iter().filter(|t| t.is_win()).count();
    let losing_trades = total_trades - winning_trades;

    let total_profit: f64 = trades.iter().filter(|t| t.is_win()).map(|t| t.profit).sum();
    let total_loss: f64 = trades
        .iter()
        .filter(|t| !t.is_win())
        .map(|t| t.profit.abs())
        .sum();
    let net_profit = total_profit - total_loss;

    let win_rate = ratio(winning_trades as f64, total_trades as f64) * 100.0;
    let return_percent = ratio(net_profit, start_balance) * 100.0;
    let profit_factor = ratio(total_profit, total_loss);
    let average_rr = ratio(trades.iter().map(|t| t.rr).sum(), total_trades as f64);

    let average_win = ratio(total_profit, winning_trades as f64);
    let average_loss = ratio(total_loss, losing_trades as f64);
    let largest_win = trades.iter().map(|t| t.profit).filter(|&p| p > 0.0).fold(0.0, f64::max);
    let largest_loss = trades.iter().map(|t| t.profit).filter(|&p| p <= 0.0).fold(0.0, f64::min);

    let expectancy_per_trade = if total_trades > 0 {
        let n = total_trades as f64;
        (winning_trades as f64 / n) * average_win - (losing_trades as f64 / n) * average_loss
    } else {
        0.0
    };

    let (win_streak_max, loss_streak_max) = streaks(&trades);

    let returns: Vec<f64> = trades
        .iter()
        .map(|t| ratio(t.profit, start_balance) * 100.0)
        .collect();
    let sharpe_ratio = sharpe_ratio(&returns);
    let sortino_ratio = sortino_ratio(&returns);

    let (calmar_ratio, recovery_factor) = if max_drawdown > 0.0 {
        (
            return_percent * CALMAR_DAYS_FACTOR / max_drawdown,
            net_profit / (start_balance * max_drawdown / 100.0),
        )
    } else {
        (0.0, 0.0)
    };

    let avg_trade_hours = ratio(
        trades.iter().map(|t| t.candles_held as f64).sum::<f64>() * info.interval_hours,
        total_trades as f64,
    );
    let (best_trading_hour, worst_trading_hour) = hourly_extremes(&trades);

    BacktestResult {
        total_trades,
        winning_trades,
        losing_trades,
        win_rate,
        total_profit,
        total_loss,
        net_profit,
        return_percent,
        profit_factor,
        average_rr,
        max_drawdown,
        start_balance,
        final_balance,
        peak_balance,
        sharpe_ratio,
        sortino_ratio,
        calmar_ratio,
        recovery_factor,
        max_consecutive_losses: loss_streak_max,
        win_streak_max,
        loss_streak_max,
        average_win,
        average_loss,
        largest_win,
        largest_loss,
        expectancy_per_trade,
        avg_trade_hours,
        best_trading_hour,
        worst_trading_hour,
        trades,
        exit_reasons,
        strategy_name: info.strategy_name,
        window_type: info.window_type,
        ..Default::default()
    }
}

/// Selection score used to rank strategy runs.
pub fn strategy_score(result: &BacktestResult) -> f64 {
    result.win_rate * 0.3 + result.return_percent * 0.3 + result.profit_factor * 20.0
        - result.max_drawdown * 50.0
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation around `center`.
pub fn std_dev_around(values: &[f64], center: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let variance = values.iter().map(|v| (v - center).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Annualized Sharpe of per-trade returns. Needs at least two trades.
pub fn sharpe_ratio(returns: &[f64]) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }
    let mean = mean(returns);
    let std_dev = std_dev_around(returns, mean);
    if std_dev > 0.0 {
        mean / std_dev * ANNUALIZATION_PERIODS.sqrt()
    } else {
        0.0
    }
}

/// Annualized Sortino of per-trade returns.
///
/// Downside deviation squares each losing return against zero and divides by
/// the total trade count, not the number of losers.
pub fn sortino_ratio(returns: &[f64]) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }
    let downside: f64 = returns.iter().filter(|&&r| r <= 0.0).map(|r| r * r).sum();
    let downside_dev = (downside / returns.len() as f64).sqrt();
    if downside_dev > 0.0 {
        mean(returns) / downside_dev * ANNUALIZATION_PERIODS.sqrt()
    } else {
        0.0
    }
}

/// Entry hours with the highest and lowest summed profit. Ties go to the
/// earlier hour.
pub fn hourly_extremes(trades: &[Trade]) -> (Option<u32>, Option<u32>) {
    let mut by_hour: BTreeMap<u32, f64> = BTreeMap::new();
    for trade in trades {
        if let Some(hour) = trade.entry_hour() {
            *by_hour.entry(hour).or_default() += trade.profit;
        }
    }

    let mut best: Option<(u32, f64)> = None;
    let mut worst: Option<(u32, f64)> = None;
    for (&hour, &profit) in &by_hour {
        if best.map_or(true, |(_, top)| profit > top) {
            best = Some((hour, profit));
        }
        if worst.map_or(true, |(_, bottom)| profit < bottom) {
            worst = Some((hour, profit));
        }
    }

    (best.map(|(h, _)| h), worst.map(|(h, _)| h))
}

/// Longest winning and losing runs.
pub fn streaks(trades: &[Trade]) -> (usize, usize) {
    let mut max_wins = 0;
    let mut max_losses = 0;
    let mut wins = 0;
    let mut losses = 0;

    for trade in trades {
        if trade.is_win() {
            wins += 1;
            losses = 0;
            max_wins = max_wins.max(wins);
        } else {
            losses += 1;
            wins = 0;
            max_losses = max_losses.max(losses);
        }
    }

    (max_wins, max_losses)
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}
