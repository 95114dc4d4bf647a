//! Single-trade execution against a forward price path.
//!
//! Every bar is resolved in a fixed order: the protective stop first (worst
//! case when a bar spans both stop and target), then the trailing stop, then
//! targets. The trailing level is raised only after a bar's exit checks, so
//! one bar never both arms the trail and breaches it. The simulator never
//! looks past the forward slice it is given.

use market_core::indicators;
use market_core::{BacktestConfig, Candle, Direction, ExitReason, Result, Signal, Trade};
use risk_manager::{PositionSizer, ProtectiveStop, TrailingStop};
use serde::{Deserialize, Serialize};

/// Risk and cost parameters for simulated trades.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationParams {
    /// Balance the position is sized from.
    pub start_balance: f64,
    pub sizer: PositionSizer,
    /// Entry slippage as a fraction of price.
    pub slippage_percent: f64,
    /// Fee per side as a fraction of each slice's realized profit.
    pub fee_percent: f64,
    /// Scale slippage by the forward path's mean absolute change.
    pub realistic_slippage: bool,
    /// Scale out at each target instead of exiting at the final one.
    pub partial_exits: bool,
    /// Fallback exit weights in percent for signals without their own.
    pub partial_weights: Vec<u32>,
}

impl SimulationParams {
    pub fn from_config(config: &BacktestConfig) -> Self {
        Self {
            start_balance: config.start_balance,
            sizer: PositionSizer::new(
                config.risk_percent,
                config.max_position_cap,
                config.max_position_multiple,
            ),
            slippage_percent: config.slippage_percent,
            fee_percent: config.fee_percent,
            realistic_slippage: config.realistic_slippage,
            partial_exits: config.enable_partial_exits,
            partial_weights: config.partial_weights.clone(),
        }
    }
}

/// An open simulated position.
#[derive(Debug, Clone, Copy)]
struct Position {
    direction: Direction,
    /// Entry after slippage.
    entry: f64,
    quantity: f64,
    risk_amount: f64,
    /// Signal entry to signal stop.
    risk_distance: f64,
}

impl Position {
    fn reached(&self, candle: &Candle, price: f64) -> bool {
        match self.direction {
            Direction::Buy => candle.high >= price,
            Direction::Sell => candle.low <= price,
            Direction::None => false,
        }
    }
}

/// Resolves signals into trades.
#[derive(Debug, Clone)]
pub struct TradeSimulator {
    params: SimulationParams,
}

impl TradeSimulator {
    pub fn new(params: SimulationParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &SimulationParams {
        &self.params
    }

    /// Simulate one signal over `forward`.
    ///
    /// Returns `Ok(None)` when the signal is not actionable, the slice is
    /// empty, or (without partial exits) nothing resolves within the slice.
    /// The returned trade has `balance_after`, `entry_index` and `entry_time` unset; the
    /// caller owns the running balance.
    pub fn simulate(&self, signal: &Signal, forward: &[Candle]) -> Result<Option<Trade>> {
        if !signal.is_actionable() || forward.is_empty() {
            return Ok(None);
        }

        let size = self
            .params
            .sizer
            .size(self.params.start_balance, signal.entry, signal.stop_loss)?;

        let position = Position {
            direction: signal.direction,
            entry: self.slipped_entry(signal, forward),
            quantity: size.quantity,
            risk_amount: size.risk_amount,
            risk_distance: signal.risk_distance(),
        };

        if self.params.partial_exits {
            Ok(Some(self.simulate_partial(signal, forward, &position)))
        } else {
            Ok(self.simulate_single(signal, forward, &position))
        }
    }

    fn slipped_entry(&self, signal: &Signal, forward: &[Candle]) -> f64 {
        let mut slippage = self.params.slippage_percent;
        if self.params.realistic_slippage {
            slippage *= 1.0 + indicators::mean_abs_change(forward);
        }
        signal.entry * (1.0 + signal.direction.sign() * slippage)
    }

    /// Profit of closing `quantity` at `exit`, net of round-trip fees.
    fn realize(&self, position: &Position, exit: f64, quantity: f64) -> f64 {
        let gross = (exit - position.entry) * position.direction.sign() * quantity;
        gross - gross.abs() * self.params.fee_percent * 2.0
    }

    /// Full exit at the furthest target, with a profit-locking trailing stop.
    fn simulate_single(&self, signal: &Signal, forward: &[Candle], position: &Position) -> Option<Trade> {
        let (target_idx, target) = signal.final_target()?;
        let target_reason = ExitReason::for_target(target_idx);

        let stop = ProtectiveStop::new(position.direction, signal.stop_loss);
        let mut trailing = TrailingStop::new(position.direction, position.entry, position.risk_distance);

        for (idx, candle) in forward.iter().enumerate() {
            if stop.is_hit(candle) {
                let profit = self.realize(position, stop.price, position.quantity);
                return Some(build_trade(position, stop.price, stop.price, ExitReason::StopLoss, idx + 1, profit));
            }

            // level as of the previous bar; intrabar order is unknown
            if let Some(level) = trailing.breached(candle) {
                let profit = self.realize(position, level, position.quantity);
                return Some(build_trade(position, level, level, ExitReason::TrailingStop, idx + 1, profit));
            }

            if position.reached(candle, target.price) {
                let profit = self.realize(position, target.price, position.quantity);
                return Some(build_trade(position, target.price, stop.price, target_reason, idx + 1, profit));
            }

            trailing.observe(candle);
            trailing.update();
        }

        None
    }

    /// Scale out target by target; the remainder closes on stop, last target or timeout.
    fn simulate_partial(&self, signal: &Signal, forward: &[Candle], position: &Position) -> Trade {
        let weights = self.exit_weights(signal);
        let last_target = signal.targets.len() - 1;

        let mut stop = ProtectiveStop::new(position.direction, signal.stop_loss);
        let mut remaining = 1.0_f64;
        let mut next = 0;
        let mut profit = 0.0;

        for (idx, candle) in forward.iter().enumerate() {
            if stop.is_hit(candle) {
                profit += self.realize(position, stop.price, position.quantity * remaining);
                return build_trade(position, stop.price, stop.price, ExitReason::StopLoss, idx + 1, profit);
            }

            // several targets may fill in one bar, always in order
            while next <= last_target && position.reached(candle, signal.targets[next].price) {
                let price = signal.targets[next].price;
                let fraction = if next == last_target {
                    remaining
                } else {
                    weights[next].min(remaining)
                };

                profit += self.realize(position, price, position.quantity * fraction);
                remaining = (remaining - fraction).max(0.0);

                if next == 0 {
                    stop.move_to_breakeven(position.entry);
                }
                if next == last_target {
                    return build_trade(position, price, stop.price, ExitReason::for_target(next), idx + 1, profit);
                }
                next += 1;
            }
        }

        // forward is non-empty here
        let close = forward[forward.len() - 1].close;
        profit += self.realize(position, close, position.quantity * remaining);
        build_trade(position, close, stop.price, ExitReason::Timeout, forward.len(), profit)
    }

    /// Exit fractions per target: the signal's own weights, else the
    /// configured weights when they match the target count, else an equal split.
    fn exit_weights(&self, signal: &Signal) -> Vec<f64> {
        if let Some(weights) = signal.exit_weights() {
            return weights;
        }

        let count = signal.targets.len();
        let configured = &self.params.partial_weights;
        if configured.len() == count && configured.iter().sum::<u32>() == 100 {
            return configured.iter().map(|&w| w as f64 / 100.0).collect();
        }

        vec![1.0 / count as f64; count]
    }
}

fn build_trade(
    position: &Position,
    exit: f64,
    stop_in_force: f64,
    exit_reason: ExitReason,
    candles_held: usize,
    profit: f64,
) -> Trade {
    let rr = if position.risk_distance > 0.0 {
        (exit - position.entry) * position.direction.sign() / position.risk_distance
    } else {
        0.0
    };
    let profit_percent = if position.risk_amount > 0.0 {
        profit / position.risk_amount * 100.0
    } else {
        0.0
    };

    Trade {
        direction: position.direction,
        entry: position.entry,
        exit,
        stop_loss: stop_in_force,
        exit_reason,
        candles_held,
        profit,
        profit_percent,
        rr,
        balance_after: 0.0,
        entry_index: 0,
        entry_time: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use market_core::Error;

    fn params(partial_exits: bool) -> SimulationParams {
        SimulationParams {
            start_balance: 10_000.0,
            sizer: PositionSizer::new(0.01, 100_000.0, 100.0),
            slippage_percent: 0.0,
            fee_percent: 0.001,
            realistic_slippage: false,
            partial_exits,
            partial_weights: vec![30, 30, 40],
        }
    }

    fn bar(high: f64, low: f64, close: f64) -> Candle {
        Candle::new(0, close, high, low, close, 1.0)
    }

    fn long_signal() -> Signal {
        Signal::new(Direction::Buy, 100.0, 99.0, &[(101.0, 30), (102.0, 30), (104.0, 40)])
    }

    #[test]
    fn test_stop_loss_hit() {
        let simulator = TradeSimulator::new(params(false));
        let signal = Signal::new(Direction::Buy, 100.0, 99.0, &[(102.0, 100)]);
        let forward = vec![bar(100.5, 98.5, 99.2)];

        let trade = simulator.simulate(&signal, &forward).unwrap().unwrap();
        assert_eq!(trade.exit_reason, ExitReason::StopLoss);
        assert_eq!(trade.exit, 99.0);
        assert_eq!(trade.candles_held, 1);
        // 100 units lose 1.0 each, plus 0.2% of that in fees
        assert!((trade.profit - (-100.2)).abs() < 1e-6);
        assert!((trade.rr - (-1.0)).abs() < 1e-9);
        assert!((trade.profit_percent - (-100.2)).abs() < 1e-6);
    }

    #[test]
    fn test_stop_checked_before_target_in_same_bar() {
        let simulator = TradeSimulator::new(params(false));
        let signal = Signal::new(Direction::Buy, 100.0, 99.0, &[(102.0, 100)]);
        let forward = vec![bar(103.0, 98.0, 101.0)];

        let trade = simulator.simulate(&signal, &forward).unwrap().unwrap();
        assert_eq!(trade.exit_reason, ExitReason::StopLoss);
    }

    #[test]
    fn test_notional_cap_limits_loss() {
        let mut capped = params(false);
        capped.sizer = PositionSizer::new(0.01, 100_000.0, 10.0);
        let simulator = TradeSimulator::new(capped);
        let signal = Signal::new(Direction::Buy, 100.0, 99.0, &[(102.0, 100)]);

        let trade = simulator
            .simulate(&signal, &[bar(100.5, 98.5, 99.0)])
            .unwrap()
            .unwrap();
        // 10 units at most: notional 1000 = 10 x 100 risk
        assert!((trade.profit - (-10.02)).abs() < 1e-6);
    }

    #[test]
    fn test_final_target_exit_labelled_by_index() {
        let simulator = TradeSimulator::new(params(false));
        let signal = long_signal();
        // rises without dipping through the trailing level, then tags 104
        let forward = vec![
            bar(100.9, 99.6, 100.8),
            bar(101.5, 101.0, 101.4),
            bar(104.2, 102.8, 104.0),
        ];

        let trade = simulator.simulate(&signal, &forward).unwrap().unwrap();
        assert_eq!(trade.exit_reason, ExitReason::Target3);
        assert_eq!(trade.exit, 104.0);
        assert_eq!(trade.candles_held, 3);
        assert!((trade.rr - 4.0).abs() < 1e-9);
        assert_eq!(trade.stop_loss, 99.0);
    }

    #[test]
    fn test_trailing_stop_locks_profit() {
        let simulator = TradeSimulator::new(params(false));
        let signal = long_signal();
        let forward = vec![
            bar(102.0, 101.3, 101.8),
            // pulls back through 100 + 0.6 * 2.0
            bar(101.9, 101.0, 101.1),
        ];

        let trade = simulator.simulate(&signal, &forward).unwrap().unwrap();
        assert_eq!(trade.exit_reason, ExitReason::TrailingStop);
        assert!((trade.exit - 101.2).abs() < 1e-9);
        assert_eq!(trade.stop_loss, trade.exit);
        assert!(trade.profit > 0.0);
    }

    #[test]
    fn test_trailing_not_breached_on_arming_bar() {
        let simulator = TradeSimulator::new(params(false));
        // spans 1.6R around entry but touches neither the stop nor the target
        let forward = vec![bar(102.0, 99.5, 101.0)];

        assert!(simulator.simulate(&long_signal(), &forward).unwrap().is_none());
    }

    #[test]
    fn test_trailing_arms_then_exits_on_next_bar() {
        let simulator = TradeSimulator::new(params(false));
        let forward = vec![bar(102.0, 99.5, 101.0), bar(101.6, 101.1, 101.2)];

        let trade = simulator.simulate(&long_signal(), &forward).unwrap().unwrap();
        assert_eq!(trade.exit_reason, ExitReason::TrailingStop);
        assert!((trade.exit - 101.2).abs() < 1e-9);
        assert_eq!(trade.candles_held, 2);
    }

    #[test]
    fn test_sell_trailing_stop_locks_profit() {
        let simulator = TradeSimulator::new(params(false));
        let signal = Signal::new(Direction::Sell, 100.0, 101.0, &[(98.0, 50), (96.0, 50)]);
        let forward = vec![
            // low of 98.5 arms the trail at 100 - 0.6 * 1.5
            bar(100.3, 98.5, 98.8),
            bar(99.4, 98.8, 99.3),
        ];

        let trade = simulator.simulate(&signal, &forward).unwrap().unwrap();
        assert_eq!(trade.direction, Direction::Sell);
        assert_eq!(trade.exit_reason, ExitReason::TrailingStop);
        assert!((trade.exit - 99.1).abs() < 1e-9);
        assert_eq!(trade.stop_loss, trade.exit);
        assert!((trade.rr - 0.9).abs() < 1e-9);
        // 100 units gain 0.9 each, less 0.2% in fees
        assert!((trade.profit - 89.82).abs() < 1e-6);
    }

    #[test]
    fn test_unresolved_single_exit_is_no_trade() {
        let simulator = TradeSimulator::new(params(false));
        let forward = vec![bar(100.4, 99.6, 100.0); 10];

        assert!(simulator.simulate(&long_signal(), &forward).unwrap().is_none());
    }

    #[test]
    fn test_partial_exits_in_sequence() {
        let simulator = TradeSimulator::new(params(true));
        let forward = vec![
            bar(101.2, 99.8, 101.0),
            bar(102.3, 100.5, 102.0),
            bar(104.5, 102.5, 104.0),
        ];

        let trade = simulator.simulate(&long_signal(), &forward).unwrap().unwrap();
        assert_eq!(trade.exit_reason, ExitReason::Target3);
        assert_eq!(trade.candles_held, 3);
        // stop sat at breakeven after the first target
        assert_eq!(trade.stop_loss, 100.0);

        // 30 units +1, 30 units +2, 40 units +4, minus fees
        let gross = 30.0 * 1.0 + 30.0 * 2.0 + 40.0 * 4.0;
        assert!((trade.profit - gross * (1.0 - 0.002)).abs() < 1e-6);
    }

    #[test]
    fn test_partial_breakeven_stop_after_first_target() {
        let simulator = TradeSimulator::new(params(true));
        let forward = vec![bar(101.1, 99.5, 101.0), bar(100.8, 99.9, 100.0)];

        let trade = simulator.simulate(&long_signal(), &forward).unwrap().unwrap();
        assert_eq!(trade.exit_reason, ExitReason::StopLoss);
        assert_eq!(trade.exit, 100.0);
        // only the first slice made money; the rest closed flat
        assert!((trade.profit - 30.0 * (1.0 - 0.002)).abs() < 1e-6);
    }

    #[test]
    fn test_partial_targets_fill_in_one_bar() {
        let simulator = TradeSimulator::new(params(true));
        let forward = vec![bar(104.5, 99.5, 104.0)];

        let trade = simulator.simulate(&long_signal(), &forward).unwrap().unwrap();
        assert_eq!(trade.exit_reason, ExitReason::Target3);
        assert_eq!(trade.candles_held, 1);
    }

    #[test]
    fn test_partial_timeout_closes_remainder() {
        let simulator = TradeSimulator::new(params(true));
        let forward = vec![bar(101.5, 99.5, 101.2), bar(101.6, 100.6, 101.5)];

        let trade = simulator.simulate(&long_signal(), &forward).unwrap().unwrap();
        assert_eq!(trade.exit_reason, ExitReason::Timeout);
        assert_eq!(trade.exit, 101.5);
        assert_eq!(trade.candles_held, 2);
        let gross = 30.0 * 1.0 + 70.0 * 1.5;
        assert!((trade.profit - gross * (1.0 - 0.002)).abs() < 1e-6);
    }

    #[test]
    fn test_sell_side_mirrors() {
        let simulator = TradeSimulator::new(params(true));
        let signal = Signal::new(Direction::Sell, 100.0, 101.0, &[(99.0, 50), (98.0, 50)]);
        let forward = vec![bar(100.2, 98.9, 99.0), bar(99.5, 97.5, 97.8)];

        let trade = simulator.simulate(&signal, &forward).unwrap().unwrap();
        assert_eq!(trade.direction, Direction::Sell);
        assert_eq!(trade.exit_reason, ExitReason::Target2);
        let gross = 50.0 * 1.0 + 50.0 * 2.0;
        assert!((trade.profit - gross * (1.0 - 0.002)).abs() < 1e-6);
    }

    #[test]
    fn test_slippage_applied_to_entry() {
        let mut slipped = params(false);
        slipped.slippage_percent = 0.0015;
        let simulator = TradeSimulator::new(slipped);
        let signal = Signal::new(Direction::Buy, 100.0, 99.0, &[(102.0, 100)]);

        let trade = simulator
            .simulate(&signal, &[bar(100.5, 98.5, 99.0)])
            .unwrap()
            .unwrap();
        assert!((trade.entry - 100.15).abs() < 1e-9);
        // rr uses the signal's own risk distance
        assert!((trade.rr - (-1.15)).abs() < 1e-9);
    }

    #[test]
    fn test_zero_risk_distance_is_error() {
        let simulator = TradeSimulator::new(params(false));
        let signal = Signal::new(Direction::Buy, 100.0, 100.0, &[(102.0, 100)]);

        let err = simulator.simulate(&signal, &[bar(101.0, 99.0, 100.0)]).unwrap_err();
        assert!(matches!(err, Error::ZeroRiskDistance { .. }));
    }

    #[test]
    fn test_empty_forward_or_none_signal() {
        let simulator = TradeSimulator::new(params(true));

        assert!(simulator.simulate(&long_signal(), &[]).unwrap().is_none());
        assert!(simulator
            .simulate(&Signal::none(), &[bar(101.0, 99.0, 100.0)])
            .unwrap()
            .is_none());
    }
}
