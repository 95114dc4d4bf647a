//! Price indicators shared by filters, the stress harness and signal sources.

use crate::types::Candle;

/// Average true range over the last `period` bars of `candles`.
///
/// Uses the previous close for gaps when it is available inside the slice.
/// Returns 0 for an empty slice; shorter slices average what they have.
pub fn atr(candles: &[Candle], period: usize) -> f64 {
    let period = period.min(candles.len());
    if period == 0 {
        return 0.0;
    }

    let start = candles.len() - period;
    let sum: f64 = (start..candles.len())
        .map(|i| {
            let candle = &candles[i];
            match i.checked_sub(1).map(|p| candles[p].close) {
                Some(prev_close) => candle
                    .range()
                    .max((candle.high - prev_close).abs())
                    .max((candle.low - prev_close).abs()),
                None => candle.range(),
            }
        })
        .sum();

    sum / period as f64
}

/// ATR of `window` as a percentage of the reference bar's midpoint.
pub fn volatility_percent(window: &[Candle], reference: &Candle, period: usize) -> f64 {
    let mid = reference.mid();
    if mid <= 0.0 {
        return 0.0;
    }
    atr(window, period) / mid * 100.0
}

/// Exponential moving average of closes, seeded with the first close.
pub fn ema(candles: &[Candle], period: usize) -> f64 {
    let Some(first) = candles.first() else {
        return 0.0;
    };
    let k = 2.0 / (period.max(1) as f64 + 1.0);
    candles
        .iter()
        .skip(1)
        .fold(first.close, |ema, c| c.close * k + ema * (1.0 - k))
}

/// Relative strength index of closes over the last `period` changes.
///
/// Returns 50 when there is not enough data or no movement.
pub fn rsi(candles: &[Candle], period: usize) -> f64 {
    if period == 0 || candles.len() <= period {
        return 50.0;
    }

    let changes = candles[candles.len() - period - 1..]
        .windows(2)
        .map(|w| w[1].close - w[0].close);

    let (gains, losses) = changes.fold((0.0, 0.0), |(g, l), change| {
        if change > 0.0 {
            (g + change, l)
        } else {
            (g, l - change)
        }
    });

    if gains == 0.0 && losses == 0.0 {
        return 50.0;
    }
    if losses == 0.0 {
        return 100.0;
    }

    let rs = gains / losses;
    100.0 - 100.0 / (1.0 + rs)
}

/// Mean volume of a slice.
pub fn average_volume(candles: &[Candle]) -> f64 {
    if candles.is_empty() {
        return 0.0;
    }
    candles.iter().map(|c| c.volume).sum::<f64>() / candles.len() as f64
}

/// Mean absolute close-to-close change, as a fraction.
pub fn mean_abs_change(candles: &[Candle]) -> f64 {
    if candles.len() < 2 {
        return 0.0;
    }
    let total: f64 = candles
        .windows(2)
        .map(|w| {
            if w[0].close == 0.0 {
                0.0
            } else {
                ((w[1].close - w[0].close) / w[0].close).abs()
            }
        })
        .sum();
    total / (candles.len() - 1) as f64
}
