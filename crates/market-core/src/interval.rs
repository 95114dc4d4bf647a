//! Candle interval helpers.

/// Length of an interval string such as `15m`, `4h` or `1d`, in minutes.
pub fn interval_minutes(interval: &str) -> Option<u32> {
    let interval = interval.trim();
    let split = interval.find(|c: char| !c.is_ascii_digit())?;
    let (count, unit) = interval.split_at(split);
    let count: u32 = count.parse().ok()?;
    let unit_minutes = match unit {
        "m" => 1,
        "h" => 60,
        "d" => 1440,
        "w" => 10080,
        _ => return None,
    };
    if count == 0 {
        return None;
    }
    count.checked_mul(unit_minutes)
}

/// Number of candles in one day. Unknown intervals count as hourly.
pub fn candles_per_day(interval: &str) -> usize {
    match interval_minutes(interval) {
        Some(minutes) => (1440 / minutes).max(1) as usize,
        None => 24,
    }
}

/// Duration of one candle in hours. Unknown intervals count as hourly.
pub fn interval_hours(interval: &str) -> f64 {
    interval_minutes(interval)
        .map(|m| m as f64 / 60.0)
        .unwrap_or(1.0)
}
