//! Trading signals produced by an external signal source.

use serde::{Deserialize, Serialize};

/// Trade direction of a signal or trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Buy,
    Sell,
    None,
}

impl Direction {
    /// +1 for long, -1 for short, 0 for no position.
    pub fn sign(&self) -> f64 {
        match self {
            Direction::Buy => 1.0,
            Direction::Sell => -1.0,
            Direction::None => 0.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Buy => "BUY",
            Direction::Sell => "SELL",
            Direction::None => "NONE",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A take-profit level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub price: f64,
    /// Target distance divided by risk distance.
    pub rr: f64,
    /// Share of the original position exited here, in percent.
    pub percentage: u32,
}

impl Target {
    pub fn new(price: f64, rr: f64, percentage: u32) -> Self {
        Self {
            price,
            rr,
            percentage,
        }
    }
}

/// An entry signal with protective stop and ordered targets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub direction: Direction,
    pub entry: f64,
    pub stop_loss: f64,
    /// Ordered nearest-first.
    pub targets: Vec<Target>,
    pub strength: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeframe: Option<String>,
}

impl Signal {
    /// Build a signal whose target weights and RR are derived from prices.
    ///
    /// `targets` is a list of `(price, percentage)` pairs in any order; they
    /// are stored nearest-first.
    pub fn new(direction: Direction, entry: f64, stop_loss: f64, targets: &[(f64, u32)]) -> Self {
        let risk = (entry - stop_loss).abs();
        let mut targets: Vec<Target> = targets
            .iter()
            .map(|&(price, percentage)| {
                let rr = if risk > 0.0 { (price - entry).abs() / risk } else { 0.0 };
                Target::new(price, rr, percentage)
            })
            .collect();
        let sign = direction.sign();
        targets.sort_by(|a, b| ((a.price - entry) * sign).total_cmp(&((b.price - entry) * sign)));

        Self {
            direction,
            entry,
            stop_loss,
            targets,
            strength: 0.0,
            strategy: None,
            timeframe: None,
        }
    }

    /// A "no trade" signal.
    pub fn none() -> Self {
        Self {
            direction: Direction::None,
            entry: 0.0,
            stop_loss: 0.0,
            targets: Vec::new(),
            strength: 0.0,
            strategy: None,
            timeframe: None,
        }
    }

    pub fn with_strength(mut self, strength: f64) -> Self {
        self.strength = strength;
        self
    }

    pub fn with_strategy(mut self, strategy: impl Into<String>) -> Self {
        self.strategy = Some(strategy.into());
        self
    }

    /// Whether the signal asks for a position at all.
    pub fn is_actionable(&self) -> bool {
        self.direction != Direction::None && !self.targets.is_empty()
    }

    /// Absolute distance between entry and stop.
    pub fn risk_distance(&self) -> f64 {
        (self.entry - self.stop_loss).abs()
    }

    /// Target weights as fractions, if they are all set and sum to 100.
    pub fn exit_weights(&self) -> Option<Vec<f64>> {
        let total: u32 = self.targets.iter().map(|t| t.percentage).sum();
        if total != 100 || self.targets.iter().any(|t| t.percentage == 0) {
            return None;
        }
        Some(
            self.targets
                .iter()
                .map(|t| t.percentage as f64 / 100.0)
                .collect(),
        )
    }

    /// Furthest target from entry in the trade's direction, with its index.
    pub fn final_target(&self) -> Option<(usize, &Target)> {
        let sign = self.direction.sign();
        self.targets
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| {
                ((a.price - self.entry) * sign).total_cmp(&((b.price - self.entry) * sign))
            })
    }
}
