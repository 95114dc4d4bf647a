//! Backtest run configuration.
//!
//! Every numeric option treats zero as "use the default", so a partially
//! filled file or an empty environment still produces a usable run.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// How the lookback window handed to the signal source is sliced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowType {
    /// Grows with the walk up to `max_window` bars.
    #[default]
    Expanding,
    /// Sliding `max_window` bars.
    Rolling,
    /// Constant `min_window` bars.
    Fixed,
}

impl WindowType {
    pub fn as_str(&self) -> &'static str {
        match self {
            WindowType::Expanding => "expanding",
            WindowType::Rolling => "rolling",
            WindowType::Fixed => "fixed",
        }
    }
}

/// UTC trading session used by the hours filter.
///
/// A bar passes when it falls on a weekday and its hour is strictly between
/// `open_hour` and `close_hour`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradingHours {
    pub open_hour: u32,
    pub close_hour: u32,
    pub weekdays_only: bool,
}

impl Default for TradingHours {
    fn default() -> Self {
        Self {
            open_hour: 8,
            close_hour: 20,
            weekdays_only: true,
        }
    }
}

/// Per-run backtest parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    pub symbol: String,
    pub interval: String,
    pub days: u32,
    pub start_balance: f64,
    /// Strategy identifier passed to the signal source.
    pub strategy: String,

    /// Fraction of the starting balance risked per trade.
    pub risk_percent: f64,
    /// Absolute cap on the amount risked per trade.
    pub max_position_cap: f64,
    /// Position notional is capped at this multiple of the risk amount.
    pub max_position_multiple: f64,
    /// Entry slippage as a fraction of price.
    pub slippage_percent: f64,
    /// Fee per side as a fraction of realized profit.
    pub fee_percent: f64,
    /// Scale slippage by the forward path's mean absolute change.
    pub realistic_slippage: bool,

    pub window_type: WindowType,
    pub min_window: usize,
    pub max_window: usize,
    /// Forward candles available to each simulated trade.
    pub forward_horizon: usize,
    /// Extra bars skipped after a completed trade.
    pub skip_ahead: usize,

    pub max_trades_per_day: u32,
    /// Stop opening trades after this many losses in a row. Zero disables.
    pub max_consecutive_loss: u32,
    /// Minimum ATR as a percent of price. Zero disables.
    pub min_volatility: f64,
    /// Maximum ATR as a percent of price. Zero disables.
    pub max_volatility: f64,
    pub trading_hours_only: bool,
    pub trading_hours: TradingHours,

    pub use_walk_forward: bool,
    pub training_days: u32,
    pub testing_days: u32,

    pub enable_monte_carlo: bool,
    pub monte_carlo_runs: usize,
    /// Fixed seed for reproducible resampling.
    pub monte_carlo_seed: Option<u64>,

    pub enable_stress_test: bool,

    pub enable_partial_exits: bool,
    /// Exit weights in percent, used when a signal carries none of its own.
    pub partial_weights: Vec<u32>,

    pub enable_parallel: bool,
    pub strategies: Vec<String>,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            symbol: String::new(),
            interval: String::new(),
            days: 0,
            start_balance: 0.0,
            strategy: String::new(),
            risk_percent: 0.0,
            max_position_cap: 0.0,
            max_position_multiple: 0.0,
            slippage_percent: 0.0,
            fee_percent: 0.0,
            realistic_slippage: false,
            window_type: WindowType::Expanding,
            min_window: 0,
            max_window: 0,
            forward_horizon: 0,
            skip_ahead: 0,
            max_trades_per_day: 0,
            max_consecutive_loss: 0,
            min_volatility: 0.0,
            max_volatility: 0.0,
            trading_hours_only: false,
            trading_hours: TradingHours::default(),
            use_walk_forward: false,
            training_days: 0,
            testing_days: 0,
            enable_monte_carlo: false,
            monte_carlo_runs: 0,
            monte_carlo_seed: None,
            enable_stress_test: false,
            enable_partial_exits: false,
            partial_weights: Vec::new(),
            enable_parallel: false,
            strategies: Vec::new(),
        }
    }
}

impl BacktestConfig {
    pub const DEFAULT_START_BALANCE: f64 = 10_000.0;
    pub const DEFAULT_RISK_PERCENT: f64 = 0.003;
    pub const DEFAULT_SLIPPAGE_PERCENT: f64 = 0.0015;
    pub const DEFAULT_FEE_PERCENT: f64 = 0.001;
    pub const DEFAULT_MIN_WINDOW: usize = 100;
    pub const DEFAULT_MAX_WINDOW: usize = 200;
    pub const DEFAULT_FORWARD_HORIZON: usize = 50;
    pub const DEFAULT_SKIP_AHEAD: usize = 5;
    pub const DEFAULT_MAX_TRADES_PER_DAY: u32 = 20;
    pub const DEFAULT_MONTE_CARLO_RUNS: usize = 1000;
    pub const DEFAULT_TRAINING_DAYS: u32 = 60;
    pub const DEFAULT_TESTING_DAYS: u32 = 30;
    pub const DEFAULT_PARTIAL_WEIGHTS: [u32; 3] = [30, 30, 40];

    /// Create a config for a symbol and strategy with every other option defaulted.
    pub fn new(symbol: impl Into<String>, interval: impl Into<String>, strategy: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            interval: interval.into(),
            strategy: strategy.into(),
            ..Default::default()
        }
        .with_defaults()
    }

    /// Fill every zero-valued option with its documented default.
    ///
    /// Idempotent: applying it twice yields the same config.
    pub fn with_defaults(mut self) -> Self {
        if self.symbol.is_empty() {
            self.symbol = "BTCUSDT".to_string();
        }
        if self.interval.is_empty() {
            self.interval = "15m".to_string();
        }
        if self.days == 0 {
            self.days = 30;
        }
        if self.start_balance <= 0.0 {
            self.start_balance = Self::DEFAULT_START_BALANCE;
        }
        if self.strategy.is_empty() {
            self.strategy = "breakout_master".to_string();
        }
        if self.risk_percent <= 0.0 {
            self.risk_percent = Self::DEFAULT_RISK_PERCENT;
        }
        if self.max_position_cap <= 0.0 {
            self.max_position_cap = self.start_balance * 10.0;
        }
        if self.max_position_multiple <= 0.0 {
            self.max_position_multiple = 10.0;
        }
        if self.slippage_percent <= 0.0 {
            self.slippage_percent = Self::DEFAULT_SLIPPAGE_PERCENT;
        }
        if self.fee_percent <= 0.0 {
            self.fee_percent = Self::DEFAULT_FEE_PERCENT;
        }
        if self.min_window == 0 {
            self.min_window = Self::DEFAULT_MIN_WINDOW;
        }
        if self.max_window == 0 {
            self.max_window = Self::DEFAULT_MAX_WINDOW;
        }
        if self.forward_horizon == 0 {
            self.forward_horizon = Self::DEFAULT_FORWARD_HORIZON;
        }
        if self.skip_ahead == 0 {
            self.skip_ahead = Self::DEFAULT_SKIP_AHEAD;
        }
        if self.max_trades_per_day == 0 {
            self.max_trades_per_day = Self::DEFAULT_MAX_TRADES_PER_DAY;
        }
        if self.training_days == 0 {
            self.training_days = Self::DEFAULT_TRAINING_DAYS;
        }
        if self.testing_days == 0 {
            self.testing_days = Self::DEFAULT_TESTING_DAYS;
        }
        if self.monte_carlo_runs == 0 {
            self.monte_carlo_runs = Self::DEFAULT_MONTE_CARLO_RUNS;
        }
        if self.partial_weights.is_empty() {
            self.partial_weights = Self::DEFAULT_PARTIAL_WEIGHTS.to_vec();
        }
        self
    }

    /// Smallest candle series a single driver run accepts.
    pub fn min_candles(&self) -> usize {
        self.min_window + self.forward_horizon
    }

    /// Strategies to evaluate when running in parallel mode.
    pub fn parallel_strategies(&self) -> &[String] {
        &self.strategies
    }

    /// Check option combinations that defaults cannot repair.
    pub fn validate(&self) -> Result<()> {
        if self.max_window < self.min_window && self.window_type != WindowType::Fixed {
            return Err(Error::Config {
                message: format!(
                    "max_window ({}) must not be smaller than min_window ({})",
                    self.max_window, self.min_window
                ),
            });
        }
        if self.min_volatility > 0.0
            && self.max_volatility > 0.0
            && self.min_volatility > self.max_volatility
        {
            return Err(Error::Config {
                message: "min_volatility exceeds max_volatility".to_string(),
            });
        }
        if self.trading_hours.open_hour >= self.trading_hours.close_hour
            || self.trading_hours.close_hour > 24
        {
            return Err(Error::Config {
                message: "trading_hours must satisfy open_hour < close_hour <= 24".to_string(),
            });
        }
        let weights: u32 = self.partial_weights.iter().sum();
        if weights != 100 {
            return Err(Error::Config {
                message: format!("partial_weights must sum to 100, got {}", weights),
            });
        }
        Ok(())
    }

    /// Load from a TOML/JSON/YAML file, overridden by `BACKTEST_*` environment variables.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        dotenvy::dotenv().ok();

        let settings = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("BACKTEST")
                    .list_separator(",")
                    .with_list_parse_key("strategies")
                    .try_parsing(true),
            )
            .build()?;

        let config: BacktestConfig = settings.try_deserialize()?;
        let config = config.with_defaults();
        config.validate()?;
        Ok(config)
    }

    /// Load from `BACKTEST_*` environment variables (and `.env`) only.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let settings = config::Config::builder()
            .add_source(
                config::Environment::with_prefix("BACKTEST")
                    .list_separator(",")
                    .with_list_parse_key("strategies")
                    .try_parsing(true),
            )
            .build()?;

        let config: BacktestConfig = settings.try_deserialize()?;
        let config = config.with_defaults();
        config.validate()?;
        Ok(config)
    }
}
