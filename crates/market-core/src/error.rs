//! Error types for the backtesting system.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Insufficient candles: need at least {required}, got {actual}")]
    InsufficientCandles { required: usize, actual: usize },

    #[error("Zero risk distance: entry {entry} equals stop {stop_loss}")]
    ZeroRiskDistance { entry: f64, stop_loss: f64 },

    #[error("Unknown strategy: {0}")]
    UnknownStrategy(String),

    #[error("No strategy run completed successfully")]
    NoSuccessfulRun,

    #[error("Invalid candle data: {0}")]
    InvalidCandles(String),

    #[error("Configuration file error: {0}")]
    ConfigFile(#[from] config::ConfigError),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Export error: {0}")]
    Export(String),
}

impl Error {
    /// Whether this error aborts a run (as opposed to a per-bar skip).
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::ZeroRiskDistance { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
