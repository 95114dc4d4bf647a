//! Result export as JSON or a CSV trade ledger.

use std::fs;
use std::path::Path;

use market_core::{Error, Result};
use tracing::info;

use crate::result::BacktestResult;

const CSV_HEADER: [&str; 10] = [
    "Type",
    "Entry",
    "Exit",
    "StopLoss",
    "ExitReason",
    "CandlesHeld",
    "Profit",
    "ProfitPercent",
    "RR",
    "BalanceAfter",
];

/// Pretty-printed JSON of the whole result.
pub fn to_json(result: &BacktestResult) -> Result<String> {
    Ok(serde_json::to_string_pretty(result)?)
}

/// One CSV row per trade, numbers to two decimals.
pub fn to_csv(result: &BacktestResult) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(CSV_HEADER)?;

    for trade in &result.trades {
        writer.write_record([
            trade.direction.as_str().to_string(),
            format!("{:.2}", trade.entry),
            format!("{:.2}", trade.exit),
            format!("{:.2}", trade.stop_loss),
            trade.exit_reason.label().to_string(),
            trade.candles_held.to_string(),
            format!("{:.2}", trade.profit),
            format!("{:.2}", trade.profit_percent),
            format!("{:.2}", trade.rr),
            format!("{:.2}", trade.balance_after),
        ])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| Error::Export(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| Error::Export(e.to_string()))
}

pub fn write_json(result: &BacktestResult, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    fs::write(path, to_json(result)?)?;
    info!(path = %path.display(), "Wrote JSON result");
    Ok(())
}

pub fn write_csv(result: &BacktestResult, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    fs::write(path, to_csv(result)?)?;
    info!(path = %path.display(), trades = result.trades.len(), "Wrote trade ledger");
    Ok(())
}
