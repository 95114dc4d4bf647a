//! Historical candle loading from CSV or JSON files.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use chrono::DateTime;
use market_core::types::candle::is_ascending;
use market_core::{Candle, Error, Result};
use serde::Deserialize;
use tracing::{debug, info};

/// Supported candle file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandleFormat {
    /// Header `timestamp,open,high,low,close,volume`.
    Csv,
    /// An array of candle objects.
    Json,
}

impl CandleFormat {
    /// Pick a format from the file extension. Anything but `.json` is CSV.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => CandleFormat::Json,
            _ => CandleFormat::Csv,
        }
    }
}

/// CSV row; the timestamp may be epoch milliseconds or RFC 3339.
#[derive(Debug, Deserialize)]
struct CsvCandle {
    timestamp: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(default)]
    volume: f64,
}

impl CsvCandle {
    fn into_candle(self, row: usize) -> Result<Candle> {
        let timestamp = parse_timestamp(&self.timestamp).ok_or_else(|| {
            Error::InvalidCandles(format!("row {}: bad timestamp {:?}", row, self.timestamp))
        })?;
        Ok(Candle::new(timestamp, self.open, self.high, self.low, self.close, self.volume))
    }
}

fn parse_timestamp(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if let Ok(ms) = raw.parse::<i64>() {
        return Some(ms);
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.timestamp_millis())
}

/// Load candles from `path`, choosing the format by extension.
pub fn load_candles(path: impl AsRef<Path>) -> Result<Vec<Candle>> {
    let path = path.as_ref();
    let format = CandleFormat::from_path(path);
    let reader = BufReader::new(File::open(path)?);

    let candles = match format {
        CandleFormat::Csv => read_csv(reader)?,
        CandleFormat::Json => read_json(reader)?,
    };

    info!(
        path = %path.display(),
        ?format,
        candles = candles.len(),
        "Loaded candles"
    );
    Ok(candles)
}

/// Parse CSV candles and check ordering.
pub fn read_csv<R: Read>(reader: R) -> Result<Vec<Candle>> {
    let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

    let mut candles = Vec::new();
    for (row, record) in csv_reader.deserialize::<CsvCandle>().enumerate() {
        candles.push(record?.into_candle(row + 1)?);
    }

    validate(candles)
}

/// Parse a JSON array of candles and check ordering.
pub fn read_json<R: Read>(reader: R) -> Result<Vec<Candle>> {
    let candles: Vec<Candle> = serde_json::from_reader(reader)?;
    validate(candles)
}

fn validate(candles: Vec<Candle>) -> Result<Vec<Candle>> {
    if !is_ascending(&candles) {
        return Err(Error::InvalidCandles(
            "timestamps are not in ascending order".to_string(),
        ));
    }
    if let Some(bad) = candles.iter().position(|c| c.high < c.low) {
        return Err(Error::InvalidCandles(format!(
            "candle {} has high below low",
            bad
        )));
    }
    debug!(candles = candles.len(), "Candle series validated");
    Ok(candles)
}
