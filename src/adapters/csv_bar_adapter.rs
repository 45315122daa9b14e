//! CSV file market data adapter.
//!
//! One file per symbol, `<dir>/<SYMBOL>.csv`, with header
//! `timestamp,open,high,low,close,volume`. Files hold a single bar interval;
//! the requested interval is not checked.

use crate::domain::bar::Bar;
use crate::domain::error::EngineError;
use crate::ports::market_data_port::MarketDataPort;
use chrono::NaiveDateTime;
use std::path::{Path, PathBuf};
use std::str::FromStr;

const TIMESTAMP_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

pub struct CsvBarAdapter {
    base_path: PathBuf,
}

impl CsvBarAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", symbol))
    }
}

impl MarketDataPort for CsvBarAdapter {
    fn fetch_bars(&self, symbol: &str, _interval: &str, lookback: usize) -> Result<Vec<Bar>, EngineError> {
        let mut bars = read_bars_file(&self.csv_path(symbol), symbol)?;
        if bars.len() > lookback {
            bars.drain(..bars.len() - lookback);
        }
        Ok(bars)
    }
}

/// Read every bar in `path`, sorted by timestamp.
pub fn read_bars_file(path: &Path, symbol: &str) -> Result<Vec<Bar>, EngineError> {
    let data_err = |reason: String| EngineError::MarketData {
        symbol: symbol.to_string(),
        reason,
    };

    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| data_err(format!("failed to read {}: {}", path.display(), e)))?;

    let mut bars = Vec::new();
    for (line, result) in rdr.records().enumerate() {
        let record = result.map_err(|e| data_err(format!("CSV parse error: {}", e)))?;
        let row = line + 2;

        let raw_ts = record
            .get(0)
            .ok_or_else(|| data_err(format!("row {row}: missing timestamp column")))?;
        let timestamp = parse_timestamp(raw_ts)
            .ok_or_else(|| data_err(format!("row {row}: invalid timestamp {raw_ts:?}")))?;

        bars.push(Bar {
            timestamp,
            open: field(&record, 1, "open", row).map_err(data_err)?,
            high: field(&record, 2, "high", row).map_err(data_err)?,
            low: field(&record, 3, "low", row).map_err(data_err)?,
            close: field(&record, 4, "close", row).map_err(data_err)?,
            volume: match record.get(5) {
                Some(v) if !v.is_empty() => field(&record, 5, "volume", row).map_err(data_err)?,
                _ => 0,
            },
        });
    }

    bars.sort_by_key(|b| b.timestamp);
    bars.dedup_by_key(|b| b.timestamp);
    Ok(bars)
}

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

fn field<T: FromStr>(record: &csv::StringRecord, index: usize, name: &str, row: usize) -> Result<T, String>
where
    T::Err: std::fmt::Display,
{
    record
        .get(index)
        .ok_or_else(|| format!("row {row}: missing {name} column"))?
        .parse()
        .map_err(|e| format!("row {row}: invalid {name} value: {e}"))
}
