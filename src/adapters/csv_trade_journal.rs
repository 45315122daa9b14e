//! Append-only CSV trade journal.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use crate::domain::error::EngineError;
use crate::domain::events::TradeRecord;
use crate::ports::trade_record_port::TradeRecordPort;

pub const JOURNAL_HEADER: [&str; 8] = [
    "timestamp", "symbol", "action", "quantity", "price", "reason", "pnl", "status",
];

pub struct CsvTradeJournal {
    path: PathBuf,
}

impl CsvTradeJournal {
    /// Create parent directories and write the header if the file is new.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, EngineError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        if !path.exists() {
            let mut writer = csv::Writer::from_path(&path).map_err(journal_err)?;
            writer.write_record(JOURNAL_HEADER).map_err(journal_err)?;
            writer.flush()?;
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TradeRecordPort for CsvTradeJournal {
    fn record_trade(&self, record: &TradeRecord) -> Result<(), EngineError> {
        let file = OpenOptions::new().append(true).open(&self.path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        writer
            .write_record([
                record.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
                record.symbol.clone(),
                record.action.to_string(),
                record.quantity.to_string(),
                format!("{:.2}", record.price),
                record.reason.to_string(),
                format!("{:.2}", record.pnl),
                record.status.to_string(),
            ])
            .map_err(journal_err)?;
        writer.flush()?;
        Ok(())
    }
}

fn journal_err(err: csv::Error) -> EngineError {
    EngineError::TradeRecord {
        reason: err.to_string(),
    }
}
