//! Trade journal port trait.

use crate::domain::error::EngineError;
use crate::domain::events::TradeRecord;

pub trait TradeRecordPort {
    /// Append one row. Best effort: callers log failures and carry on.
    fn record_trade(&self, record: &TradeRecord) -> Result<(), EngineError>;
}
