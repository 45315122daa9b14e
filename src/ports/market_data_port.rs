//! Market data port trait.

use crate::domain::bar::Bar;
use crate::domain::error::EngineError;

pub trait MarketDataPort {
    /// Most recent `lookback` bars for `symbol`, oldest first.
    fn fetch_bars(&self, symbol: &str, interval: &str, lookback: usize) -> Result<Vec<Bar>, EngineError>;

    /// Last traded price. Defaults to the close of the newest bar.
    fn latest_price(&self, symbol: &str, interval: &str) -> Result<f64, EngineError> {
        self.fetch_bars(symbol, interval, 1)?
            .last()
            .map(|bar| bar.close)
            .ok_or_else(|| EngineError::MarketData {
                symbol: symbol.to_string(),
                reason: "no bars returned".to_string(),
            })
    }
}
