//! Bar-by-bar replay of recorded history for one symbol.
//!
//! Only bars up to the cursor are visible, so the coordinator sees the same
//! growing window it would have seen live.

use std::cell::Cell;

use crate::domain::bar::Bar;
use crate::domain::error::EngineError;
use crate::ports::market_data_port::MarketDataPort;

pub struct ReplayFeed {
    symbol: String,
    bars: Vec<Bar>,
    visible: Cell<usize>,
}

impl ReplayFeed {
    pub fn new(symbol: &str, bars: Vec<Bar>) -> Self {
        Self {
            symbol: symbol.to_string(),
            bars,
            visible: Cell::new(0),
        }
    }

    /// Reveal the next bar. Returns `None` once history is exhausted.
    pub fn advance(&self) -> Option<&Bar> {
        let next = self.visible.get();
        let bar = self.bars.get(next)?;
        self.visible.set(next + 1);
        Some(bar)
    }

    /// The bar the next `advance` would reveal.
    pub fn peek(&self) -> Option<&Bar> {
        self.bars.get(self.visible.get())
    }

    pub fn current(&self) -> Option<&Bar> {
        self.visible
            .get()
            .checked_sub(1)
            .and_then(|i| self.bars.get(i))
    }

    pub fn remaining(&self) -> usize {
        self.bars.len() - self.visible.get()
    }
}

impl MarketDataPort for ReplayFeed {
    fn fetch_bars(&self, symbol: &str, _interval: &str, lookback: usize) -> Result<Vec<Bar>, EngineError> {
        if symbol != self.symbol {
            return Ok(Vec::new());
        }
        let end = self.visible.get();
        let start = end.saturating_sub(lookback);
        Ok(self.bars[start..end].to_vec())
    }
}
