//! Position ledger: at most one open position per symbol.

use chrono::NaiveDateTime;
use std::collections::HashMap;

use super::error::EngineError;
use super::position::Position;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PositionLedger {
    positions: HashMap<String, Position>,
}

impl PositionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(
        &mut self,
        symbol: &str,
        entry_price: f64,
        quantity: u64,
        opened_at: NaiveDateTime,
    ) -> Result<&Position, EngineError> {
        if self.positions.contains_key(symbol) {
            return Err(EngineError::DuplicatePosition {
                symbol: symbol.to_string(),
            });
        }
        let position = Position {
            symbol: symbol.to_string(),
            entry_price,
            quantity,
            opened_at,
        };
        Ok(self.positions.entry(symbol.to_string()).or_insert(position))
    }

    pub fn close(&mut self, symbol: &str) -> Result<Position, EngineError> {
        self.positions
            .remove(symbol)
            .ok_or_else(|| EngineError::NoSuchPosition {
                symbol: symbol.to_string(),
            })
    }

    pub fn get(&self, symbol: &str) -> Option<&Position> {
        self.positions.get(symbol)
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.positions.contains_key(symbol)
    }

    pub fn count(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Position> {
        self.positions.values()
    }

    /// Open symbols, sorted.
    pub fn symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self.positions.keys().cloned().collect();
        symbols.sort();
        symbols
    }
}
