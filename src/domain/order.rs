//! Order intents sent to the execution venue and their confirmations.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderKind {
    Market,
}

impl fmt::Display for OrderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Market => write!(f, "MARKET"),
        }
    }
}

/// Normalised trade intent. `reference_price` is the signal price; venues
/// may fill elsewhere.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRequest {
    pub symbol: String,
    pub side: OrderSide,
    pub quantity: u64,
    pub kind: OrderKind,
    pub reference_price: f64,
}

impl OrderRequest {
    pub fn market(symbol: &str, side: OrderSide, quantity: u64, reference_price: f64) -> Self {
        OrderRequest {
            symbol: symbol.to_string(),
            side,
            quantity,
            kind: OrderKind::Market,
            reference_price,
        }
    }
}

/// A confirmed fill. Ledger state follows these values only.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderConfirmation {
    pub order_id: String,
    pub symbol: String,
    pub side: OrderSide,
    pub quantity: u64,
    pub fill_price: f64,
}
