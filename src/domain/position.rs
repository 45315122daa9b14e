//! Open positions and closed trades.

use chrono::NaiveDateTime;

use crate::domain::signal::SignalReason;

/// A long position held in one symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub symbol: String,
    pub entry_price: f64,
    pub quantity: u64,
    pub opened_at: NaiveDateTime,
}

impl Position {
    pub fn market_value(&self, price: f64) -> f64 {
        self.quantity as f64 * price
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        self.quantity as f64 * (price - self.entry_price)
    }

    /// entry * (1 - stop_pct)
    pub fn stop_price(&self, stop_pct: f64) -> f64 {
        self.entry_price * (1.0 - stop_pct)
    }

    /// entry * (1 + take_pct)
    pub fn target_price(&self, take_pct: f64) -> f64 {
        self.entry_price * (1.0 + take_pct)
    }

    pub fn should_stop_loss(&self, price: f64, stop_pct: f64) -> bool {
        stop_pct > 0.0 && price <= self.stop_price(stop_pct)
    }

    pub fn should_take_profit(&self, price: f64, take_pct: f64) -> bool {
        take_pct > 0.0 && price >= self.target_price(take_pct)
    }

    /// Protective exit reason at `price`. Stop-loss wins if both thresholds are met.
    pub fn protective_exit(&self, price: f64, stop_pct: f64, take_pct: f64) -> Option<SignalReason> {
        if self.should_stop_loss(price, stop_pct) {
            Some(SignalReason::StopLoss)
        } else if self.should_take_profit(price, take_pct) {
            Some(SignalReason::TakeProfit)
        } else {
            None
        }
    }

    /// Close the position at a confirmed fill.
    pub fn into_closed(self, exit_price: f64, closed_at: NaiveDateTime, reason: SignalReason) -> ClosedTrade {
        let pnl = self.unrealized_pnl(exit_price);
        ClosedTrade {
            symbol: self.symbol,
            quantity: self.quantity,
            entry_price: self.entry_price,
            exit_price,
            opened_at: self.opened_at,
            closed_at,
            pnl,
            reason,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClosedTrade {
    pub symbol: String,
    pub quantity: u64,
    pub entry_price: f64,
    pub exit_price: f64,
    pub opened_at: NaiveDateTime,
    pub closed_at: NaiveDateTime,
    pub pnl: f64,
    pub reason: SignalReason,
}
