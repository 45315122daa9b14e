//! Outbound records: trade journal rows and notifications.

use chrono::NaiveDateTime;
use std::fmt;

use super::order::OrderSide;
use super::signal::SignalReason;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeStatus {
    Executed,
    Failed,
}

impl fmt::Display for TradeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Executed => write!(f, "EXECUTED"),
            Self::Failed => write!(f, "FAILED"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TradeRecord {
    pub timestamp: NaiveDateTime,
    pub symbol: String,
    pub action: OrderSide,
    pub quantity: u64,
    pub price: f64,
    pub reason: SignalReason,
    pub pnl: f64,
    pub status: TradeStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    SystemStarted,
    SystemStopped,
    TradeExecuted,
    OrderFailed,
    SessionFlattened,
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::SystemStarted => "system_started",
            Self::SystemStopped => "system_stopped",
            Self::TradeExecuted => "trade_executed",
            Self::OrderFailed => "order_failed",
            Self::SessionFlattened => "session_flattened",
        };
        write!(f, "{label}")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
}

impl Notification {
    pub fn new(kind: NotificationKind, message: impl Into<String>) -> Self {
        Notification {
            kind,
            message: message.into(),
        }
    }

    pub fn trade(record: &TradeRecord) -> Self {
        let mut message = format!(
            "{} {} {} @ {:.2} ({})",
            record.action, record.quantity, record.symbol, record.price, record.reason
        );
        if record.action == OrderSide::Sell {
            message.push_str(&format!(" pnl {:.2}", record.pnl));
        }
        Notification::new(NotificationKind::TradeExecuted, message)
    }
}
