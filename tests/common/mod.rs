#![allow(dead_code)]

use chrono::{Duration, NaiveDate, NaiveDateTime};
use crosstrader::domain::bar::Bar;
use crosstrader::domain::config::{EngineConfig, MinQuantityPolicy};
use crosstrader::domain::error::EngineError;
use crosstrader::domain::events::{Notification, NotificationKind, TradeRecord, TradeStatus};
use crosstrader::domain::order::{OrderConfirmation, OrderRequest};
use crosstrader::ports::market_data_port::MarketDataPort;
use crosstrader::ports::notifier_port::NotifierPort;
use crosstrader::ports::order_port::OrderPort;
use crosstrader::ports::trade_record_port::TradeRecordPort;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};

/// Bullish crossover on the last bar with fast=2, slow=4.
pub const BULLISH: [f64; 7] = [100.0, 99.0, 98.0, 97.0, 96.0, 95.0, 100.0];
/// Bearish crossover on the last bar with fast=2, slow=4.
pub const BEARISH: [f64; 7] = [95.0, 96.0, 97.0, 98.0, 99.0, 100.0, 95.0];

pub struct MockMarket {
    pub bars: RefCell<HashMap<String, Vec<Bar>>>,
    pub errors: RefCell<HashMap<String, String>>,
}

impl MockMarket {
    pub fn new() -> Self {
        Self {
            bars: RefCell::new(HashMap::new()),
            errors: RefCell::new(HashMap::new()),
        }
    }

    pub fn with_closes(self, symbol: &str, closes: &[f64]) -> Self {
        self.set_closes(symbol, closes);
        self
    }

    pub fn set_closes(&self, symbol: &str, closes: &[f64]) {
        self.bars
            .borrow_mut()
            .insert(symbol.to_string(), bars_from_closes(closes));
    }

    /// Append one bar five minutes after the symbol's last bar.
    pub fn push_close(&self, symbol: &str, close: f64) {
        let mut bars = self.bars.borrow_mut();
        let series = bars.entry(symbol.to_string()).or_default();
        let timestamp = series
            .last()
            .map(|b| b.timestamp + Duration::minutes(5))
            .unwrap_or_else(session_start);
        series.push(make_bar(timestamp, close));
    }

    pub fn fail(&self, symbol: &str, reason: &str) {
        self.errors
            .borrow_mut()
            .insert(symbol.to_string(), reason.to_string());
    }

    pub fn heal(&self, symbol: &str) {
        self.errors.borrow_mut().remove(symbol);
    }
}

impl MarketDataPort for MockMarket {
    fn fetch_bars(&self, symbol: &str, _interval: &str, lookback: usize) -> Result<Vec<Bar>, EngineError> {
        if let Some(reason) = self.errors.borrow().get(symbol) {
            return Err(EngineError::MarketData {
                symbol: symbol.to_string(),
                reason: reason.clone(),
            });
        }
        let bars = self.bars.borrow().get(symbol).cloned().unwrap_or_default();
        let start = bars.len().saturating_sub(lookback);
        Ok(bars[start..].to_vec())
    }
}

/// Fills every order at its reference price unless the symbol is set to fail.
pub struct MockOrders {
    pub submitted: RefCell<Vec<OrderRequest>>,
    pub rejecting: RefCell<HashSet<String>>,
}

impl MockOrders {
    pub fn new() -> Self {
        Self {
            submitted: RefCell::new(Vec::new()),
            rejecting: RefCell::new(HashSet::new()),
        }
    }

    pub fn reject(&self, symbol: &str) {
        self.rejecting.borrow_mut().insert(symbol.to_string());
    }

    pub fn accept(&self, symbol: &str) {
        self.rejecting.borrow_mut().remove(symbol);
    }

    pub fn count(&self) -> usize {
        self.submitted.borrow().len()
    }
}

impl OrderPort for MockOrders {
    fn submit_order(&self, request: &OrderRequest) -> Result<OrderConfirmation, EngineError> {
        self.submitted.borrow_mut().push(request.clone());
        if self.rejecting.borrow().contains(&request.symbol) {
            return Err(EngineError::OrderRejected {
                symbol: request.symbol.clone(),
                reason: "insufficient margin".to_string(),
            });
        }
        Ok(OrderConfirmation {
            order_id: format!("T{}", self.count()),
            symbol: request.symbol.clone(),
            side: request.side,
            quantity: request.quantity,
            fill_price: request.reference_price,
        })
    }
}

pub struct RecordingJournal {
    pub records: RefCell<Vec<TradeRecord>>,
    pub failing: Cell<bool>,
}

impl RecordingJournal {
    pub fn new() -> Self {
        Self {
            records: RefCell::new(Vec::new()),
            failing: Cell::new(false),
        }
    }

    pub fn with_status(&self, status: TradeStatus) -> Vec<TradeRecord> {
        self.records
            .borrow()
            .iter()
            .filter(|r| r.status == status)
            .cloned()
            .collect()
    }
}

impl TradeRecordPort for RecordingJournal {
    fn record_trade(&self, record: &TradeRecord) -> Result<(), EngineError> {
        if self.failing.get() {
            return Err(EngineError::TradeRecord {
                reason: "disk full".to_string(),
            });
        }
        self.records.borrow_mut().push(record.clone());
        Ok(())
    }
}

pub struct RecordingNotifier {
    pub sent: RefCell<Vec<Notification>>,
    pub failing: Cell<bool>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self {
            sent: RefCell::new(Vec::new()),
            failing: Cell::new(false),
        }
    }

    pub fn kinds(&self) -> Vec<NotificationKind> {
        self.sent.borrow().iter().map(|n| n.kind).collect()
    }
}

impl NotifierPort for RecordingNotifier {
    fn notify(&self, notification: &Notification) -> Result<(), EngineError> {
        if self.failing.get() {
            return Err(EngineError::Notification {
                reason: "bot unreachable".to_string(),
            });
        }
        self.sent.borrow_mut().push(notification.clone());
        Ok(())
    }
}

pub fn session_start() -> NaiveDateTime {
    at(9, 15)
}

/// 2024-03-04 at `hour:minute`.
pub fn at(hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 4)
        .unwrap()
        .and_hms_opt(hour, minute, 0)
        .unwrap()
}

pub fn make_bar(timestamp: NaiveDateTime, close: f64) -> Bar {
    Bar {
        timestamp,
        open: close,
        high: close,
        low: close,
        close,
        volume: 1_000,
    }
}

/// Five-minute bars starting at the session open.
pub fn bars_from_closes(closes: &[f64]) -> Vec<Bar> {
    bars_from_closes_at(session_start(), closes)
}

pub fn bars_from_closes_at(start: NaiveDateTime, closes: &[f64]) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| make_bar(start + Duration::minutes(5 * i as i64), c))
        .collect()
}

/// fast=2 slow=4, 1% stop, 2% target, 100k capital risking 2%.
pub fn test_config(symbols: &[&str]) -> EngineConfig {
    let mut config = EngineConfig::default();
    config.strategy.fast_period = 2;
    config.strategy.slow_period = 4;
    config.strategy.stop_loss_pct = 0.01;
    config.strategy.take_profit_pct = 0.02;
    config.risk.capital = 100_000.0;
    config.risk.risk_fraction = 0.02;
    config.risk.max_concurrent_positions = 3;
    config.risk.daily_loss_limit_fraction = 0.05;
    config.risk.min_quantity_policy = MinQuantityPolicy::Reject;
    config.watchlist = symbols.iter().map(|s| s.to_string()).collect();
    config.trades_file = None;
    config
}
