//! Execution coordinator: the per-symbol position state machine.
//!
//! ```text
//! Flat -> PendingEntry -> Open -> PendingExit -> Flat
//! ```
//!
//! `Pending*` last only for the order round trip. The ledger changes only
//! after a confirmed fill; a failed submission leaves it exactly as it was
//! and the symbol is retried on the next cycle. One symbol's failure never
//! stops the rest of the watchlist.

use chrono::NaiveDateTime;
use std::collections::HashMap;
use std::fmt;

use tracing::{debug, error, info, warn};

use super::bar::Bar;
use super::config::{EngineConfig, StrategyParams};
use super::error::EngineError;
use super::events::{Notification, NotificationKind, TradeRecord, TradeStatus};
use super::ledger::PositionLedger;
use super::order::{OrderRequest, OrderSide};
use super::position::ClosedTrade;
use super::risk::{RiskBlock, RiskSizer};
use super::signal::{Detection, Signal, SignalAction, SignalDetector, SignalReason};
use crate::ports::market_data_port::MarketDataPort;
use crate::ports::notifier_port::NotifierPort;
use crate::ports::order_port::OrderPort;
use crate::ports::trade_record_port::TradeRecordPort;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolState {
    Flat,
    PendingEntry,
    Open,
    PendingExit,
}

impl fmt::Display for SymbolState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flat => write!(f, "FLAT"),
            Self::PendingEntry => write!(f, "PENDING_ENTRY"),
            Self::Open => write!(f, "OPEN"),
            Self::PendingExit => write!(f, "PENDING_EXIT"),
        }
    }
}

/// Why a symbol produced no trade this cycle without anything going wrong.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    NoData,
    InsufficientHistory { have: usize, need: usize },
    RiskLimit(RiskBlock),
}

/// Result of processing one symbol in one cycle: Ok / Skip / Fail.
#[derive(Debug, Clone, PartialEq)]
pub enum SymbolOutcome {
    Entered { quantity: u64, fill_price: f64 },
    Exited(ClosedTrade),
    Idle,
    Skipped(SkipReason),
    Failed(EngineError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub at: NaiveDateTime,
    pub outcomes: Vec<(String, SymbolOutcome)>,
}

impl CycleReport {
    fn new(at: NaiveDateTime) -> Self {
        Self {
            at,
            outcomes: Vec::new(),
        }
    }

    pub fn outcome(&self, symbol: &str) -> Option<&SymbolOutcome> {
        self.outcomes
            .iter()
            .find(|(s, _)| s == symbol)
            .map(|(_, o)| o)
    }

    pub fn entries(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, SymbolOutcome::Entered { .. }))
            .count()
    }

    pub fn exits(&self) -> Vec<&ClosedTrade> {
        self.outcomes
            .iter()
            .filter_map(|(_, o)| match o {
                SymbolOutcome::Exited(trade) => Some(trade),
                _ => None,
            })
            .collect()
    }

    pub fn failures(&self) -> Vec<(&str, &EngineError)> {
        self.outcomes
            .iter()
            .filter_map(|(s, o)| match o {
                SymbolOutcome::Failed(err) => Some((s.as_str(), err)),
                _ => None,
            })
            .collect()
    }
}

/// External collaborators the coordinator drives.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub market: &'a dyn MarketDataPort,
    pub orders: &'a dyn OrderPort,
    pub journal: &'a dyn TradeRecordPort,
    pub notifier: &'a dyn NotifierPort,
}

pub struct ExecutionCoordinator<'a> {
    strategy: StrategyParams,
    watchlist: Vec<String>,
    bar_interval: String,
    lookback: usize,
    detector: SignalDetector,
    ledger: PositionLedger,
    risk: RiskSizer,
    pending: HashMap<String, SymbolState>,
    last_prices: HashMap<String, f64>,
    ports: Collaborators<'a>,
}

impl<'a> ExecutionCoordinator<'a> {
    pub fn new(config: &EngineConfig, ports: Collaborators<'a>) -> Result<Self, EngineError> {
        let detector = SignalDetector::new(config.strategy.fast_period, config.strategy.slow_period)?;
        Ok(Self {
            strategy: config.strategy.clone(),
            watchlist: config.watchlist.clone(),
            bar_interval: config.data.bar_interval.clone(),
            lookback: config.data.lookback,
            detector,
            ledger: PositionLedger::new(),
            risk: RiskSizer::new(&config.risk),
            pending: HashMap::new(),
            last_prices: HashMap::new(),
            ports,
        })
    }

    pub fn ledger(&self) -> &PositionLedger {
        &self.ledger
    }

    pub fn risk(&self) -> &RiskSizer {
        &self.risk
    }

    pub fn watchlist(&self) -> &[String] {
        &self.watchlist
    }

    pub fn symbol_state(&self, symbol: &str) -> SymbolState {
        if let Some(state) = self.pending.get(symbol) {
            return *state;
        }
        if self.ledger.contains(symbol) {
            SymbolState::Open
        } else {
            SymbolState::Flat
        }
    }

    /// Start-of-session hook: clears the day's realised pnl.
    pub fn reset_session(&mut self) {
        self.risk.reset_session();
        info!(open_positions = self.ledger.count(), "session reset");
    }

    pub fn scan_cycle(&mut self, now: NaiveDateTime) -> CycleReport {
        info!(symbols = self.watchlist.len(), open = self.ledger.count(), "scanning watchlist");
        let mut report = CycleReport::new(now);
        let watchlist = self.watchlist.clone();

        for symbol in watchlist {
            let outcome = self.process_symbol(&symbol, now);
            log_outcome(&symbol, &outcome);
            report.outcomes.push((symbol, outcome));
        }

        report
    }

    /// Liquidate every open position regardless of indicator state.
    pub fn force_exit_all(&mut self, now: NaiveDateTime) -> CycleReport {
        let symbols = self.ledger.symbols();
        info!(positions = symbols.len(), "force exiting all positions");
        let mut report = CycleReport::new(now);

        for symbol in symbols {
            let price = self.exit_reference_price(&symbol);
            let outcome = self.execute_exit(Signal::exit(&symbol, price, SignalReason::ForceExit), now);
            log_outcome(&symbol, &outcome);
            report.outcomes.push((symbol, outcome));
        }

        if !report.outcomes.is_empty() {
            let closed = report.exits().len();
            self.notify(Notification::new(
                NotificationKind::SessionFlattened,
                format!(
                    "force exit closed {closed}/{} positions, day pnl {:.2}",
                    report.outcomes.len(),
                    self.risk.realized_pnl_today()
                ),
            ));
        }
        report
    }

    /// Send a free-form notification (startup, shutdown).
    pub fn announce(&self, kind: NotificationKind, message: &str) {
        self.notify(Notification::new(kind, message));
    }

    fn process_symbol(&mut self, symbol: &str, now: NaiveDateTime) -> SymbolOutcome {
        let bars = match self.fetch(symbol) {
            Ok(Some(bars)) => bars,
            Ok(None) => return SymbolOutcome::Skipped(SkipReason::NoData),
            Err(err) => return SymbolOutcome::Failed(err),
        };
        let price = bars[bars.len() - 1].close;
        self.last_prices.insert(symbol.to_string(), price);

        if let Some(position) = self.ledger.get(symbol) {
            let reason = position.protective_exit(
                price,
                self.strategy.stop_loss_pct,
                self.strategy.take_profit_pct,
            );
            if let Some(reason) = reason {
                return self.execute_exit(Signal::exit(symbol, price, reason), now);
            }
        }

        let position_exists = self.ledger.contains(symbol);
        match self.detector.evaluate(symbol, &bars, position_exists) {
            Detection::Signal(signal) => match signal.action {
                SignalAction::EnterLong => self.execute_entry(signal, now),
                SignalAction::Exit => self.execute_exit(signal, now),
            },
            Detection::NoSignal => SymbolOutcome::Idle,
            Detection::InsufficientHistory { have, need } => {
                SymbolOutcome::Skipped(SkipReason::InsufficientHistory { have, need })
            }
        }
    }

    fn fetch(&self, symbol: &str) -> Result<Option<Vec<Bar>>, EngineError> {
        let bars = self
            .ports
            .market
            .fetch_bars(symbol, &self.bar_interval, self.lookback)?;
        if bars.is_empty() {
            Ok(None)
        } else {
            Ok(Some(bars))
        }
    }

    fn execute_entry(&mut self, signal: Signal, now: NaiveDateTime) -> SymbolOutcome {
        let symbol = signal.symbol.as_str();

        if let Err(block) = self
            .risk
            .check_entry(self.ledger.count(), self.risk.realized_pnl_today())
        {
            return SymbolOutcome::Skipped(SkipReason::RiskLimit(block));
        }

        let stop_price = signal.price * (1.0 - self.strategy.stop_loss_pct);
        let quantity = match self.risk.size_order(symbol, signal.price, stop_price) {
            Ok(q) => q,
            Err(err) => return SymbolOutcome::Failed(err),
        };

        let request = OrderRequest::market(symbol, OrderSide::Buy, quantity, signal.price);
        self.pending.insert(symbol.to_string(), SymbolState::PendingEntry);
        let result = self.ports.orders.submit_order(&request);
        self.pending.remove(symbol);

        let confirmation = match result {
            Ok(c) => c,
            Err(err) => {
                self.record_failure(&request, signal.reason, now, &err);
                return SymbolOutcome::Failed(err);
            }
        };

        if let Err(err) = self
            .ledger
            .open(symbol, confirmation.fill_price, confirmation.quantity, now)
        {
            error!(symbol, error = %err, "ledger rejected confirmed entry");
            return SymbolOutcome::Failed(err);
        }

        let record = TradeRecord {
            timestamp: now,
            symbol: symbol.to_string(),
            action: OrderSide::Buy,
            quantity: confirmation.quantity,
            price: confirmation.fill_price,
            reason: signal.reason,
            pnl: 0.0,
            status: TradeStatus::Executed,
        };
        self.journal(&record);
        self.notify(Notification::trade(&record));

        SymbolOutcome::Entered {
            quantity: confirmation.quantity,
            fill_price: confirmation.fill_price,
        }
    }

    fn execute_exit(&mut self, signal: Signal, now: NaiveDateTime) -> SymbolOutcome {
        let symbol = signal.symbol.as_str();
        let Some(quantity) = self.ledger.get(symbol).map(|p| p.quantity) else {
            let err = EngineError::NoSuchPosition {
                symbol: symbol.to_string(),
            };
            error!(symbol, error = %err, "exit requested without a position");
            return SymbolOutcome::Failed(err);
        };

        let request = OrderRequest::market(symbol, OrderSide::Sell, quantity, signal.price);
        self.pending.insert(symbol.to_string(), SymbolState::PendingExit);
        let result = self.ports.orders.submit_order(&request);
        self.pending.remove(symbol);

        let confirmation = match result {
            Ok(c) => c,
            Err(err) => {
                self.record_failure(&request, signal.reason, now, &err);
                return SymbolOutcome::Failed(err);
            }
        };

        let position = match self.ledger.close(symbol) {
            Ok(p) => p,
            Err(err) => {
                error!(symbol, error = %err, "ledger rejected confirmed exit");
                return SymbolOutcome::Failed(err);
            }
        };
        let trade = position.into_closed(confirmation.fill_price, now, signal.reason);
        self.risk.record_closed_trade_pnl(trade.pnl);

        let record = TradeRecord {
            timestamp: now,
            symbol: symbol.to_string(),
            action: OrderSide::Sell,
            quantity: trade.quantity,
            price: trade.exit_price,
            reason: trade.reason,
            pnl: trade.pnl,
            status: TradeStatus::Executed,
        };
        self.journal(&record);
        self.notify(Notification::trade(&record));

        SymbolOutcome::Exited(trade)
    }

    fn exit_reference_price(&mut self, symbol: &str) -> f64 {
        match self.ports.market.latest_price(symbol, &self.bar_interval) {
            Ok(price) => {
                self.last_prices.insert(symbol.to_string(), price);
                price
            }
            Err(err) => {
                let fallback = self
                    .last_prices
                    .get(symbol)
                    .copied()
                    .or_else(|| self.ledger.get(symbol).map(|p| p.entry_price))
                    .unwrap_or(0.0);
                warn!(symbol, error = %err, fallback, "no live price for force exit");
                fallback
            }
        }
    }

    fn record_failure(
        &self,
        request: &OrderRequest,
        reason: SignalReason,
        now: NaiveDateTime,
        err: &EngineError,
    ) {
        warn!(
            symbol = %request.symbol,
            side = %request.side,
            quantity = request.quantity,
            error = %err,
            "order failed, ledger unchanged"
        );
        self.journal(&TradeRecord {
            timestamp: now,
            symbol: request.symbol.clone(),
            action: request.side,
            quantity: request.quantity,
            price: request.reference_price,
            reason,
            pnl: 0.0,
            status: TradeStatus::Failed,
        });
        self.notify(Notification::new(
            NotificationKind::OrderFailed,
            format!("{} {} {} failed: {err}", request.side, request.quantity, request.symbol),
        ));
    }

    fn journal(&self, record: &TradeRecord) {
        if let Err(err) = self.ports.journal.record_trade(record) {
            warn!(symbol = %record.symbol, error = %err, "failed to record trade");
        }
    }

    fn notify(&self, notification: Notification) {
        if let Err(err) = self.ports.notifier.notify(&notification) {
            warn!(kind = %notification.kind, error = %err, "notification dropped");
        }
    }
}

fn log_outcome(symbol: &str, outcome: &SymbolOutcome) {
    match outcome {
        SymbolOutcome::Entered {
            quantity,
            fill_price,
        } => info!(symbol, quantity, fill_price, "entered long"),
        SymbolOutcome::Exited(trade) => info!(
            symbol,
            quantity = trade.quantity,
            exit_price = trade.exit_price,
            pnl = trade.pnl,
            reason = %trade.reason,
            "position closed"
        ),
        SymbolOutcome::Idle => debug!(symbol, "no signal"),
        SymbolOutcome::Skipped(SkipReason::NoData) => warn!(symbol, "no data"),
        SymbolOutcome::Skipped(SkipReason::InsufficientHistory { have, need }) => {
            debug!(symbol, have, need, "insufficient history")
        }
        SymbolOutcome::Skipped(SkipReason::RiskLimit(block)) => {
            info!(symbol, %block, "cannot take position - risk limits")
        }
        SymbolOutcome::Failed(err) if err.is_invariant_violation() => {
            error!(symbol, error = %err, "ledger invariant violated")
        }
        SymbolOutcome::Failed(err) => warn!(
            symbol,
            error = %err,
            retryable = err.is_retryable(),
            "symbol failed this cycle"
        ),
    }
}
