//! Risk budget: order sizing and entry gating.
//!
//! Quantity is `floor(capital * risk_fraction / |entry - stop|)`. Entries are
//! blocked once `max_concurrent_positions` are open or the session's realised
//! loss reaches `capital * daily_loss_limit_fraction`.

use std::fmt;

use tracing::{debug, info};

use super::config::{MinQuantityPolicy, RiskParams};
use super::error::EngineError;

/// Why a new entry was not allowed. A normal outcome, not a fault.
#[derive(Debug, Clone, PartialEq)]
pub enum RiskBlock {
    MaxPositions { open: usize, max: usize },
    DailyLossLimit { realized_pnl: f64, limit: f64 },
}

impl fmt::Display for RiskBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MaxPositions { open, max } => {
                write!(f, "maximum positions reached ({open}/{max})")
            }
            Self::DailyLossLimit {
                realized_pnl,
                limit,
            } => write!(
                f,
                "daily loss limit exceeded (pnl {realized_pnl:.2}, limit -{limit:.2})"
            ),
        }
    }
}

/// Process-wide risk state for one trading session.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskState {
    pub capital: f64,
    pub risk_fraction_per_trade: f64,
    pub max_concurrent_positions: usize,
    pub daily_loss_limit_fraction: f64,
    pub realized_pnl_today: f64,
}

pub fn size_order(
    capital: f64,
    risk_fraction: f64,
    entry_price: f64,
    stop_price: f64,
    policy: MinQuantityPolicy,
) -> Result<u64, EngineError> {
    let risk_amount = capital * risk_fraction;
    let price_gap = (entry_price - stop_price).abs();

    if price_gap == 0.0 || !price_gap.is_finite() {
        return Err(EngineError::ZeroRiskDistance {
            symbol: String::new(),
            entry_price,
            stop_price,
        });
    }

    let quantity = (risk_amount / price_gap).floor();
    if quantity >= 1.0 {
        return Ok(quantity as u64);
    }

    match policy {
        MinQuantityPolicy::FloorToOne => Ok(1),
        MinQuantityPolicy::Reject => Err(EngineError::QuantityBelowMinimum {
            symbol: String::new(),
            risk_amount,
            price_gap,
        }),
    }
}

#[derive(Debug, Clone)]
pub struct RiskSizer {
    state: RiskState,
    policy: MinQuantityPolicy,
}

impl RiskSizer {
    pub fn new(params: &RiskParams) -> Self {
        Self {
            state: RiskState {
                capital: params.capital,
                risk_fraction_per_trade: params.risk_fraction,
                max_concurrent_positions: params.max_concurrent_positions,
                daily_loss_limit_fraction: params.daily_loss_limit_fraction,
                realized_pnl_today: 0.0,
            },
            policy: params.min_quantity_policy,
        }
    }

    pub fn state(&self) -> &RiskState {
        &self.state
    }

    pub fn realized_pnl_today(&self) -> f64 {
        self.state.realized_pnl_today
    }

    /// Loss amount at which new entries stop for the session.
    pub fn daily_loss_limit(&self) -> f64 {
        self.state.capital * self.state.daily_loss_limit_fraction
    }

    /// Size an entry for `symbol`; errors carry the symbol for reporting.
    pub fn size_order(&self, symbol: &str, entry_price: f64, stop_price: f64) -> Result<u64, EngineError> {
        let quantity = size_order(
            self.state.capital,
            self.state.risk_fraction_per_trade,
            entry_price,
            stop_price,
            self.policy,
        )
        .map_err(|err| match err {
            EngineError::ZeroRiskDistance {
                entry_price,
                stop_price,
                ..
            } => EngineError::ZeroRiskDistance {
                symbol: symbol.to_string(),
                entry_price,
                stop_price,
            },
            EngineError::QuantityBelowMinimum {
                risk_amount,
                price_gap,
                ..
            } => EngineError::QuantityBelowMinimum {
                symbol: symbol.to_string(),
                risk_amount,
                price_gap,
            },
            other => other,
        })?;
        info!(symbol, quantity, entry_price, stop_price, "position sized");
        Ok(quantity)
    }

    pub fn check_entry(&self, open_count: usize, daily_pnl: f64) -> Result<(), RiskBlock> {
        if open_count >= self.state.max_concurrent_positions {
            return Err(RiskBlock::MaxPositions {
                open: open_count,
                max: self.state.max_concurrent_positions,
            });
        }
        let limit = self.daily_loss_limit();
        if daily_pnl <= -limit {
            return Err(RiskBlock::DailyLossLimit {
                realized_pnl: daily_pnl,
                limit,
            });
        }
        Ok(())
    }

    pub fn can_enter(&self, open_count: usize, daily_pnl: f64) -> bool {
        self.check_entry(open_count, daily_pnl).is_ok()
    }

    pub fn record_closed_trade_pnl(&mut self, pnl: f64) {
        self.state.realized_pnl_today += pnl;
        info!(pnl, realized_pnl_today = self.state.realized_pnl_today, "daily pnl updated");
    }

    pub fn reset_session(&mut self) {
        debug!(previous = self.state.realized_pnl_today, "resetting session pnl");
        self.state.realized_pnl_today = 0.0;
    }
}
