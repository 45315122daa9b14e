//! Domain error types.

/// Top-level error type for crosstrader.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("position already open for {symbol}")]
    DuplicatePosition { symbol: String },

    #[error("no open position for {symbol}")]
    NoSuchPosition { symbol: String },

    #[error("zero risk distance for {symbol}: entry {entry_price} equals stop {stop_price}")]
    ZeroRiskDistance {
        symbol: String,
        entry_price: f64,
        stop_price: f64,
    },

    #[error("sized quantity for {symbol} is below one unit (risk {risk_amount:.2}, gap {price_gap:.4})")]
    QuantityBelowMinimum {
        symbol: String,
        risk_amount: f64,
        price_gap: f64,
    },

    #[error("market data error for {symbol}: {reason}")]
    MarketData { symbol: String, reason: String },

    #[error("order rejected for {symbol}: {reason}")]
    OrderRejected { symbol: String, reason: String },

    #[error("order timed out for {symbol} after {millis} ms")]
    OrderTimeout { symbol: String, millis: u64 },

    #[error("trade record error: {reason}")]
    TradeRecord { reason: String },

    #[error("notification error: {reason}")]
    Notification { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("io error: {reason}")]
    Io { reason: String },
}

impl EngineError {
    /// External-call failures that may succeed on the next scan cycle.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            EngineError::MarketData { .. }
                | EngineError::OrderRejected { .. }
                | EngineError::OrderTimeout { .. }
        )
    }

    /// Ledger invariant violations. These indicate an orchestration bug.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            EngineError::DuplicatePosition { .. } | EngineError::NoSuchPosition { .. }
        )
    }

    pub fn invalid_parameter(name: &str, reason: impl Into<String>) -> Self {
        EngineError::InvalidParameter {
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    pub fn config_invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        EngineError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        EngineError::Io {
            reason: err.to_string(),
        }
    }
}

impl From<&EngineError> for std::process::ExitCode {
    fn from(err: &EngineError) -> Self {
        let code: u8 = match err {
            EngineError::Io { .. } => 1,
            EngineError::InvalidParameter { .. }
            | EngineError::ConfigParse { .. }
            | EngineError::ConfigMissing { .. }
            | EngineError::ConfigInvalid { .. } => 2,
            EngineError::MarketData { .. } => 3,
            EngineError::OrderRejected { .. }
            | EngineError::OrderTimeout { .. }
            | EngineError::TradeRecord { .. }
            | EngineError::Notification { .. } => 4,
            EngineError::DuplicatePosition { .. }
            | EngineError::NoSuchPosition { .. }
            | EngineError::ZeroRiskDistance { .. }
            | EngineError::QuantityBelowMinimum { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
