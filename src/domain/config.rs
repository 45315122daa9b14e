//! Engine configuration.
//!
//! Built once at startup from a [`ConfigPort`] and handed to each component
//! by reference. Nothing reads configuration after construction.

use chrono::NaiveTime;
use std::path::PathBuf;
use std::time::Duration;

use super::error::EngineError;
use crate::ports::config_port::ConfigPort;

pub const DEFAULT_WATCHLIST: [&str; 5] = ["RELIANCE", "TCS", "HDFC", "ICICIBANK", "INFY"];

/// What to do when a valid signal sizes to less than one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MinQuantityPolicy {
    FloorToOne,
    Reject,
}

impl MinQuantityPolicy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "floor_to_one" | "floor" => Some(Self::FloorToOne),
            "reject" => Some(Self::Reject),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StrategyParams {
    pub fast_period: usize,
    pub slow_period: usize,
    pub stop_loss_pct: f64,
    pub take_profit_pct: f64,
}

impl Default for StrategyParams {
    fn default() -> Self {
        StrategyParams {
            fast_period: 9,
            slow_period: 21,
            stop_loss_pct: 0.01,
            take_profit_pct: 0.02,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RiskParams {
    pub capital: f64,
    pub risk_fraction: f64,
    pub max_concurrent_positions: usize,
    pub daily_loss_limit_fraction: f64,
    pub min_quantity_policy: MinQuantityPolicy,
}

impl Default for RiskParams {
    fn default() -> Self {
        RiskParams {
            capital: 50_000.0,
            risk_fraction: 0.02,
            max_concurrent_positions: 3,
            daily_loss_limit_fraction: 0.05,
            min_quantity_policy: MinQuantityPolicy::Reject,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionParams {
    pub open: NaiveTime,
    pub close: NaiveTime,
    pub force_exit: NaiveTime,
    pub scan_interval: Duration,
    pub poll_interval: Duration,
    pub ignore_hours: bool,
}

impl Default for SessionParams {
    fn default() -> Self {
        SessionParams {
            open: hm(9, 15),
            close: hm(15, 30),
            force_exit: hm(15, 15),
            scan_interval: Duration::from_secs(5 * 60),
            poll_interval: Duration::from_secs(30),
            ignore_hours: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataParams {
    pub bar_interval: String,
    pub lookback: usize,
    pub dir: Option<PathBuf>,
    pub seed: u64,
}

impl Default for DataParams {
    fn default() -> Self {
        DataParams {
            bar_interval: "5minute".to_string(),
            lookback: 100,
            dir: None,
            seed: 7,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub strategy: StrategyParams,
    pub risk: RiskParams,
    pub session: SessionParams,
    pub data: DataParams,
    pub watchlist: Vec<String>,
    pub mock_trading: bool,
    pub trades_file: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            strategy: StrategyParams::default(),
            risk: RiskParams::default(),
            session: SessionParams::default(),
            data: DataParams::default(),
            watchlist: DEFAULT_WATCHLIST.iter().map(|s| s.to_string()).collect(),
            mock_trading: true,
            trades_file: Some(PathBuf::from("logs/trades.csv")),
        }
    }
}

impl EngineConfig {
    /// Build from INI sections, falling back to defaults for absent keys.
    /// Values that are present but malformed are errors.
    pub fn from_port(port: &dyn ConfigPort) -> Result<Self, EngineError> {
        let defaults = EngineConfig::default();

        let strategy = StrategyParams {
            fast_period: get_usize(port, "strategy", "fast_period", defaults.strategy.fast_period)?,
            slow_period: get_usize(port, "strategy", "slow_period", defaults.strategy.slow_period)?,
            stop_loss_pct: get_f64(port, "strategy", "stop_loss_pct", defaults.strategy.stop_loss_pct)?,
            take_profit_pct: get_f64(
                port,
                "strategy",
                "take_profit_pct",
                defaults.strategy.take_profit_pct,
            )?,
        };

        let min_quantity_policy = match port.get_string("risk", "min_quantity_policy") {
            None => defaults.risk.min_quantity_policy,
            Some(raw) => MinQuantityPolicy::parse(&raw).ok_or_else(|| {
                EngineError::config_invalid(
                    "risk",
                    "min_quantity_policy",
                    format!("expected floor_to_one or reject, got {raw:?}"),
                )
            })?,
        };

        let risk = RiskParams {
            capital: get_f64(port, "risk", "capital", defaults.risk.capital)?,
            risk_fraction: get_f64(port, "risk", "risk_per_trade", defaults.risk.risk_fraction)?,
            max_concurrent_positions: get_usize(
                port,
                "risk",
                "max_positions",
                defaults.risk.max_concurrent_positions,
            )?,
            daily_loss_limit_fraction: get_f64(
                port,
                "risk",
                "daily_loss_limit",
                defaults.risk.daily_loss_limit_fraction,
            )?,
            min_quantity_policy,
        };

        let session = SessionParams {
            open: get_time(port, "session", "open", defaults.session.open)?,
            close: get_time(port, "session", "close", defaults.session.close)?,
            force_exit: get_time(port, "session", "force_exit", defaults.session.force_exit)?,
            scan_interval: Duration::from_secs(get_u64(
                port,
                "session",
                "scan_interval_secs",
                defaults.session.scan_interval.as_secs(),
            )?),
            poll_interval: Duration::from_secs(get_u64(
                port,
                "session",
                "poll_interval_secs",
                defaults.session.poll_interval.as_secs(),
            )?),
            ignore_hours: get_flag(port, "session", "ignore_hours", defaults.session.ignore_hours)?,
        };

        let data = DataParams {
            bar_interval: port
                .get_string("data", "interval")
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(defaults.data.bar_interval),
            lookback: get_usize(port, "data", "lookback", defaults.data.lookback)?,
            dir: port
                .get_string("data", "dir")
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
            seed: get_u64(port, "data", "seed", defaults.data.seed)?,
        };

        let watchlist = match port.get_string("watchlist", "symbols") {
            Some(raw) => parse_watchlist(&raw),
            None => defaults.watchlist,
        };

        let trades_file = match port.get_string("journal", "trades_file") {
            Some(raw) if raw.trim().is_empty() => None,
            Some(raw) => Some(PathBuf::from(raw.trim())),
            None => defaults.trades_file,
        };

        Ok(EngineConfig {
            strategy,
            risk,
            session,
            data,
            watchlist,
            mock_trading: get_flag(port, "session", "mock_trading", defaults.mock_trading)?,
            trades_file,
        })
    }
}

/// Split a comma-separated symbol list, trimming, upper-casing and de-duplicating.
pub fn parse_watchlist(raw: &str) -> Vec<String> {
    let mut symbols: Vec<String> = Vec::new();
    for symbol in raw.split(',').map(|s| s.trim().to_uppercase()) {
        if !symbol.is_empty() && !symbols.contains(&symbol) {
            symbols.push(symbol);
        }
    }
    symbols
}

pub fn parse_time(value: &str) -> Option<NaiveTime> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .ok()
}

pub fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

fn hm(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN)
}

fn get_time(
    port: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: NaiveTime,
) -> Result<NaiveTime, EngineError> {
    match port.get_string(section, key) {
        None => Ok(default),
        Some(raw) => parse_time(&raw).ok_or_else(|| {
            EngineError::config_invalid(section, key, format!("invalid time {raw:?}, expected HH:MM"))
        }),
    }
}

fn get_u64(port: &dyn ConfigPort, section: &str, key: &str, default: u64) -> Result<u64, EngineError> {
    match port.get_string(section, key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
            EngineError::config_invalid(section, key, format!("expected a non-negative integer, got {raw:?}"))
        }),
    }
}

fn get_f64(port: &dyn ConfigPort, section: &str, key: &str, default: f64) -> Result<f64, EngineError> {
    match port.get_string(section, key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| EngineError::config_invalid(section, key, format!("expected a number, got {raw:?}"))),
    }
}

fn get_flag(port: &dyn ConfigPort, section: &str, key: &str, default: bool) -> Result<bool, EngineError> {
    match port.get_string(section, key) {
        None => Ok(default),
        Some(raw) => parse_flag(&raw).ok_or_else(|| {
            EngineError::config_invalid(section, key, format!("expected true or false, got {raw:?}"))
        }),
    }
}

fn get_usize(
    port: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: usize,
) -> Result<usize, EngineError> {
    get_u64(port, section, key, default as u64).map(|v| v as usize)
}
