//! Configuration validation.
//!
//! Runs once at startup. Any error here is fatal to the process.

use crate::domain::config::EngineConfig;
use crate::domain::error::EngineError;

pub fn validate_engine_config(config: &EngineConfig) -> Result<(), EngineError> {
    validate_periods(config)?;
    validate_exit_thresholds(config)?;
    validate_capital(config)?;
    validate_risk_fraction(config)?;
    validate_max_positions(config)?;
    validate_daily_loss_limit(config)?;
    validate_session_times(config)?;
    validate_intervals(config)?;
    validate_watchlist(config)?;
    validate_lookback(config)?;
    Ok(())
}

fn validate_periods(config: &EngineConfig) -> Result<(), EngineError> {
    let s = &config.strategy;
    if s.fast_period == 0 {
        return Err(EngineError::config_invalid(
            "strategy",
            "fast_period",
            "fast_period must be at least 1",
        ));
    }
    if s.fast_period >= s.slow_period {
        return Err(EngineError::config_invalid(
            "strategy",
            "slow_period",
            "slow_period must be greater than fast_period",
        ));
    }
    Ok(())
}

fn validate_exit_thresholds(config: &EngineConfig) -> Result<(), EngineError> {
    let s = &config.strategy;
    if !(0.0..1.0).contains(&s.stop_loss_pct) || s.stop_loss_pct == 0.0 {
        return Err(EngineError::config_invalid(
            "strategy",
            "stop_loss_pct",
            "stop_loss_pct must be between 0 and 1 (exclusive)",
        ));
    }
    if s.take_profit_pct < 0.0 || !s.take_profit_pct.is_finite() {
        return Err(EngineError::config_invalid(
            "strategy",
            "take_profit_pct",
            "take_profit_pct must be non-negative",
        ));
    }
    Ok(())
}

fn validate_capital(config: &EngineConfig) -> Result<(), EngineError> {
    let value = config.risk.capital;
    if value <= 0.0 || !value.is_finite() {
        return Err(EngineError::config_invalid(
            "risk",
            "capital",
            "capital must be positive",
        ));
    }
    Ok(())
}

fn validate_risk_fraction(config: &EngineConfig) -> Result<(), EngineError> {
    let value = config.risk.risk_fraction;
    if value <= 0.0 || value > 1.0 {
        return Err(EngineError::config_invalid(
            "risk",
            "risk_per_trade",
            "risk_per_trade must be in (0, 1]",
        ));
    }
    Ok(())
}

fn validate_max_positions(config: &EngineConfig) -> Result<(), EngineError> {
    if config.risk.max_concurrent_positions < 1 {
        return Err(EngineError::config_invalid(
            "risk",
            "max_positions",
            "max_positions must be at least 1",
        ));
    }
    Ok(())
}

fn validate_daily_loss_limit(config: &EngineConfig) -> Result<(), EngineError> {
    let value = config.risk.daily_loss_limit_fraction;
    if value <= 0.0 || value > 1.0 {
        return Err(EngineError::config_invalid(
            "risk",
            "daily_loss_limit",
            "daily_loss_limit must be in (0, 1]",
        ));
    }
    Ok(())
}

fn validate_session_times(config: &EngineConfig) -> Result<(), EngineError> {
    let s = &config.session;
    if s.open >= s.close {
        return Err(EngineError::config_invalid(
            "session",
            "open",
            "session open must be before close",
        ));
    }
    if s.force_exit <= s.open || s.force_exit >= s.close {
        return Err(EngineError::config_invalid(
            "session",
            "force_exit",
            "force_exit must fall strictly between open and close",
        ));
    }
    Ok(())
}

fn validate_intervals(config: &EngineConfig) -> Result<(), EngineError> {
    if config.session.scan_interval.is_zero() {
        return Err(EngineError::config_invalid(
            "session",
            "scan_interval_secs",
            "scan_interval_secs must be positive",
        ));
    }
    if config.session.poll_interval.is_zero() {
        return Err(EngineError::config_invalid(
            "session",
            "poll_interval_secs",
            "poll_interval_secs must be positive",
        ));
    }
    Ok(())
}

fn validate_watchlist(config: &EngineConfig) -> Result<(), EngineError> {
    if config.watchlist.is_empty() {
        return Err(EngineError::ConfigMissing {
            section: "watchlist".to_string(),
            key: "symbols".to_string(),
        });
    }
    Ok(())
}

fn validate_lookback(config: &EngineConfig) -> Result<(), EngineError> {
    let need = config.strategy.slow_period + 1;
    if config.data.lookback < need {
        return Err(EngineError::config_invalid(
            "data",
            "lookback",
            format!("lookback must be at least slow_period + 1 ({need})"),
        ));
    }
    Ok(())
}
