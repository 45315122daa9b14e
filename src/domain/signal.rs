//! EMA crossover signal detection.
//!
//! A signal fires only on the bar where the fast EMA crosses the slow EMA.
//! The previous pair is compared with `<=`/`>=` and the current pair with
//! strict `>`/`<`, so a cross is reported once and never repeated while the
//! averages stay apart.

use std::fmt;

use crate::domain::bar::{closes, Bar};
use crate::domain::error::EngineError;
use crate::domain::indicator::{EmaPairSeries, IndicatorPair};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalAction {
    EnterLong,
    Exit,
}

impl fmt::Display for SignalAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EnterLong => write!(f, "BUY"),
            Self::Exit => write!(f, "SELL"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalReason {
    CrossoverUp,
    CrossoverDown,
    StopLoss,
    TakeProfit,
    ForceExit,
}

impl fmt::Display for SignalReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CrossoverUp => write!(f, "EMA Bullish Crossover"),
            Self::CrossoverDown => write!(f, "EMA Bearish Crossover"),
            Self::StopLoss => write!(f, "Stop Loss"),
            Self::TakeProfit => write!(f, "Take Profit"),
            Self::ForceExit => write!(f, "Force Exit - Market Close"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    pub symbol: String,
    pub action: SignalAction,
    pub price: f64,
    pub reason: SignalReason,
}

impl Signal {
    pub fn exit(symbol: &str, price: f64, reason: SignalReason) -> Self {
        Signal {
            symbol: symbol.to_string(),
            action: SignalAction::Exit,
            price,
            reason,
        }
    }
}

/// Result of evaluating one symbol's bars.
#[derive(Debug, Clone, PartialEq)]
pub enum Detection {
    Signal(Signal),
    NoSignal,
    InsufficientHistory { have: usize, need: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalDetector {
    fast_period: usize,
    slow_period: usize,
}

impl SignalDetector {
    pub fn new(fast_period: usize, slow_period: usize) -> Result<Self, EngineError> {
        if fast_period == 0 {
            return Err(EngineError::invalid_parameter(
                "fast_period",
                "must be positive",
            ));
        }
        if fast_period >= slow_period {
            return Err(EngineError::invalid_parameter(
                "fast_period",
                format!("must be below slow_period ({fast_period} >= {slow_period})"),
            ));
        }
        Ok(Self {
            fast_period,
            slow_period,
        })
    }

    pub fn fast_period(&self) -> usize {
        self.fast_period
    }

    pub fn slow_period(&self) -> usize {
        self.slow_period
    }

    /// Bars needed before two trailing indicator pairs are defined.
    pub fn required_bars(&self) -> usize {
        self.slow_period + 1
    }

    pub fn detect(&self, symbol: &str, bars: &[Bar], position_exists: bool) -> Option<Signal> {
        match self.evaluate(symbol, bars, position_exists) {
            Detection::Signal(signal) => Some(signal),
            Detection::NoSignal | Detection::InsufficientHistory { .. } => None,
        }
    }

    pub fn evaluate(&self, symbol: &str, bars: &[Bar], position_exists: bool) -> Detection {
        let insufficient = Detection::InsufficientHistory {
            have: bars.len(),
            need: self.required_bars(),
        };
        if bars.len() < self.required_bars() {
            return insufficient;
        }

        let series = match EmaPairSeries::compute(&closes(bars), self.fast_period, self.slow_period)
        {
            Ok(s) => s,
            Err(_) => return insufficient,
        };
        let Some((prev, cur)) = series.trailing_pairs() else {
            return insufficient;
        };

        let price = bars[bars.len() - 1].close;
        match classify_cross(prev, cur) {
            Some(SignalReason::CrossoverUp) if !position_exists => Detection::Signal(Signal {
                symbol: symbol.to_string(),
                action: SignalAction::EnterLong,
                price,
                reason: SignalReason::CrossoverUp,
            }),
            Some(SignalReason::CrossoverDown) if position_exists => {
                Detection::Signal(Signal::exit(symbol, price, SignalReason::CrossoverDown))
            }
            _ => Detection::NoSignal,
        }
    }
}

fn classify_cross(prev: IndicatorPair, cur: IndicatorPair) -> Option<SignalReason> {
    if prev.fast <= prev.slow && cur.fast > cur.slow {
        Some(SignalReason::CrossoverUp)
    } else if prev.fast >= prev.slow && cur.fast < cur.slow {
        Some(SignalReason::CrossoverDown)
    } else {
        None
    }
}
