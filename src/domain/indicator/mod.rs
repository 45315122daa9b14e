//! Technical indicators used by the crossover strategy.
//!
//! - `ema`: exponential moving average over a close series
//! - `IndicatorPair`: fast/slow EMA values sampled at one bar index

pub mod ema;

use crate::domain::error::EngineError;

pub use ema::compute_ema;

/// Fast and slow EMA values at a single bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorPair {
    pub fast: f64,
    pub slow: f64,
}

impl IndicatorPair {
    pub fn spread(&self) -> f64 {
        self.fast - self.slow
    }
}

/// Fast/slow EMA sequences over the same close series.
#[derive(Debug, Clone)]
pub struct EmaPairSeries {
    pub fast: Vec<Option<f64>>,
    pub slow: Vec<Option<f64>>,
}

impl EmaPairSeries {
    pub fn compute(closes: &[f64], fast_period: usize, slow_period: usize) -> Result<Self, EngineError> {
        Ok(Self {
            fast: compute_ema(closes, fast_period)?,
            slow: compute_ema(closes, slow_period)?,
        })
    }

    pub fn len(&self) -> usize {
        self.fast.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fast.is_empty()
    }

    /// Pair at `index`, present only when both EMAs are defined there.
    pub fn pair_at(&self, index: usize) -> Option<IndicatorPair> {
        let fast = (*self.fast.get(index)?)?;
        let slow = (*self.slow.get(index)?)?;
        Some(IndicatorPair { fast, slow })
    }

    /// The last two defined pairs as (previous, current).
    pub fn trailing_pairs(&self) -> Option<(IndicatorPair, IndicatorPair)> {
        let n = self.len();
        if n < 2 {
            return None;
        }
        Some((self.pair_at(n - 2)?, self.pair_at(n - 1)?))
    }
}
