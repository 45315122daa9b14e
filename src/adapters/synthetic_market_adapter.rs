//! Synthetic market data for mock trading.
//!
//! Each symbol gets a seeded random walk. The first fetch backfills
//! `lookback` bars ending at the anchor time; every later fetch appends one
//! new bar, as if a bar closed between scans. Not suitable for real
//! trading decisions.

use chrono::{Duration, NaiveDateTime};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::cell::RefCell;
use std::collections::HashMap;

use tracing::debug;

use crate::domain::bar::Bar;
use crate::domain::error::EngineError;
use crate::ports::market_data_port::MarketDataPort;

struct Walk {
    rng: StdRng,
    price: f64,
    bars: Vec<Bar>,
}

pub struct SyntheticMarketAdapter {
    seed: u64,
    anchor: NaiveDateTime,
    walks: RefCell<HashMap<String, Walk>>,
}

impl SyntheticMarketAdapter {
    pub fn new(seed: u64, anchor: NaiveDateTime) -> Self {
        Self {
            seed,
            anchor,
            walks: RefCell::new(HashMap::new()),
        }
    }

    fn symbol_seed(&self, symbol: &str) -> u64 {
        symbol
            .bytes()
            .fold(self.seed, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64))
    }
}

impl Walk {
    fn new(seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let price = rng.gen_range(100.0..500.0);
        Self {
            rng,
            price,
            bars: Vec::new(),
        }
    }

    fn step(&mut self, timestamp: NaiveDateTime) -> Bar {
        self.price = (self.price + self.rng.gen_range(-1.0..1.0)).max(1.0);
        let open = self.price + self.rng.gen_range(-0.5..0.5);
        let close = self.price + self.rng.gen_range(-0.5..0.5);
        let high = open.max(close) + self.rng.gen_range(0.0..0.3);
        let low = open.min(close) - self.rng.gen_range(0.0..0.3);
        Bar {
            timestamp,
            open: round2(open),
            high: round2(high),
            low: round2(low),
            close: round2(close),
            volume: self.rng.gen_range(1_000..10_000),
        }
    }
}

impl MarketDataPort for SyntheticMarketAdapter {
    fn fetch_bars(&self, symbol: &str, interval: &str, lookback: usize) -> Result<Vec<Bar>, EngineError> {
        let step = Duration::minutes(interval_minutes(interval));
        let mut walks = self.walks.borrow_mut();
        let walk = walks
            .entry(symbol.to_string())
            .or_insert_with(|| Walk::new(self.symbol_seed(symbol)));

        if walk.bars.is_empty() {
            let backfill = lookback.max(1) as i32;
            for i in (0..backfill).rev() {
                let bar = walk.step(self.anchor - step * i);
                walk.bars.push(bar);
            }
            debug!(symbol, bars = walk.bars.len(), "backfilled synthetic bars");
        } else if let Some(last) = walk.bars.last().map(|b| b.timestamp) {
            let bar = walk.step(last + step);
            walk.bars.push(bar);
        }

        let start = walk.bars.len().saturating_sub(lookback);
        Ok(walk.bars[start..].to_vec())
    }
}

/// "5minute" -> 5, "minute" -> 1, "15minute" -> 15; unknown -> 5.
pub fn interval_minutes(interval: &str) -> i64 {
    let digits: String = interval.chars().take_while(|c| c.is_ascii_digit()).collect();
    let rest = &interval[digits.len()..];
    match (digits.parse::<i64>(), rest) {
        (Ok(n), "minute") if n > 0 => n,
        (Err(_), "minute") => 1,
        _ => 5,
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
