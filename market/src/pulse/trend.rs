//! Trend Pulse
//!
//! Tracks a simple moving average over the trailing `ma_len` prices of an
//! asset and reports when the newest price crosses it:
//!
//! ```text
//! crossed-up   : prev < avg && p > avg
//! crossed-down : prev > avg && p < avg
//! ```
//!
//! `avg` and the standard deviation are computed over the same trailing
//! window, which includes the newest price `p`. With fewer than `ma_len`
//! samples the result is Invalid and no crossing is ever reported.

use super::{Pulse, PulseResult, PulseValidity};
use crate::error::MarketError;
use crate::rolling_window::PriceBuffer;
use crate::types::Direction;

pub const DEFAULT_MA_LEN: usize = 20;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Crossing {
    Up,
    Down,
}

impl Crossing {
    /// Raw direction before any configured inversion.
    pub fn direction(self) -> Direction {
        match self {
            Crossing::Up => Direction::Buy,
            Crossing::Down => Direction::Sell,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct TrendConfig {
    pub ma_len: usize,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            ma_len: DEFAULT_MA_LEN,
        }
    }
}

impl TrendConfig {
    pub fn validate(&self) -> Result<(), MarketError> {
        if self.ma_len < 2 {
            return Err(MarketError::InvalidMaLength(self.ma_len));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default)]
pub struct TrendPulseResult {
    /// Newest price.
    pub price: f64,
    /// Price before the newest one.
    pub prev: f64,
    /// Moving average over the trailing window.
    pub avg: f64,
    /// Population standard deviation over the same window.
    pub std_dev: f64,
    pub crossing: Option<Crossing>,
    pub validity: PulseValidity,
}

impl PulseResult for TrendPulseResult {
    fn validity(&self) -> PulseValidity {
        self.validity
    }
}

pub struct TrendPulse {
    cfg: TrendConfig,
}

impl TrendPulse {
    pub fn new(cfg: TrendConfig) -> Self {
        Self { cfg }
    }

    pub fn ma_len(&self) -> usize {
        self.cfg.ma_len
    }
}

impl Pulse for TrendPulse {
    type Output = TrendPulseResult;

    fn evaluate(&self, window: &PriceBuffer) -> TrendPulseResult {
        let (Some(price), Some(prev)) = (window.latest(), window.previous()) else {
            return TrendPulseResult::default();
        };

        let Some(tail) = window.tail(self.cfg.ma_len) else {
            return TrendPulseResult {
                price,
                prev,
                ..Default::default()
            };
        };

        let Some(avg) = mean(&tail) else {
            return TrendPulseResult::default();
        };
        let std_dev = std_dev(&tail, avg);

        TrendPulseResult {
            price,
            prev,
            avg,
            std_dev,
            crossing: detect_crossing(prev, price, avg),
            validity: PulseValidity::Valid,
        }
    }
}

/// Arithmetic mean; `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population standard deviation around `avg`.
pub fn std_dev(values: &[f64], avg: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let var = values.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

/// Crossing of `avg` between two consecutive prices, if any.
pub fn detect_crossing(prev: f64, price: f64, avg: f64) -> Option<Crossing> {
    if !(prev.is_finite() && price.is_finite() && avg.is_finite()) {
        return None;
    }

    if prev < avg && price > avg {
        Some(Crossing::Up)
    } else if prev > avg && price < avg {
        Some(Crossing::Down)
    } else {
        None
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(500))]

        #[test]
        fn never_both_directions(prev in -1e6..1e6f64, price in -1e6..1e6f64, avg in -1e6..1e6f64) {
            let c = detect_crossing(prev, price, avg);
            match c {
                Some(Crossing::Up) => prop_assert!(prev < avg && price > avg),
                Some(Crossing::Down) => prop_assert!(prev > avg && price < avg),
                None => prop_assert!(!(prev < avg && price > avg) && !(prev > avg && price < avg)),
            }
        }

        #[test]
        fn rising_below_constant_average_never_crosses_up(
            avg in 50.0..150.0f64,
            start_gap in 1.0..40.0f64,
            steps in prop::collection::vec(0.0..0.5f64, 1..64),
        ) {
            let mut prev = avg - start_gap;
            for step in steps {
                let price = (prev + step).min(avg - 1e-9);
                prop_assert_ne!(detect_crossing(prev, price, avg), Some(Crossing::Up));
                prev = price;
            }
        }
    }
}
