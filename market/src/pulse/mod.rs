//! Market Pulse Abstraction
//!
//! A pulse is a side-effect-free observer that derives a single market
//! signal from an asset's price history.

pub mod probability;
pub mod trend;

pub use self::probability::{ProbabilityConfig, ProbabilityScorer};
pub use self::trend::{Crossing, TrendConfig, TrendPulse, TrendPulseResult};

use crate::rolling_window::PriceBuffer;

/// Indicates whether a pulse result is safe to use for trading decisions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum PulseValidity {
    /// Warming up (not enough history). MUST NOT be used to trigger a signal.
    #[default]
    Invalid,
    /// Sufficient history exists.
    Valid,
}

/// Trait implemented by all pulse result types.
pub trait PulseResult {
    fn validity(&self) -> PulseValidity;
}

/// Core Pulse trait.
///
/// A pulse reads the already-updated price history of one asset and
/// produces a result. It must never panic.
pub trait Pulse {
    type Output: PulseResult;

    fn evaluate(&self, window: &PriceBuffer) -> Self::Output;
}
