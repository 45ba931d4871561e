//! Probability scorer.
//!
//! Maps how far the triggering price sits from its moving average, measured
//! in standard deviations, into a confidence percentage:
//!
//! ```text
//! sigma = min(|p - avg| / std_dev, sigma_cap)
//! base  = min + (max - min) * (1 - exp(-steepness * sigma))
//! score = clamp(round(base + U(-jitter, +jitter)), min, max)
//! ```
//!
//! With no usable deviation (zero, negative or non-finite) the score falls
//! back to a uniform draw inside the bounds. `base_score` is the pure part;
//! all randomness goes through the caller's RNG and `jitter = 0` disables it.

use rand::Rng;

use crate::error::MarketError;

#[derive(Clone, Copy, Debug)]
pub struct ProbabilityConfig {
    pub min_prob: u8,
    pub max_prob: u8,
    /// `k` in the saturating transform.
    pub steepness: f64,
    /// Half-width of the symmetric jitter, in percentage points.
    pub jitter: f64,
    pub sigma_cap: f64,
}

impl Default for ProbabilityConfig {
    fn default() -> Self {
        Self {
            min_prob: 50,
            max_prob: 92,
            steepness: 0.9,
            jitter: 2.0,
            sigma_cap: 3.0,
        }
    }
}

impl ProbabilityConfig {
    pub fn validate(&self) -> Result<(), MarketError> {
        if self.min_prob > self.max_prob || self.max_prob > 100 {
            return Err(MarketError::InvalidProbabilityBounds {
                min: self.min_prob,
                max: self.max_prob,
            });
        }
        for (name, value) in [
            ("steepness", self.steepness),
            ("jitter", self.jitter),
            ("sigma_cap", self.sigma_cap),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(MarketError::InvalidProbabilityParam { name, value });
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct ProbabilityScorer {
    cfg: ProbabilityConfig,
}

impl ProbabilityScorer {
    pub fn new(cfg: ProbabilityConfig) -> Result<Self, MarketError> {
        cfg.validate()?;
        Ok(Self { cfg })
    }

    pub fn config(&self) -> &ProbabilityConfig {
        &self.cfg
    }

    /// Deterministic score before jitter, or `None` when the deviation
    /// cannot be used.
    pub fn base_score(&self, price: f64, avg: f64, std_dev: f64) -> Option<f64> {
        if !(std_dev.is_finite() && std_dev > 0.0 && price.is_finite() && avg.is_finite()) {
            return None;
        }

        let sigma = ((price - avg).abs() / std_dev).min(self.cfg.sigma_cap);
        let saturation = 1.0 - (-self.cfg.steepness * sigma).exp();

        let (min, max) = self.bounds();
        Some(min + (max - min) * saturation)
    }

    /// Final confidence in `[min_prob, max_prob]`.
    pub fn score<R: Rng + ?Sized>(&self, price: f64, avg: f64, std_dev: f64, rng: &mut R) -> u8 {
        let (min, max) = self.bounds();

        let raw = match self.base_score(price, avg, std_dev) {
            Some(base) if self.cfg.jitter > 0.0 => {
                base + rng.gen_range(-self.cfg.jitter..=self.cfg.jitter)
            }
            Some(base) => base,
            None => rng.gen_range(min..=max),
        };

        raw.round().clamp(min, max) as u8
    }

    fn bounds(&self) -> (f64, f64) {
        (self.cfg.min_prob as f64, self.cfg.max_prob as f64)
    }
}
