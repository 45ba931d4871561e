//! Cooldown policy: how long to stay quiet after an operation.
//!
//! The distribution is a trait object so tests can swap the weighted random
//! draw for a fixed one.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::types::{CooldownConfig, MINUTE_MS};

pub trait CooldownDistribution: Send {
    /// Cooldown length in ms.
    fn draw_ms(&mut self) -> u64;
}

/// Two uniform ranges picked by a weighted coin flip.
pub struct WeightedCooldown<R = StdRng> {
    cfg: CooldownConfig,
    rng: R,
}

impl WeightedCooldown<StdRng> {
    pub fn from_entropy(cfg: CooldownConfig) -> Self {
        Self::with_rng(cfg, StdRng::from_entropy())
    }
}

impl<R: Rng> WeightedCooldown<R> {
    pub fn with_rng(cfg: CooldownConfig, rng: R) -> Self {
        Self { cfg, rng }
    }
}

impl<R: Rng + Send> CooldownDistribution for WeightedCooldown<R> {
    fn draw_ms(&mut self) -> u64 {
        let extended = self.rng.gen_bool(self.cfg.extra_chance.clamp(0.0, 1.0));

        let (lo, hi) = if extended {
            (self.cfg.extra_min_minutes, self.cfg.extra_max_minutes)
        } else {
            (self.cfg.base_min_minutes, self.cfg.base_max_minutes)
        };
        let (lo, hi) = (
            lo.min(hi).saturating_mul(MINUTE_MS),
            lo.max(hi).saturating_mul(MINUTE_MS),
        );

        self.rng.gen_range(lo..=hi)
    }
}

/// Always the same cooldown.
#[derive(Debug, Clone, Copy)]
pub struct FixedCooldown(pub u64);

impl CooldownDistribution for FixedCooldown {
    fn draw_ms(&mut self) -> u64 {
        self.0
    }
}
