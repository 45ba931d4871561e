//! Single source of "now" (ms since the Unix epoch) for every component.

use tokio::time::Instant;

pub trait Clock: Send + Sync + 'static {
    fn now_ms(&self) -> u64;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        chrono::Utc::now().timestamp_millis().max(0) as u64
    }
}

/// Epoch time derived from tokio's clock, so paused-time tests move
/// wall-clock alignment forward together with timers.
#[derive(Debug, Clone, Copy)]
pub struct TokioClock {
    base_ms: u64,
    start: Instant,
}

impl TokioClock {
    pub fn starting_at(base_ms: u64) -> Self {
        Self {
            base_ms,
            start: Instant::now(),
        }
    }
}

impl Clock for TokioClock {
    fn now_ms(&self) -> u64 {
        self.base_ms + self.start.elapsed().as_millis() as u64
    }
}
