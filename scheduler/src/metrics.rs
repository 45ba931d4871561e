use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Minimal counters for operational visibility.
#[derive(Clone, Default, Debug)]
pub struct Counters {
    pub quotes_accepted: Arc<AtomicU64>,
    pub quotes_dropped: Arc<AtomicU64>,
    pub crossings: Arc<AtomicU64>,
    pub signals: Arc<AtomicU64>,
    pub results: Arc<AtomicU64>,

    // suppressed openings
    pub suppressed_locked: Arc<AtomicU64>,
    pub suppressed_cooldown: Arc<AtomicU64>,

    pub subscribers_dropped: Arc<AtomicU64>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CountersSnapshot {
    pub quotes_accepted: u64,
    pub quotes_dropped: u64,
    pub crossings: u64,
    pub signals: u64,
    pub results: u64,
    pub suppressed_locked: u64,
    pub suppressed_cooldown: u64,
    pub subscribers_dropped: u64,
}

impl Counters {
    pub fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CountersSnapshot {
        let get = |c: &AtomicU64| c.load(Ordering::Relaxed);
        CountersSnapshot {
            quotes_accepted: get(&self.quotes_accepted),
            quotes_dropped: get(&self.quotes_dropped),
            crossings: get(&self.crossings),
            signals: get(&self.signals),
            results: get(&self.results),
            suppressed_locked: get(&self.suppressed_locked),
            suppressed_cooldown: get(&self.suppressed_cooldown),
            subscribers_dropped: get(&self.subscribers_dropped),
        }
    }
}
