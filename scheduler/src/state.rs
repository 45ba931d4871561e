//! Global scheduler state: the trade lock and the cooldown horizon.
//!
//! Both are owned by the engine and only mutated from its single task.

use common::logger::TraceId;
use market::types::Direction;
use tracing::debug;

use crate::types::WindowPlan;

/// The operation currently holding the lock.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenOperation {
    pub id: u64,
    pub asset_id: String,
    pub direction: Direction,
    pub plan: WindowPlan,
    pub trace_id: TraceId,
}

/// At most one open operation across all assets.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum TradeLock {
    #[default]
    Unlocked,
    Locked(OpenOperation),
}

impl TradeLock {
    pub fn is_locked(&self) -> bool {
        matches!(self, TradeLock::Locked(_))
    }

    pub fn current(&self) -> Option<&OpenOperation> {
        match self {
            TradeLock::Locked(op) => Some(op),
            TradeLock::Unlocked => None,
        }
    }

    /// Takes the lock for `op`. Fails, returning `op`, when already held.
    pub fn try_acquire(&mut self, op: OpenOperation) -> Result<(), OpenOperation> {
        if self.is_locked() {
            return Err(op);
        }
        *self = TradeLock::Locked(op);
        Ok(())
    }

    /// Unlocks once `now >= valid_until`. No-op when unlocked or still live.
    pub fn release_if_expired(&mut self, now_ms: u64) -> Option<OpenOperation> {
        match self {
            TradeLock::Locked(op) if now_ms >= op.plan.valid_until => self.reset(),
            _ => None,
        }
    }

    /// Releases the lock only if it is held by operation `id`.
    pub fn release(&mut self, id: u64) -> Option<OpenOperation> {
        match self {
            TradeLock::Locked(op) if op.id == id => self.reset(),
            _ => None,
        }
    }

    pub fn reset(&mut self) -> Option<OpenOperation> {
        match std::mem::take(self) {
            TradeLock::Locked(op) => {
                debug!(op_id = op.id, asset = %op.asset_id, "trade lock released");
                Some(op)
            }
            TradeLock::Unlocked => None,
        }
    }
}

/// Earliest time a new operation may open. Never moves backwards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CooldownState {
    next_allowed_at: u64,
}

impl CooldownState {
    pub fn next_allowed_at(&self) -> u64 {
        self.next_allowed_at
    }

    /// `next = max(current, candidate)`; returns the new value.
    pub fn raise(&mut self, candidate_ms: u64) -> u64 {
        if candidate_ms > self.next_allowed_at {
            debug!(
                from = self.next_allowed_at,
                to = candidate_ms,
                "cooldown extended"
            );
            self.next_allowed_at = candidate_ms;
        }
        self.next_allowed_at
    }

    pub fn is_elapsed(&self, now_ms: u64) -> bool {
        now_ms >= self.next_allowed_at
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn cooldown_is_monotonic(candidates in prop::collection::vec(any::<u64>(), 0..100)) {
            let mut c = CooldownState::default();
            let mut last = c.next_allowed_at();
            for cand in candidates {
                let next = c.raise(cand);
                prop_assert!(next >= last);
                prop_assert!(next >= cand);
                last = next;
            }
        }
    }
}
