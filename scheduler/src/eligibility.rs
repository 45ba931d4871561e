//! Determines whether a freshly evaluated tick may open an operation.
//
//  This module is deliberately pure: no async, no IO.

use market::pulse::{PulseValidity, TrendPulseResult};

use crate::state::{CooldownState, TradeLock};

/// Result of an eligibility check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eligibility {
    Eligible,
    Warmup,
    NoCrossing,
    Locked,
    CooldownNotElapsed,
}

impl Eligibility {
    pub fn is_eligible(&self) -> bool {
        matches!(self, Eligibility::Eligible)
    }
}

/// Check whether a new operation may open at `now_ms`.
///
/// This enforces, in order:
///   - the trend pulse is warm and reports a crossing
///   - the global trade lock is free
///   - the cooldown horizon has passed
///
/// Expired locks must already have been released by the caller.
pub fn check_eligibility(
    trend: &TrendPulseResult,
    lock: &TradeLock,
    cooldown: &CooldownState,
    now_ms: u64,
) -> Eligibility {
    if trend.validity != PulseValidity::Valid {
        return Eligibility::Warmup;
    }

    if trend.crossing.is_none() {
        return Eligibility::NoCrossing;
    }

    if lock.is_locked() {
        return Eligibility::Locked;
    }

    if !cooldown.is_elapsed(now_ms) {
        return Eligibility::CooldownNotElapsed;
    }

    Eligibility::Eligible
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::logger::TraceId;
    use market::pulse::Crossing;
    use market::types::Direction;

    use crate::state::OpenOperation;
    use crate::types::WindowPlan;

    fn crossing() -> TrendPulseResult {
        TrendPulseResult {
            price: 101.0,
            prev: 99.0,
            avg: 100.0,
            std_dev: 1.0,
            crossing: Some(Crossing::Up),
            validity: PulseValidity::Valid,
        }
    }

    fn locked() -> TradeLock {
        TradeLock::Locked(OpenOperation {
            id: 1,
            asset_id: "A".into(),
            direction: Direction::Buy,
            plan: WindowPlan {
                opened_at: 0,
                pre_open_at: 30_000,
                entry_at: 60_000,
                valid_until: 120_000,
            },
            trace_id: TraceId::new(),
        })
    }

    fn cooldown_until(ts: u64) -> CooldownState {
        let mut c = CooldownState::default();
        c.raise(ts);
        c
    }

    #[test]
    fn warmup_blocks_everything() {
        let t = TrendPulseResult::default();
        let out = check_eligibility(&t, &TradeLock::default(), &CooldownState::default(), 0);
        assert_eq!(out, Eligibility::Warmup);
    }

    #[test]
    fn no_crossing_fails() {
        let t = TrendPulseResult {
            crossing: None,
            ..crossing()
        };
        let out = check_eligibility(&t, &TradeLock::default(), &CooldownState::default(), 0);
        assert_eq!(out, Eligibility::NoCrossing);
    }

    #[test]
    fn lock_fails() {
        let out = check_eligibility(&crossing(), &locked(), &CooldownState::default(), 0);
        assert_eq!(out, Eligibility::Locked);
    }

    #[test]
    fn cooldown_not_elapsed_fails() {
        let out = check_eligibility(
            &crossing(),
            &TradeLock::default(),
            &cooldown_until(10_000),
            9_999,
        );
        assert_eq!(out, Eligibility::CooldownNotElapsed);
    }

    #[test]
    fn all_conditions_pass() {
        let out = check_eligibility(
            &crossing(),
            &TradeLock::default(),
            &cooldown_until(10_000),
            10_000,
        );
        assert!(out.is_eligible());
    }
}
