//! Operation window planner.
//!
//! Aligns an accepted crossing to the next timeframe boundary so every
//! operation starts exactly on a candle open, independent of tick jitter:
//!
//! ```text
//! entry_at    = ceil(now / T) * T
//! pre_open_at = entry_at - pre_open
//! valid_until = entry_at + candles * T
//! ```
//!
//! `pre_open_at` may already be in the past when the crossing arrives close
//! to a boundary; it is informational only.

use crate::types::{SchedulerConfig, WindowDurations, WindowPlan};

pub fn plan_window(now_ms: u64, cfg: &SchedulerConfig) -> WindowPlan {
    let t = cfg.timeframe_ms.max(1);
    let entry_at = now_ms.div_ceil(t).saturating_mul(t);

    WindowPlan {
        opened_at: now_ms,
        pre_open_at: entry_at.saturating_sub(cfg.pre_open_ms),
        entry_at,
        valid_until: entry_at.saturating_add(u64::from(cfg.candles).saturating_mul(t)),
    }
}

pub fn window_durations(cfg: &SchedulerConfig) -> WindowDurations {
    let run = u64::from(cfg.candles).saturating_mul(cfg.timeframe_ms);
    WindowDurations {
        pre_open_ms: cfg.pre_open_ms,
        candle_ms: cfg.timeframe_ms,
        candles: cfg.candles,
        total_ms: cfg.pre_open_ms.saturating_add(run),
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(1000))]
        #[test]
        fn entry_is_aligned_and_not_in_the_past(
            now in 0u64..4_000_000_000_000,
            timeframe in 1u64..3_600_000,
            candles in 1u32..=2,
            pre_open in 0u64..120_000,
        ) {
            let cfg = SchedulerConfig {
                timeframe_ms: timeframe,
                candles,
                pre_open_ms: pre_open,
                ..Default::default()
            };
            let p = plan_window(now, &cfg);

            prop_assert!(p.entry_at >= now);
            prop_assert!(p.entry_at - now < timeframe);
            prop_assert_eq!(p.entry_at % timeframe, 0);
            prop_assert_eq!(p.valid_until - p.entry_at, u64::from(candles) * timeframe);
            prop_assert!(p.pre_open_at <= p.entry_at);
        }
    }
}
