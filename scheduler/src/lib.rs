//! Signal scheduling core: turns crossings into timed operations, guards
//! them with a global lock and cooldown, evaluates their outcome and fans
//! the resulting events out to subscribers.

pub mod broadcaster;
pub mod clock;
pub mod eligibility;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod metrics;
pub mod policy;
pub mod service;
pub mod state;
pub mod timers;
pub mod types;
pub mod window;
