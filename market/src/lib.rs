//! Market-side building blocks of the signal service: quotes, the allowed
//! asset set, bounded per-asset price history and the pulses derived from it.

pub mod buffer_store;
pub mod error;
pub mod feed;
pub mod pulse;
pub mod rolling_window;
pub mod types;
