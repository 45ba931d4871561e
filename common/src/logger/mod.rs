//! Process-wide tracing setup and span helpers shared by every crate.

mod init;
mod macros;
mod trace_id;

pub use init::init_logger;
pub use macros::{child_span, root_span, warn_if_slow};
pub use trace_id::TraceId;
