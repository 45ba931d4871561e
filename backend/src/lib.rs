pub mod config;
pub mod demo_feed;
pub mod error;
pub mod event_log;
pub mod feed_supervisor;
