use market::error::MarketError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchedulerError {
    #[error(transparent)]
    Market(#[from] MarketError),

    #[error("invalid scheduler config: {0}")]
    InvalidConfig(String),

    #[error("signal service is no longer running")]
    ServiceClosed,
}
