use scheduler::error::SchedulerError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("invalid value {value:?} for {key}")]
    InvalidEnv { key: &'static str, value: String },

    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
}
