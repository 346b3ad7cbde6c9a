//! Scheduler error types.

use thiserror::Error;

/// Failures from the job scheduler and its persistence layer.
#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("job store error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("job serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid job key: {0}")]
    InvalidKey(String),

    #[error("scheduler is shut down")]
    Shutdown,
}
