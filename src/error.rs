//! Unified error handling.
//!
//! Domain modules keep their own error types; this enum consolidates them at
//! the pipeline and binary boundary so handlers can return one [`Result`].

use std::io;
use thiserror::Error;

pub use crate::parser::codes::CodeFormatError;
pub use crate::parser::request::ParseError;
pub use crate::platform::PlatformError;
pub use crate::scheduler::error::SchedulerError;
pub use crate::selection::SelectionError;

use crate::retry::RetryError;

/// Unified error enum wrapping all domain-specific errors.
#[derive(Error, Debug)]
pub enum Error {
    #[error("request parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("code format error: {0}")]
    CodeFormat(#[from] CodeFormatError),

    #[error("selection error: {0}")]
    Selection(#[from] SelectionError),

    #[error("scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),

    #[error("platform error: {0}")]
    Platform(#[from] PlatformError),

    #[error("retries exhausted: {0}")]
    Retry(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl<E: std::fmt::Display> From<RetryError<E>> for Error {
    fn from(e: RetryError<E>) -> Self {
        Self::Retry(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
