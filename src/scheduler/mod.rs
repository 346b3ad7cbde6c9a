//! Persistent job scheduling.
//!
//! A giveaway is a chain of jobs: locate ticks, a locate timeout, a close, a
//! numbers-tracker refresh and delivery rounds. The [`Executor`] runs them
//! serially on one task; [`store::JobStore`] keeps them durable across
//! restarts.

pub mod error;
pub mod executor;
pub mod job;
pub mod store;

pub use error::SchedulerError;
pub use executor::{command_channel, CommandReceiver, Executor, JobRunner, SchedulerHandle};
pub use job::{Job, JobId, JobPayload, JobTrigger, Stage};
pub use store::{JobStore, MemoryJobStore, SqliteJobStore};
