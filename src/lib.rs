//! windfall - time-boxed giveaway bot
//!
//! Runs giveaways on a social platform end to end: a private message or
//! @mention becomes a parsed request, a chain of persistent scheduled jobs
//! locates the giveaway post, closes it at the requested time, picks winners
//! with one of three strategies and delivers reward codes by PM with retry
//! rounds.
//!
//! # Architecture
//!
//! - [`config`] - Configuration management and settings
//! - [`parser`] - Request grammar and reward-code parsing
//! - [`models`] - Core data structures and types
//! - [`platform`] - Social platform and paste host clients
//! - [`scheduler`] - Persistent job store and serial executor
//! - [`selection`] - Entry collection and winner selection
//! - [`distribution`] - Code assignment and delivery rounds
//! - [`pipeline`] - Lifecycle orchestration and request intake
//! - [`retry`] - Shared retry policy for remote calls
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use windfall::config::Config;
//! use windfall::pipeline::GiveawayPipeline;
//! use windfall::platform::{PastebinClient, RedditClient};
//! use windfall::scheduler::{command_channel, Executor, SqliteJobStore};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     let social = Arc::new(RedditClient::new(config.credentials())?);
//!     let paste = Arc::new(PastebinClient::new(config.platform.paste_api_key.clone())?);
//!     let store = Arc::new(SqliteJobStore::new(&config.scheduler.db_path)?);
//!     let (handle, rx) = command_channel();
//!     let pipeline = Arc::new(GiveawayPipeline::new(
//!         social, paste, handle, store.clone(), config,
//!     ));
//!     let executor = Executor::new(store, pipeline, rx)?;
//!     // executor.run().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod distribution;
pub mod error;
pub mod messages;
pub mod models;
pub mod parser;
pub mod pipeline;
pub mod platform;
pub mod retry;
pub mod scheduler;
pub mod selection;
pub mod utils;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::{Error, Result};
    pub use crate::models::{
        GiveawayKind, GiveawayRequest, Identifier, Notification, WinnerRecord,
    };
    pub use crate::pipeline::GiveawayPipeline;
    pub use crate::platform::{PasteClient, SocialClient};
    pub use crate::scheduler::{Executor, Job, JobId, SchedulerHandle, Stage};
}

// Direct re-exports for convenience
pub use models::{GiveawayKind, GiveawayRequest, Identifier, WinnerRecord};
