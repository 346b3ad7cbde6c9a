//! External collaborator interfaces.
//!
//! The pipeline only ever talks to the social platform and the paste host
//! through the [`SocialClient`] and [`PasteClient`] traits; concrete
//! implementations live in [`reddit`] and [`paste`], and a scriptable
//! [`mock`] backs the test suites. Both services are constructed once at
//! startup and passed in explicitly.

pub mod mock;
pub mod paste;
pub mod reddit;

pub use mock::{MockPasteClient, MockSocialClient};
pub use paste::PastebinClient;
pub use reddit::RedditClient;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::AccountMetrics;
use crate::retry::Transient;

/// A submission on the platform.
#[derive(Debug, Clone, PartialEq)]
pub struct Post {
    pub id: String,
    pub title: String,
    pub body: String,
    pub author: String,
    pub url: String,
}

/// A comment on the platform. `author` is `None` for deleted accounts.
#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    pub id: String,
    pub author: Option<String>,
    pub body: String,
    pub created_at: DateTime<Utc>,
    /// Fullname of the parent thing (`t3_*` post or `t1_*` comment).
    pub parent_id: String,
    pub post_id: String,
}

impl Comment {
    /// Whether this comment replies directly to the post.
    pub fn is_top_level(&self) -> bool {
        self.parent_id.starts_with("t3_")
    }
}

/// Kinds of unread inbox items the poll loop dispatches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboxKind {
    Message,
    Mention,
}

/// An unread inbox item: a private message or an @mention reply.
#[derive(Debug, Clone, PartialEq)]
pub struct InboxItem {
    pub id: String,
    pub kind: InboxKind,
    pub author: Option<String>,
    pub subject: String,
    pub body: String,
    /// Fullname of the parent thing, set for mentions.
    pub parent_id: Option<String>,
    /// Comment id of the mention itself, set for mentions.
    pub comment_id: Option<String>,
}

/// Failures from a platform call.
///
/// Only [`PlatformError::Transient`] is retried; protocol, auth and
/// not-found failures propagate immediately.
#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("transient platform error: {0}")]
    Transient(String),

    #[error("platform protocol error: {0}")]
    Protocol(String),

    #[error("platform authentication failed: {0}")]
    Auth(String),

    #[error("not found: {0}")]
    NotFound(String),
}

impl Transient for PlatformError {
    fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// The social platform as seen by the pipeline.
#[async_trait]
pub trait SocialClient: Send + Sync {
    async fn get_post(&self, post_id: &str) -> Result<Post, PlatformError>;

    async fn get_comment(&self, comment_id: &str) -> Result<Comment, PlatformError>;

    /// Reply under a post or comment; `parent_fullname` is a `t3_*` or
    /// `t1_*` fullname. Returns the created comment.
    async fn post_comment(
        &self,
        parent_fullname: &str,
        body: &str,
    ) -> Result<Comment, PlatformError>;

    async fn edit_comment(&self, comment_id: &str, body: &str) -> Result<(), PlatformError>;

    async fn send_message(
        &self,
        recipient: &str,
        subject: &str,
        body: &str,
    ) -> Result<(), PlatformError>;

    /// The user's most recent submissions, newest first.
    async fn recent_submissions(
        &self,
        user: &str,
        limit: usize,
    ) -> Result<Vec<Post>, PlatformError>;

    async fn account_metrics(&self, user: &str) -> Result<AccountMetrics, PlatformError>;

    /// All top-level comments of a post, fully expanded.
    async fn top_level_comments(&self, post_id: &str) -> Result<Vec<Comment>, PlatformError>;

    /// Unread inbox items for the poll loop.
    async fn fetch_unread(&self, limit: usize) -> Result<Vec<InboxItem>, PlatformError>;

    async fn mark_read(&self, item_ids: &[String]) -> Result<(), PlatformError>;
}

/// The paste host as seen by the pipeline (used-numbers tracker pastes).
#[async_trait]
pub trait PasteClient: Send + Sync {
    /// Create an unlisted paste, returning its URL.
    async fn create_paste(
        &self,
        text: &str,
        title: &str,
        format: Option<&str>,
        expiry: &str,
    ) -> Result<String, PlatformError>;

    async fn delete_paste(&self, paste_key: &str) -> Result<(), PlatformError>;
}
