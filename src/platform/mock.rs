//! Scriptable in-memory collaborators for the test suites.
//!
//! Fixtures go in through the `add_*`/`set_*` methods, outbound traffic is
//! recorded for inspection, and `fail_transient` makes the next N calls of an
//! operation fail with a retryable error.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use super::{Comment, InboxItem, PasteClient, PlatformError, Post, SocialClient};
use crate::models::AccountMetrics;

/// A message recorded by [`MockSocialClient::send_message`].
#[derive(Debug, Clone, PartialEq)]
pub struct SentMessage {
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

#[derive(Default)]
struct SocialState {
    posts: HashMap<String, Post>,
    comments: HashMap<String, Comment>,
    submissions: HashMap<String, Vec<Post>>,
    metrics: HashMap<String, AccountMetrics>,
    top_level: HashMap<String, Vec<Comment>>,
    unread: Vec<InboxItem>,
    read_ids: Vec<String>,
    sent: Vec<SentMessage>,
    posted: Vec<Comment>,
    edited: Vec<(String, String)>,
    fail_counts: HashMap<String, u32>,
    next_comment_id: u64,
}

/// In-memory [`SocialClient`].
#[derive(Default)]
pub struct MockSocialClient {
    state: Mutex<SocialState>,
}

impl MockSocialClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_post(&self, post: Post) {
        self.state.lock().unwrap().posts.insert(post.id.clone(), post);
    }

    pub fn add_comment(&self, comment: Comment) {
        self.state
            .lock()
            .unwrap()
            .comments
            .insert(comment.id.clone(), comment);
    }

    pub fn add_submission(&self, user: &str, post: Post) {
        let mut state = self.state.lock().unwrap();
        state.posts.insert(post.id.clone(), post.clone());
        // Newest first, like the live listing.
        state
            .submissions
            .entry(user.to_string())
            .or_default()
            .insert(0, post);
    }

    pub fn set_metrics(&self, user: &str, metrics: AccountMetrics) {
        self.state
            .lock()
            .unwrap()
            .metrics
            .insert(user.to_string(), metrics);
    }

    pub fn add_top_level_comment(&self, post_id: &str, comment: Comment) {
        self.state
            .lock()
            .unwrap()
            .top_level
            .entry(post_id.to_string())
            .or_default()
            .push(comment);
    }

    pub fn push_unread(&self, item: InboxItem) {
        self.state.lock().unwrap().unread.push(item);
    }

    /// Make the next `times` calls of `operation` fail with a transient error.
    pub fn fail_transient(&self, operation: &str, times: u32) {
        self.state
            .lock()
            .unwrap()
            .fail_counts
            .insert(operation.to_string(), times);
    }

    pub fn sent_messages(&self) -> Vec<SentMessage> {
        self.state.lock().unwrap().sent.clone()
    }

    pub fn posted_comments(&self) -> Vec<Comment> {
        self.state.lock().unwrap().posted.clone()
    }

    pub fn edited_comments(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().edited.clone()
    }

    pub fn read_ids(&self) -> Vec<String> {
        self.state.lock().unwrap().read_ids.clone()
    }

    fn check_fail(&self, operation: &str) -> Result<(), PlatformError> {
        let mut state = self.state.lock().unwrap();
        if let Some(remaining) = state.fail_counts.get_mut(operation) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(PlatformError::Transient(format!(
                    "scripted failure in {operation}"
                )));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl SocialClient for MockSocialClient {
    async fn get_post(&self, post_id: &str) -> Result<Post, PlatformError> {
        self.check_fail("get_post")?;
        self.state
            .lock()
            .unwrap()
            .posts
            .get(post_id)
            .cloned()
            .ok_or_else(|| PlatformError::NotFound(format!("post {post_id}")))
    }

    async fn get_comment(&self, comment_id: &str) -> Result<Comment, PlatformError> {
        self.check_fail("get_comment")?;
        self.state
            .lock()
            .unwrap()
            .comments
            .get(comment_id)
            .cloned()
            .ok_or_else(|| PlatformError::NotFound(format!("comment {comment_id}")))
    }

    async fn post_comment(
        &self,
        parent_fullname: &str,
        body: &str,
    ) -> Result<Comment, PlatformError> {
        self.check_fail("post_comment")?;
        let mut state = self.state.lock().unwrap();
        state.next_comment_id += 1;
        let comment = Comment {
            id: format!("mock{}", state.next_comment_id),
            author: Some("windfall-bot".to_string()),
            body: body.to_string(),
            created_at: Utc::now(),
            parent_id: parent_fullname.to_string(),
            post_id: parent_fullname.trim_start_matches("t3_").to_string(),
        };
        state.posted.push(comment.clone());
        state.comments.insert(comment.id.clone(), comment.clone());
        Ok(comment)
    }

    async fn edit_comment(&self, comment_id: &str, body: &str) -> Result<(), PlatformError> {
        self.check_fail("edit_comment")?;
        let mut state = self.state.lock().unwrap();
        state.edited.push((comment_id.to_string(), body.to_string()));
        if let Some(comment) = state.comments.get_mut(comment_id) {
            comment.body = body.to_string();
        }
        Ok(())
    }

    async fn send_message(
        &self,
        recipient: &str,
        subject: &str,
        body: &str,
    ) -> Result<(), PlatformError> {
        self.check_fail("send_message")?;
        self.state.lock().unwrap().sent.push(SentMessage {
            recipient: recipient.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }

    async fn recent_submissions(
        &self,
        user: &str,
        limit: usize,
    ) -> Result<Vec<Post>, PlatformError> {
        self.check_fail("recent_submissions")?;
        let state = self.state.lock().unwrap();
        Ok(state
            .submissions
            .get(user)
            .map(|posts| posts.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn account_metrics(&self, user: &str) -> Result<AccountMetrics, PlatformError> {
        self.check_fail("account_metrics")?;
        self.state
            .lock()
            .unwrap()
            .metrics
            .get(user)
            .cloned()
            .ok_or_else(|| PlatformError::NotFound(format!("user {user}")))
    }

    async fn top_level_comments(&self, post_id: &str) -> Result<Vec<Comment>, PlatformError> {
        self.check_fail("top_level_comments")?;
        Ok(self
            .state
            .lock()
            .unwrap()
            .top_level
            .get(post_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn fetch_unread(&self, limit: usize) -> Result<Vec<InboxItem>, PlatformError> {
        self.check_fail("fetch_unread")?;
        let state = self.state.lock().unwrap();
        Ok(state.unread.iter().take(limit).cloned().collect())
    }

    async fn mark_read(&self, item_ids: &[String]) -> Result<(), PlatformError> {
        self.check_fail("mark_read")?;
        let mut state = self.state.lock().unwrap();
        state.unread.retain(|item| !item_ids.contains(&item.id));
        state.read_ids.extend(item_ids.iter().cloned());
        Ok(())
    }
}

/// A paste recorded by [`MockPasteClient::create_paste`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedPaste {
    pub key: String,
    pub text: String,
    pub title: String,
    pub expiry: String,
}

#[derive(Default)]
struct PasteState {
    pastes: Vec<RecordedPaste>,
    deleted: Vec<String>,
    fail_remaining: u32,
    next_key: u64,
}

/// In-memory [`PasteClient`].
#[derive(Default)]
pub struct MockPasteClient {
    state: Mutex<PasteState>,
}

impl MockPasteClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_transient(&self, times: u32) {
        self.state.lock().unwrap().fail_remaining = times;
    }

    pub fn pastes(&self) -> Vec<RecordedPaste> {
        self.state.lock().unwrap().pastes.clone()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.state.lock().unwrap().deleted.clone()
    }
}

#[async_trait]
impl PasteClient for MockPasteClient {
    async fn create_paste(
        &self,
        text: &str,
        title: &str,
        _format: Option<&str>,
        expiry: &str,
    ) -> Result<String, PlatformError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_remaining > 0 {
            state.fail_remaining -= 1;
            return Err(PlatformError::Transient("scripted paste failure".to_string()));
        }
        state.next_key += 1;
        let key = format!("paste{}", state.next_key);
        state.pastes.push(RecordedPaste {
            key: key.clone(),
            text: text.to_string(),
            title: title.to_string(),
            expiry: expiry.to_string(),
        });
        Ok(format!("https://pastebin.com/{key}"))
    }

    async fn delete_paste(&self, paste_key: &str) -> Result<(), PlatformError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_remaining > 0 {
            state.fail_remaining -= 1;
            return Err(PlatformError::Transient("scripted paste failure".to_string()));
        }
        state.deleted.push(paste_key.to_string());
        Ok(())
    }
}
