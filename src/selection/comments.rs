//! Entry collection.
//!
//! Fetches a post's top-level comments and reduces them to one entry per
//! author: deleted accounts, the post owner and the bot itself are excluded,
//! and only an author's earliest comment counts.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::models::CommentRecord;
use crate::platform::SocialClient;
use crate::retry::{RetryError, RetryPolicy};

use super::SelectionError;

/// Collects and normalizes giveaway entries.
pub struct CommentCollector {
    social: Arc<dyn SocialClient>,
    retry: RetryPolicy,
    bot_username: String,
}

impl CommentCollector {
    pub fn new(social: Arc<dyn SocialClient>, retry: RetryPolicy, bot_username: String) -> Self {
        Self {
            social,
            retry,
            bot_username,
        }
    }

    /// One entry per author, ordered by comment time then id.
    pub async fn collect(
        &self,
        post_id: &str,
        owner: &str,
    ) -> Result<Vec<CommentRecord>, SelectionError> {
        let raw = self
            .retry
            .run(|| self.social.top_level_comments(post_id))
            .await
            .map_err(|e: RetryError<_>| SelectionError::Api(e.to_string()))?;

        if raw.is_empty() {
            return Err(SelectionError::NoComments);
        }

        let mut earliest: HashMap<String, CommentRecord> = HashMap::new();
        for comment in raw {
            let Some(author) = comment.author else {
                continue;
            };
            if author.eq_ignore_ascii_case(owner)
                || author.eq_ignore_ascii_case(&self.bot_username)
            {
                continue;
            }
            let record = CommentRecord {
                id: comment.id,
                author: author.clone(),
                body: comment.body,
                created_at: comment.created_at,
            };
            let key = author.to_lowercase();
            match earliest.get(&key) {
                Some(existing)
                    if (existing.created_at, &existing.id)
                        <= (record.created_at, &record.id) => {}
                _ => {
                    earliest.insert(key, record);
                }
            }
        }

        let mut entries: Vec<CommentRecord> = earliest.into_values().collect();
        entries.sort_by(|a, b| (a.created_at, &a.id).cmp(&(b.created_at, &b.id)));
        debug!(post = post_id, entries = entries.len(), "collected entries");

        if entries.is_empty() {
            return Err(SelectionError::NoComments);
        }
        Ok(entries)
    }
}
