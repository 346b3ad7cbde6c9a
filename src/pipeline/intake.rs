//! Request intake.
//!
//! The poll loop drains the unread inbox and turns giveaway PMs and
//! @mentions into scheduled job chains. All validation replies happen here,
//! synchronously, so a requester learns about a bad request right away.

use chrono::Utc;
use tracing::{debug, error, info};

use crate::error::{Error, Result};
use crate::messages;
use crate::models::{GiveawayKind, Identifier};
use crate::parser::{parse_codes, parse_request, CodeFormatError};
use crate::parser::codes::check_code_count;
use crate::platform::{InboxItem, InboxKind};
use crate::scheduler::{Job, JobId, JobPayload, SchedulerError, Stage};

use super::GiveawayPipeline;

impl GiveawayPipeline {
    /// Drain the unread inbox once. Every item is marked read whether its
    /// handling succeeded or not, so a poison message cannot wedge the loop.
    pub async fn poll_inbox(&self) -> Result<()> {
        let items = self
            .retry
            .run(|| self.social.fetch_unread(self.config.giveaway.inbox_batch))
            .await?;

        for item in items {
            let outcome = match item.kind {
                InboxKind::Message => self.handle_submission(&item).await,
                InboxKind::Mention => self.handle_mention_inbox(&item).await,
            };
            if let Err(e) = outcome {
                error!(item = %item.id, error = %e, "inbox item handling failed");
            }
            self.retry
                .run(|| self.social.mark_read(std::slice::from_ref(&item.id)))
                .await?;
        }
        Ok(())
    }

    /// A private message: parse it as a giveaway request and arm the locate
    /// phase, or reply with what went wrong.
    pub async fn handle_submission(&self, item: &InboxItem) -> Result<()> {
        let Some(requester) = item.author.as_deref() else {
            return Ok(());
        };
        if !item
            .subject
            .to_lowercase()
            .contains(messages::REQUEST_SUBJECT)
        {
            debug!(item = %item.id, "ignoring unrelated message");
            return Ok(());
        }

        let parsed = match parse_request(
            &item.body,
            &self.config.platform.bot_username,
            Utc::now(),
        ) {
            Ok(parsed) => parsed,
            Err(e) => {
                debug!(requester, error = %e, "request rejected");
                return self.send_pm(requester, &messages::parse_error_reply()).await;
            }
        };

        let mut request = parsed.request;
        if let GiveawayKind::Keyword { word } = &request.kind {
            if word.len() > self.config.giveaway.keyword_max_len {
                return self.send_pm(requester, &messages::parse_error_reply()).await;
            }
        }

        let codes = match parse_codes(&parsed.raw_codes) {
            Ok(codes) => codes,
            Err(_) => {
                return self.send_pm(requester, &messages::codes_error_reply()).await;
            }
        };
        if let Err(CodeFormatError::InsufficientCodes { required, provided }) =
            check_code_count(&codes, request.winner_count)
        {
            return self
                .send_pm(
                    requester,
                    &messages::insufficient_codes_reply(required, provided),
                )
                .await;
        }
        request.codes = codes;

        let identifier = self.unique_identifier()?;
        let id = JobId::new(identifier.clone(), requester, Stage::Locate);
        info!(giveaway = %identifier, requester, "giveaway request accepted");

        self.send_pm(
            requester,
            &messages::setup_instructions(
                self.config.giveaway.locate_timeout_secs / 60,
                identifier.as_str(),
            ),
        )
        .await?;

        let now = Utc::now();
        let interval = self.config.giveaway.locate_interval_secs;
        let scheduled: std::result::Result<(), SchedulerError> = (|| {
            self.scheduler.schedule(Job::interval(
                id.clone(),
                JobPayload::Locate {
                    request: request.clone(),
                },
                interval,
                now + chrono::Duration::seconds(interval as i64),
            ))?;
            self.scheduler.schedule(Job::one_shot(
                id.with_stage(Stage::LocateTimeout),
                JobPayload::LocateTimeout,
                now + chrono::Duration::seconds(self.config.giveaway.locate_timeout_secs as i64),
            ))
        })();
        if scheduled.is_err() {
            return self
                .send_pm(requester, &messages::scheduling_failed_reply(identifier.as_str()))
                .await;
        }
        Ok(())
    }

    /// An @mention under a post: the giveaway attaches to that post directly
    /// with no locate phase, and winners are announced without codes. Only a
    /// top-level mention from the post author counts.
    pub async fn handle_mention_inbox(&self, item: &InboxItem) -> Result<()> {
        let Some(requester) = item.author.as_deref() else {
            return Ok(());
        };
        let Some(comment_id) = item.comment_id.as_deref() else {
            return Ok(());
        };
        let mention_fullname = format!("t1_{comment_id}");

        let comment = self.retry.run(|| self.social.get_comment(comment_id)).await?;
        if !comment.is_top_level() {
            debug!(requester, comment = comment_id, "mention is not a top-level comment");
            return self
                .reply_comment(&mention_fullname, &messages::mention_not_top_level_reply())
                .await;
        }
        let post = self
            .retry
            .run(|| self.social.get_post(&comment.post_id))
            .await?;
        if !requester.eq_ignore_ascii_case(&post.author) {
            debug!(requester, op = %post.author, "mention requester is not the post author");
            return self
                .reply_comment(&mention_fullname, &messages::mention_not_op_reply())
                .await;
        }

        let parsed = match parse_request(
            &item.body,
            &self.config.platform.bot_username,
            Utc::now(),
        ) {
            Ok(parsed) => parsed,
            Err(e) => {
                debug!(requester, error = %e, "mention rejected");
                return self
                    .reply_comment(&mention_fullname, &messages::mention_error_reply(&e.to_string()))
                    .await;
            }
        };

        let mut request = parsed.request;
        request.is_mention = true;
        if let GiveawayKind::Keyword { word } = &request.kind {
            if word.len() > self.config.giveaway.keyword_max_len {
                return self
                    .reply_comment(
                        &mention_fullname,
                        &messages::mention_error_reply("keyword is too long"),
                    )
                    .await;
            }
        }

        let identifier = self.unique_identifier()?;
        let id = JobId::new(identifier.clone(), requester, Stage::Mention);
        info!(giveaway = %identifier, requester, post = %comment.post_id, "mention giveaway accepted");

        self.reply_comment(&mention_fullname, &messages::announcement(requester, &request))
            .await?;

        if self
            .scheduler
            .schedule(Job::one_shot(
                id,
                JobPayload::Mention {
                    request: request.clone(),
                    post_id: comment.post_id,
                    mention_comment_id: comment_id.to_string(),
                },
                request.close_time,
            ))
            .is_err()
        {
            return self
                .reply_comment(
                    &mention_fullname,
                    &messages::scheduling_failed_reply(identifier.as_str()),
                )
                .await;
        }
        Ok(())
    }

    /// Draw an identifier no pending job is using.
    fn unique_identifier(&self) -> Result<Identifier> {
        let mut rng = rand::thread_rng();
        for _ in 0..64 {
            let identifier = Identifier::generate(&mut rng);
            if !self.store.identifier_in_use(&identifier)? {
                return Ok(identifier);
            }
        }
        Err(Error::Internal(
            "could not draw an unused giveaway identifier".to_string(),
        ))
    }
}
