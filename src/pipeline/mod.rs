//! Giveaway lifecycle orchestration.
//!
//! The pipeline is the scheduler's job runner: every fired job lands in
//! [`GiveawayPipeline::run`] and dispatches to a stage handler. Handlers are
//! written to be restart-safe: each one re-reads what it needs from the job
//! payload and the platform rather than from process state.

pub mod intake;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::distribution::{assign_codes, build_notifications, CodeDistributor};
use crate::error::Result;
use crate::messages;
use crate::models::{GiveawayKind, GiveawayRequest, Notification, WinnerEvidence, WinnerRecord};
use crate::platform::{PasteClient, Post, SocialClient};
use crate::retry::RetryPolicy;
use crate::scheduler::{Job, JobId, JobPayload, JobRunner, SchedulerHandle, Stage};
use crate::scheduler::store::JobStore;
use crate::selection::{CommentCollector, SelectionError, WinnerSelector};
use crate::utils::{first_digit_run, obfuscate_codes};

/// Owns the collaborators and runs every lifecycle stage.
pub struct GiveawayPipeline {
    social: Arc<dyn SocialClient>,
    paste: Arc<dyn PasteClient>,
    scheduler: SchedulerHandle,
    store: Arc<dyn JobStore>,
    retry: RetryPolicy,
    config: Config,
    collector: CommentCollector,
    selector: WinnerSelector,
    distributor: CodeDistributor,
}

impl GiveawayPipeline {
    pub fn new(
        social: Arc<dyn SocialClient>,
        paste: Arc<dyn PasteClient>,
        scheduler: SchedulerHandle,
        store: Arc<dyn JobStore>,
        config: Config,
    ) -> Self {
        let retry = config.retry_policy();
        let collector = CommentCollector::new(
            social.clone(),
            retry.clone(),
            config.platform.bot_username.clone(),
        );
        let selector = WinnerSelector::new(
            social.clone(),
            retry.clone(),
            config.giveaway.comment_char_limit,
        );
        let distributor = CodeDistributor::new(social.clone(), retry.clone());
        Self {
            social,
            paste,
            scheduler,
            store,
            retry,
            config,
            collector,
            selector,
            distributor,
        }
    }

    async fn send_pm(&self, recipient: &str, body: &str) -> Result<()> {
        let body = format!("{body}{}", messages::footer());
        self.retry
            .run(|| self.social.send_message(recipient, messages::REPLY_SUBJECT, &body))
            .await?;
        Ok(())
    }

    async fn reply_comment(&self, parent_fullname: &str, body: &str) -> Result<()> {
        let body = format!("{body}{}", messages::footer());
        self.retry
            .run(|| self.social.post_comment(parent_fullname, &body))
            .await?;
        Ok(())
    }

    async fn edit_comment(&self, comment_id: &str, body: &str) -> Result<()> {
        let body = format!("{body}{}", messages::footer());
        self.retry
            .run(|| self.social.edit_comment(comment_id, &body))
            .await?;
        Ok(())
    }

    /// One locate tick: scan the requester's newest submissions for the
    /// identifier and arm the rest of the lifecycle once it appears.
    async fn handle_locate(&self, id: &JobId, request: &GiveawayRequest) -> Result<()> {
        let posts = self
            .retry
            .run(|| {
                self.social
                    .recent_submissions(&id.requester, self.config.giveaway.recent_submissions)
            })
            .await?;

        let needle = id.identifier.as_str();
        let Some(post) = posts
            .into_iter()
            .find(|p| p.title.contains(needle) || p.body.contains(needle))
        else {
            return Ok(());
        };

        info!(giveaway = %id.identifier, post = %post.id, "giveaway post located");
        self.scheduler.cancel(id.clone())?;
        self.scheduler.cancel(id.with_stage(Stage::LocateTimeout))?;

        let announcement = format!(
            "{}{}",
            messages::announcement(&id.requester, request),
            messages::footer()
        );
        let post_fullname = format!("t3_{}", post.id);
        let announce = match self
            .retry
            .run(|| self.social.post_comment(&post_fullname, &announcement))
            .await
        {
            Ok(comment) => comment,
            Err(e) => {
                warn!(giveaway = %id.identifier, error = %e, "could not announce, clearing giveaway");
                return self
                    .send_pm(
                        &id.requester,
                        &messages::scheduling_failed_reply(id.identifier.as_str()),
                    )
                    .await;
            }
        };

        let mut tracker_comment_id = None;
        if let GiveawayKind::Number { min, max, .. } = request.kind {
            let minutes = self.config.giveaway.tracker_refresh_secs / 60;
            let placeholder = format!(
                "{}{}",
                messages::tracker_placeholder(minutes),
                messages::footer()
            );
            let tracker_parent = format!("t1_{}", announce.id);
            let tracker = self
                .retry
                .run(|| self.social.post_comment(&tracker_parent, &placeholder))
                .await?;
            self.scheduler.schedule(Job::interval(
                id.with_stage(Stage::RefreshNumbers),
                JobPayload::RefreshNumbers {
                    min,
                    max,
                    post_id: post.id.clone(),
                    tracker_comment_id: tracker.id.clone(),
                    paste_key: None,
                },
                self.config.giveaway.tracker_refresh_secs,
                Utc::now() + chrono::Duration::seconds(self.config.giveaway.tracker_refresh_secs as i64),
            ))?;
            tracker_comment_id = Some(tracker.id);
        }

        self.scheduler.schedule(Job::one_shot(
            id.with_stage(Stage::Close),
            JobPayload::Close {
                request: request.clone(),
                post_id: post.id,
                announcement_comment_id: announce.id,
                tracker_comment_id,
            },
            request.close_time,
        ))?;
        Ok(())
    }

    /// No post showed up in time: drop the locate tick and tell the
    /// requester their codes were cleared.
    async fn handle_locate_timeout(&self, id: &JobId) -> Result<()> {
        self.scheduler.cancel(id.with_stage(Stage::Locate))?;
        info!(giveaway = %id.identifier, "giveaway timed out before a post was found");
        self.send_pm(
            &id.requester,
            &messages::timeout_reply(
                id.identifier.as_str(),
                self.config.giveaway.locate_timeout_secs / 60,
            ),
        )
        .await
    }

    async fn handle_close(
        &self,
        id: &JobId,
        request: &GiveawayRequest,
        post_id: &str,
        announcement_comment_id: &str,
        tracker_comment_id: Option<&str>,
    ) -> Result<()> {
        if tracker_comment_id.is_some() {
            self.scheduler.cancel(id.with_stage(Stage::RefreshNumbers))?;
        }
        let post = self.retry.run(|| self.social.get_post(post_id)).await?;
        self.finish(id, request, &post, announcement_comment_id, false)
            .await
    }

    async fn handle_mention(
        &self,
        id: &JobId,
        request: &GiveawayRequest,
        post_id: &str,
        mention_comment_id: &str,
    ) -> Result<()> {
        let post = self.retry.run(|| self.social.get_post(post_id)).await?;
        let reply_parent = format!("t1_{mention_comment_id}");
        self.finish(id, request, &post, &reply_parent, true).await
    }

    /// Shared close path: collect, select, publish results, deliver codes.
    ///
    /// `results_target` is the announcement comment id, whose body gets
    /// replaced with the outcome; a mention giveaway has no announcement to
    /// edit, so the target is the mention's fullname and the outcome is a
    /// reply instead.
    async fn finish(
        &self,
        id: &JobId,
        request: &GiveawayRequest,
        post: &Post,
        results_target: &str,
        is_mention: bool,
    ) -> Result<()> {
        let entries = match self.collector.collect(&post.id, &id.requester).await {
            Ok(entries) => entries,
            Err(e) => {
                return self
                    .report_selection_failure(id, request, post, results_target, is_mention, e)
                    .await
            }
        };

        let mut winners = match self.selector.select(request, &entries).await {
            Ok(winners) => winners,
            Err(e) => {
                return self
                    .report_selection_failure(id, request, post, results_target, is_mention, e)
                    .await
            }
        };

        let lines = winner_lines(&winners);
        let published = if is_mention {
            self.reply_comment(results_target, &messages::results_mention(&lines))
                .await
        } else {
            self.edit_comment(results_target, &messages::results(&lines))
                .await
        };
        if let Err(e) = published {
            warn!(giveaway = %id.identifier, error = %e, "could not publish results");
        }

        if is_mention {
            info!(giveaway = %id.identifier, "mention giveaway closed");
            return Ok(());
        }

        assign_codes(&mut winners, &request.codes, &mut rand::thread_rng());

        let summary = winners
            .iter()
            .map(|w| format!("* /u/{} : {}", w.author, obfuscate_codes(&w.codes)))
            .collect::<Vec<_>>()
            .join("  \n");

        // The requester summary joins the winner notifications so a failed
        // send goes around in the same delivery rounds.
        let mut notifications =
            build_notifications(&winners, &id.requester, &post.title, &post.url);
        notifications.push(Notification {
            recipient: id.requester.clone(),
            subject: messages::REPLY_SUBJECT.to_string(),
            body: format!(
                "{}{}",
                messages::requester_summary(&summary, &post.title, &post.url),
                messages::footer()
            ),
        });
        info!(giveaway = %id.identifier, winners = winners.len(), "giveaway closed");
        self.run_delivery_round(id, notifications, 1).await
    }

    /// Publish the failure on the post and tell the requester; the giveaway
    /// is cleared either way.
    async fn report_selection_failure(
        &self,
        id: &JobId,
        request: &GiveawayRequest,
        post: &Post,
        results_target: &str,
        is_mention: bool,
        err: SelectionError,
    ) -> Result<()> {
        info!(giveaway = %id.identifier, outcome = %err, "giveaway cleared without winners");
        let (comment, pm) = match &err {
            SelectionError::NoComments => (
                Some(messages::no_comments_comment()),
                messages::no_comments_reply(&post.title, &post.url),
            ),
            SelectionError::NoWinnersFound | SelectionError::NotEnoughWinners { .. } => (
                Some(messages::not_enough_winners_comment()),
                messages::not_enough_winners_reply(&post.title, &post.url),
            ),
            SelectionError::NotEnoughValidAccounts => (
                Some(messages::invalid_accounts_comment(&request.thresholds)),
                messages::invalid_accounts_reply(&post.title, &post.url),
            ),
            SelectionError::Api(detail) => {
                error!(giveaway = %id.identifier, detail, "platform failure during selection");
                (None, messages::api_error_reply(&post.title, &post.url))
            }
        };

        if let Some(body) = comment {
            let published = if is_mention {
                self.reply_comment(results_target, &body).await
            } else {
                self.edit_comment(results_target, &body).await
            };
            if let Err(e) = published {
                warn!(giveaway = %id.identifier, error = %e, "could not publish failure notice");
            }
        }
        if let Err(e) = self.send_pm(&id.requester, &pm).await {
            warn!(giveaway = %id.identifier, error = %e, "could not send failure reply");
        }
        Ok(())
    }

    /// Rebuild the used-numbers paste and point the tracker comment at it.
    #[allow(clippy::too_many_arguments)]
    async fn handle_refresh_numbers(
        &self,
        id: &JobId,
        min: i64,
        max: i64,
        post_id: &str,
        tracker_comment_id: &str,
        paste_key: Option<&str>,
    ) -> Result<()> {
        let mut comments = self
            .retry
            .run(|| self.social.top_level_comments(post_id))
            .await?;
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at));

        let unrestricted = min == 0 && max == 0;
        let bot = &self.config.platform.bot_username;
        let mut used: Vec<(i64, String)> = Vec::new();
        for comment in &comments {
            let Some(author) = comment.author.as_deref() else {
                continue;
            };
            if author.eq_ignore_ascii_case(bot) || author.eq_ignore_ascii_case(&id.requester) {
                continue;
            }
            let Some(value) = first_digit_run(&comment.body) else {
                continue;
            };
            if !unrestricted && (value < min || value > max) {
                continue;
            }
            if used.iter().any(|(v, _)| *v == value) {
                continue;
            }
            used.push((value, author.to_string()));
        }

        if used.is_empty() {
            return Ok(());
        }
        used.sort_by_key(|(value, _)| *value);
        let text = used
            .iter()
            .map(|(value, author)| format!("{value} by {author}"))
            .collect::<Vec<_>>()
            .join("\n");

        let paste_title = format!("Giveaway {} used numbers", id.identifier);
        let url = self
            .retry
            .run(|| self.paste.create_paste(&text, &paste_title, None, "1H"))
            .await?;

        let minutes = self.config.giveaway.tracker_refresh_secs / 60;
        let tracker_body = format!("{}{}", messages::tracker_update(&url, minutes), messages::footer());
        self.retry
            .run(|| self.social.edit_comment(tracker_comment_id, &tracker_body))
            .await?;

        if let Some(old) = paste_key {
            if let Err(e) = self.retry.run(|| self.paste.delete_paste(old)).await {
                warn!(giveaway = %id.identifier, error = %e, "could not delete stale paste");
            }
        }

        // Persist the new paste key so the next tick can clean up after us.
        let new_key = url.rsplit('/').next().unwrap_or_default().to_string();
        self.scheduler.schedule(Job::interval(
            id.clone(),
            JobPayload::RefreshNumbers {
                min,
                max,
                post_id: post_id.to_string(),
                tracker_comment_id: tracker_comment_id.to_string(),
                paste_key: Some(new_key),
            },
            self.config.giveaway.tracker_refresh_secs,
            Utc::now() + chrono::Duration::seconds(self.config.giveaway.tracker_refresh_secs as i64),
        ))?;
        Ok(())
    }

    /// Send one round of notifications; failures go around again later
    /// until the round budget runs out.
    async fn run_delivery_round(
        &self,
        id: &JobId,
        notifications: Vec<Notification>,
        round: u32,
    ) -> Result<()> {
        let failed = self.distributor.send_batch(&notifications).await;
        if failed.is_empty() {
            return Ok(());
        }
        if round >= self.config.giveaway.delivery_rounds {
            let recipients: Vec<&str> = failed.iter().map(|n| n.recipient.as_str()).collect();
            warn!(
                giveaway = %id.identifier,
                ?recipients,
                "delivery rounds exhausted, giving up on remaining recipients"
            );
            return Ok(());
        }
        self.scheduler.schedule(Job::one_shot(
            id.with_stage(Stage::Delivery),
            JobPayload::Delivery {
                notifications: failed,
                round: round + 1,
            },
            Utc::now() + chrono::Duration::from_std(self.config.delivery_delay()).unwrap_or_default(),
        ))?;
        Ok(())
    }
}

#[async_trait]
impl JobRunner for GiveawayPipeline {
    async fn run(&self, job: &Job) -> Result<()> {
        match &job.payload {
            JobPayload::Locate { request } => self.handle_locate(&job.id, request).await,
            JobPayload::LocateTimeout => self.handle_locate_timeout(&job.id).await,
            JobPayload::Close {
                request,
                post_id,
                announcement_comment_id,
                tracker_comment_id,
            } => {
                self.handle_close(
                    &job.id,
                    request,
                    post_id,
                    announcement_comment_id,
                    tracker_comment_id.as_deref(),
                )
                .await
            }
            JobPayload::RefreshNumbers {
                min,
                max,
                post_id,
                tracker_comment_id,
                paste_key,
            } => {
                self.handle_refresh_numbers(
                    &job.id,
                    *min,
                    *max,
                    post_id,
                    tracker_comment_id,
                    paste_key.as_deref(),
                )
                .await
            }
            JobPayload::Delivery {
                notifications,
                round,
            } => {
                self.run_delivery_round(&job.id, notifications.clone(), *round)
                    .await
            }
            JobPayload::Mention {
                request,
                post_id,
                mention_comment_id,
            } => {
                self.handle_mention(&job.id, request, post_id, mention_comment_id)
                    .await
            }
        }
    }
}

fn winner_lines(winners: &[WinnerRecord]) -> String {
    winners
        .iter()
        .map(|w| match &w.evidence {
            WinnerEvidence::None => format!("* /u/{}", w.author),
            WinnerEvidence::Number { value } => {
                format!("* /u/{} with number {}", w.author, value)
            }
            WinnerEvidence::Keyword { matched } => {
                format!("* /u/{} with keyword \"{}\"", w.author, matched)
            }
        })
        .collect::<Vec<_>>()
        .join("  \n")
}
