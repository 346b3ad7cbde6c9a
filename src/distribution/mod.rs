//! Code assignment and delivery.
//!
//! Once winners are picked, codes are bound to them and pushed out as
//! private messages. Delivery is best-effort per round: failures are
//! returned to the caller, which schedules another round later instead of
//! blocking the close handler.

use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{info, warn};

use crate::messages;
use crate::models::{Notification, WinnerRecord};
use crate::platform::SocialClient;
use crate::retry::RetryPolicy;

/// Bind codes to winners. Every code in the pool is handed out.
///
/// A sole winner takes every code. With multiple winners the shuffled pool
/// is dealt round-robin until it runs dry, so surplus codes are spread
/// evenly and code order reveals nothing about rank.
pub fn assign_codes<R: Rng>(winners: &mut [WinnerRecord], codes: &[String], rng: &mut R) {
    if winners.is_empty() {
        return;
    }
    if winners.len() == 1 {
        winners[0].codes = codes.to_vec();
        return;
    }
    let mut shuffled = codes.to_vec();
    shuffled.shuffle(rng);
    let mut next = 0;
    while let Some(code) = shuffled.pop() {
        winners[next].codes.push(code);
        next = (next + 1) % winners.len();
    }
}

/// One message per winner, carrying their codes and a link back to the post.
pub fn build_notifications(
    winners: &[WinnerRecord],
    requester: &str,
    post_title: &str,
    post_url: &str,
) -> Vec<Notification> {
    winners
        .iter()
        .map(|winner| Notification {
            recipient: winner.author.clone(),
            subject: messages::REPLY_SUBJECT.to_string(),
            body: messages::winner_notification(
                requester,
                post_title,
                post_url,
                &winner.codes.join("\n"),
            ),
        })
        .collect()
}

/// Sends winner notifications.
pub struct CodeDistributor {
    social: Arc<dyn SocialClient>,
    retry: RetryPolicy,
}

impl CodeDistributor {
    pub fn new(social: Arc<dyn SocialClient>, retry: RetryPolicy) -> Self {
        Self { social, retry }
    }

    /// Send one round of notifications, returning the ones that failed.
    pub async fn send_batch(&self, notifications: &[Notification]) -> Vec<Notification> {
        let mut failed = Vec::new();
        for notification in notifications {
            let result = self
                .retry
                .run(|| {
                    self.social.send_message(
                        &notification.recipient,
                        &notification.subject,
                        &notification.body,
                    )
                })
                .await;
            if let Err(e) = result {
                warn!(
                    recipient = %notification.recipient,
                    error = %e,
                    "winner notification failed"
                );
                failed.push(notification.clone());
            }
        }
        info!(
            sent = notifications.len() - failed.len(),
            failed = failed.len(),
            "delivery round complete"
        );
        failed
    }
}
