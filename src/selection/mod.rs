//! Winner selection.
//!
//! Three strategies share one entry pool: uniform random draw, closest
//! number guess, and keyword order of arrival. Eligibility thresholds are
//! applied lazily so the platform is only asked about accounts that would
//! otherwise win.

pub mod comments;

pub use comments::CommentCollector;

use std::sync::Arc;

use rand::seq::SliceRandom;
use regex::Regex;
use thiserror::Error;
use tracing::{debug, info};

use crate::models::{
    CommentRecord, EligibilityThresholds, GiveawayKind, GiveawayRequest, WinnerEvidence,
    WinnerRecord,
};
use crate::platform::{PlatformError, SocialClient};
use crate::retry::{RetryError, RetryPolicy};
use crate::utils::first_digit_run;

/// Failures while picking winners. Each maps to a distinct outcome message
/// for the requester.
#[derive(Error, Debug)]
pub enum SelectionError {
    /// The post has no eligible comments at all.
    #[error("no comments on the giveaway post")]
    NoComments,

    /// No entry qualified under the strategy (no valid number, no keyword).
    #[error("no qualifying entries found")]
    NoWinnersFound,

    /// Qualifying entries exist but fewer than the requested winner count.
    #[error("only {found} qualifying entries for {required} winners")]
    NotEnoughWinners { required: usize, found: usize },

    /// Enough entries, but too many failed the eligibility thresholds.
    #[error("not enough entrants passed the account thresholds")]
    NotEnoughValidAccounts,

    /// The platform kept failing while we were selecting.
    #[error("platform error during selection: {0}")]
    Api(String),
}

/// Picks winners from a collected entry pool.
pub struct WinnerSelector {
    social: Arc<dyn SocialClient>,
    retry: RetryPolicy,
    comment_char_limit: usize,
}

impl WinnerSelector {
    pub fn new(
        social: Arc<dyn SocialClient>,
        retry: RetryPolicy,
        comment_char_limit: usize,
    ) -> Self {
        Self {
            social,
            retry,
            comment_char_limit,
        }
    }

    /// Select `request.winner_count` winners from `entries` using the
    /// request's strategy. Entries must already be one-per-author and
    /// time-ordered.
    pub async fn select(
        &self,
        request: &GiveawayRequest,
        entries: &[CommentRecord],
    ) -> Result<Vec<WinnerRecord>, SelectionError> {
        let winners = match &request.kind {
            GiveawayKind::Random => self.select_random(request, entries).await?,
            GiveawayKind::Number { guess, min, max } => {
                self.select_number(request, entries, *guess, *min, *max)
                    .await?
            }
            GiveawayKind::Keyword { word } => {
                self.select_keyword(request, entries, word).await?
            }
        };
        info!(
            winners = winners.len(),
            strategy = ?request.kind,
            "winners selected"
        );
        Ok(winners)
    }

    async fn select_random(
        &self,
        request: &GiveawayRequest,
        entries: &[CommentRecord],
    ) -> Result<Vec<WinnerRecord>, SelectionError> {
        let required = request.winner_count;
        let filtered = request.thresholds.is_active();

        if !filtered && entries.len() < required {
            return Err(SelectionError::NotEnoughWinners {
                required,
                found: entries.len(),
            });
        }

        let mut pool: Vec<&CommentRecord> = entries.iter().collect();
        pool.shuffle(&mut rand::thread_rng());

        let mut winners = Vec::with_capacity(required);
        for entry in pool {
            if winners.len() == required {
                break;
            }
            if filtered && !self.account_eligible(&entry.author, &request.thresholds).await? {
                debug!(author = %entry.author, "entrant failed thresholds");
                continue;
            }
            winners.push(WinnerRecord::new(entry.author.clone(), WinnerEvidence::None));
        }

        if winners.len() < required {
            return Err(SelectionError::NotEnoughValidAccounts);
        }
        Ok(winners)
    }

    async fn select_number(
        &self,
        request: &GiveawayRequest,
        entries: &[CommentRecord],
        guess: i64,
        min: i64,
        max: i64,
    ) -> Result<Vec<WinnerRecord>, SelectionError> {
        let required = request.winner_count;
        let unrestricted = min == 0 && max == 0;

        // One entrant per number: the earliest commenter claims a value and
        // later duplicates never count, even if the claimant is disqualified.
        let mut claimed: Vec<(i64, &CommentRecord)> = Vec::new();
        for entry in entries {
            let Some(value) = first_digit_run(&entry.body) else {
                continue;
            };
            if !unrestricted && (value < min || value > max) {
                continue;
            }
            if claimed.iter().any(|(v, _)| *v == value) {
                continue;
            }
            claimed.push((value, entry));
        }

        if claimed.is_empty() {
            return Err(SelectionError::NoWinnersFound);
        }
        if claimed.len() < required {
            return Err(SelectionError::NotEnoughWinners {
                required,
                found: claimed.len(),
            });
        }

        claimed.sort_by_key(|(value, entry)| ((value - guess).abs(), entry.created_at));

        let filtered = request.thresholds.is_active();
        let mut winners = Vec::with_capacity(required);
        for (value, entry) in claimed {
            if winners.len() == required {
                break;
            }
            if filtered && !self.account_eligible(&entry.author, &request.thresholds).await? {
                debug!(author = %entry.author, value, "closest entrant failed thresholds");
                continue;
            }
            winners.push(WinnerRecord::new(
                entry.author.clone(),
                WinnerEvidence::Number { value },
            ));
        }

        if winners.len() < required {
            return Err(SelectionError::NotEnoughValidAccounts);
        }
        Ok(winners)
    }

    async fn select_keyword(
        &self,
        request: &GiveawayRequest,
        entries: &[CommentRecord],
        keyword: &str,
    ) -> Result<Vec<WinnerRecord>, SelectionError> {
        let required = request.winner_count;
        let pattern = Regex::new(&format!("(?i){}", regex::escape(keyword)))
            .map_err(|e| SelectionError::Api(format!("bad keyword pattern: {e}")))?;

        // Entries past the character limit never count, as promised in
        // the announcement comment.
        let matching: Vec<(&CommentRecord, String)> = entries
            .iter()
            .filter(|entry| entry.body.chars().count() < self.comment_char_limit)
            .filter_map(|entry| {
                pattern
                    .find(&entry.body)
                    .map(|m| (entry, m.as_str().to_string()))
            })
            .collect();

        if matching.is_empty() {
            return Err(SelectionError::NoWinnersFound);
        }
        if matching.len() < required {
            return Err(SelectionError::NotEnoughWinners {
                required,
                found: matching.len(),
            });
        }

        let filtered = request.thresholds.is_active();
        let mut winners = Vec::with_capacity(required);
        for (entry, matched) in matching {
            if winners.len() == required {
                break;
            }
            if filtered && !self.account_eligible(&entry.author, &request.thresholds).await? {
                debug!(author = %entry.author, "keyword entrant failed thresholds");
                continue;
            }
            winners.push(WinnerRecord::new(
                entry.author.clone(),
                WinnerEvidence::Keyword { matched },
            ));
        }

        if winners.len() < required {
            return Err(SelectionError::NotEnoughValidAccounts);
        }
        Ok(winners)
    }

    /// A vanished account is ineligible, not an error.
    async fn account_eligible(
        &self,
        author: &str,
        thresholds: &EligibilityThresholds,
    ) -> Result<bool, SelectionError> {
        let metrics = self.retry.run(|| self.social.account_metrics(author)).await;
        match metrics {
            Ok(metrics) => Ok(thresholds.passes(&metrics, chrono::Utc::now())),
            Err(RetryError::Fatal(PlatformError::NotFound(_))) => Ok(false),
            Err(e) => Err(SelectionError::Api(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AccountMetrics;
    use crate::platform::MockSocialClient;
    use chrono::{Duration, Utc};

    fn entry(id: &str, author: &str, body: &str, offset_secs: i64) -> CommentRecord {
        CommentRecord {
            id: id.to_string(),
            author: author.to_string(),
            body: body.to_string(),
            created_at: Utc::now() + Duration::seconds(offset_secs),
        }
    }

    fn request(kind: GiveawayKind, winner_count: usize) -> GiveawayRequest {
        GiveawayRequest {
            kind,
            close_time: Utc::now() + Duration::hours(1),
            winner_count,
            is_mention: false,
            thresholds: EligibilityThresholds::default(),
            codes: Vec::new(),
        }
    }

    fn strict_thresholds() -> EligibilityThresholds {
        EligibilityThresholds {
            min_post_karma: 100,
            min_comment_karma: 0,
            min_account_age_days: 0,
        }
    }

    fn metrics(post_karma: i64) -> AccountMetrics {
        AccountMetrics {
            post_karma,
            comment_karma: 0,
            created_at: Utc::now() - Duration::days(365),
        }
    }

    fn selector(mock: Arc<MockSocialClient>) -> WinnerSelector {
        WinnerSelector::new(mock, RetryPolicy::default(), 300)
    }

    #[tokio::test]
    async fn test_random_draws_without_replacement() {
        let mock = Arc::new(MockSocialClient::new());
        let entries = vec![
            entry("c1", "alice", "in", 0),
            entry("c2", "bob", "in", 1),
            entry("c3", "carol", "in", 2),
        ];
        let request = request(GiveawayKind::Random, 2);

        let winners = selector(mock).select(&request, &entries).await.unwrap();
        assert_eq!(winners.len(), 2);
        assert_ne!(winners[0].author, winners[1].author);
        assert!(winners.iter().all(|w| w.evidence == WinnerEvidence::None));
    }

    #[tokio::test]
    async fn test_random_pool_too_small() {
        let mock = Arc::new(MockSocialClient::new());
        let entries = vec![entry("c1", "alice", "in", 0)];
        let request = request(GiveawayKind::Random, 3);

        let err = selector(mock).select(&request, &entries).await.unwrap_err();
        assert!(matches!(
            err,
            SelectionError::NotEnoughWinners {
                required: 3,
                found: 1
            }
        ));
    }

    #[tokio::test]
    async fn test_random_thresholds_exhaust_pool() {
        let mock = Arc::new(MockSocialClient::new());
        mock.set_metrics("alice", metrics(500));
        mock.set_metrics("bob", metrics(1));
        let mut request = request(GiveawayKind::Random, 2);
        request.thresholds = strict_thresholds();
        let entries = vec![entry("c1", "alice", "in", 0), entry("c2", "bob", "in", 1)];

        let err = selector(mock).select(&request, &entries).await.unwrap_err();
        assert!(matches!(err, SelectionError::NotEnoughValidAccounts));
    }

    #[tokio::test]
    async fn test_number_picks_closest_guess() {
        let mock = Arc::new(MockSocialClient::new());
        let entries = vec![
            entry("c1", "alice", "I pick 10", 0),
            entry("c2", "bob", "42 is the answer", 1),
            entry("c3", "carol", "going with 50", 2),
        ];
        let request = request(
            GiveawayKind::Number {
                guess: 45,
                min: 1,
                max: 100,
            },
            1,
        );

        let winners = selector(mock).select(&request, &entries).await.unwrap();
        assert_eq!(winners[0].author, "bob");
        assert_eq!(winners[0].evidence, WinnerEvidence::Number { value: 42 });
    }

    #[tokio::test]
    async fn test_number_tie_goes_to_earlier_comment() {
        let mock = Arc::new(MockSocialClient::new());
        let entries = vec![
            entry("c1", "alice", "40", 5),
            entry("c2", "bob", "50", 0),
        ];
        let request = request(
            GiveawayKind::Number {
                guess: 45,
                min: 1,
                max: 100,
            },
            1,
        );

        let winners = selector(mock).select(&request, &entries).await.unwrap();
        assert_eq!(winners[0].author, "bob");
    }

    #[tokio::test]
    async fn test_number_duplicate_value_goes_to_first_claimant() {
        let mock = Arc::new(MockSocialClient::new());
        let entries = vec![
            entry("c1", "alice", "42", 0),
            entry("c2", "bob", "42 too", 1),
        ];
        let request = request(
            GiveawayKind::Number {
                guess: 42,
                min: 1,
                max: 100,
            },
            1,
        );

        let winners = selector(mock).select(&request, &entries).await.unwrap();
        assert_eq!(winners[0].author, "alice");
    }

    #[tokio::test]
    async fn test_number_out_of_range_is_no_winners() {
        let mock = Arc::new(MockSocialClient::new());
        let entries = vec![entry("c1", "alice", "9000", 0)];
        let request = request(
            GiveawayKind::Number {
                guess: 45,
                min: 1,
                max: 100,
            },
            1,
        );

        let err = selector(mock).select(&request, &entries).await.unwrap_err();
        assert!(matches!(err, SelectionError::NoWinnersFound));
    }

    #[tokio::test]
    async fn test_number_zero_range_is_unrestricted() {
        let mock = Arc::new(MockSocialClient::new());
        let entries = vec![entry("c1", "alice", "987654", 0)];
        let request = request(
            GiveawayKind::Number {
                guess: 1_000_000,
                min: 0,
                max: 0,
            },
            1,
        );

        let winners = selector(mock).select(&request, &entries).await.unwrap();
        assert_eq!(winners[0].author, "alice");
    }

    #[tokio::test]
    async fn test_keyword_matches_in_arrival_order() {
        let mock = Arc::new(MockSocialClient::new());
        let entries = vec![
            entry("c1", "alice", "nothing here", 0),
            entry("c2", "bob", "GOLDEN ticket please", 1),
            entry("c3", "carol", "a golden entry", 2),
        ];
        let request = request(
            GiveawayKind::Keyword {
                word: "golden".to_string(),
            },
            1,
        );

        let winners = selector(mock).select(&request, &entries).await.unwrap();
        assert_eq!(winners[0].author, "bob");
        assert_eq!(
            winners[0].evidence,
            WinnerEvidence::Keyword {
                matched: "GOLDEN".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_keyword_skips_overlong_comments() {
        let mock = Arc::new(MockSocialClient::new());
        let padding = "x".repeat(400);
        let entries = vec![
            entry("c1", "alice", &format!("golden {padding}"), 0),
            entry("c2", "bob", "golden", 1),
        ];
        let request = request(
            GiveawayKind::Keyword {
                word: "golden".to_string(),
            },
            1,
        );

        let winners = selector(mock).select(&request, &entries).await.unwrap();
        assert_eq!(winners[0].author, "bob");
    }

    #[tokio::test]
    async fn test_keyword_absent_is_no_winners() {
        let mock = Arc::new(MockSocialClient::new());
        let entries = vec![entry("c1", "alice", "hello", 0)];
        let request = request(
            GiveawayKind::Keyword {
                word: "golden".to_string(),
            },
            1,
        );

        let err = selector(mock).select(&request, &entries).await.unwrap_err();
        assert!(matches!(err, SelectionError::NoWinnersFound));
    }

    #[tokio::test]
    async fn test_vanished_account_is_skipped_not_fatal() {
        let mock = Arc::new(MockSocialClient::new());
        // bob has no metrics registered, so lookup is NotFound.
        mock.set_metrics("alice", metrics(500));
        let mut request = request(GiveawayKind::Random, 1);
        request.thresholds = strict_thresholds();
        let entries = vec![entry("c1", "alice", "in", 0), entry("c2", "bob", "in", 1)];

        let winners = selector(mock).select(&request, &entries).await.unwrap();
        assert_eq!(winners[0].author, "alice");
    }
}
