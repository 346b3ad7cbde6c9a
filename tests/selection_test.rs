//! Collector and selector working together on realistic comment threads.

mod common;

use std::sync::Arc;

use chrono::{Duration, Utc};
use common::top_level;

use windfall::models::{
    AccountMetrics, EligibilityThresholds, GiveawayKind, GiveawayRequest, WinnerEvidence,
};
use windfall::platform::MockSocialClient;
use windfall::retry::RetryPolicy;
use windfall::selection::{CommentCollector, SelectionError, WinnerSelector};

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

fn metrics(post_karma: i64, age_days: i64) -> AccountMetrics {
    AccountMetrics {
        post_karma,
        comment_karma: 0,
        created_at: Utc::now() - Duration::days(age_days),
    }
}

fn rig(mock: &Arc<MockSocialClient>) -> (CommentCollector, WinnerSelector) {
    let collector = CommentCollector::new(
        mock.clone(),
        RetryPolicy::default(),
        "windfall-bot".to_string(),
    );
    let selector = WinnerSelector::new(mock.clone(), RetryPolicy::default(), 300);
    (collector, selector)
}

#[tokio::test]
async fn number_selection_ignores_second_comments_and_duplicates() {
    let mock = Arc::new(MockSocialClient::new());
    // bob comments twice: only his first guess counts.
    mock.add_top_level_comment("p1", top_level("c1", "bob", "my guess is 70", 0));
    mock.add_top_level_comment("p1", top_level("c2", "bob", "actually 50", 10));
    // carol duplicates dave's number later; dave keeps the claim.
    mock.add_top_level_comment("p1", top_level("c3", "dave", "49", 20));
    mock.add_top_level_comment("p1", top_level("c4", "carol", "49 as well", 30));

    let (collector, selector) = rig(&mock);
    let entries = collector.collect("p1", "alice").await.unwrap();
    let request = request(
        GiveawayKind::Number {
            guess: 50,
            min: 1,
            max: 100,
        },
        1,
    );

    let winners = selector.select(&request, &entries).await.unwrap();
    assert_eq!(winners.len(), 1);
    assert_eq!(winners[0].author, "dave");
    assert_eq!(winners[0].evidence, WinnerEvidence::Number { value: 49 });
}

#[tokio::test]
async fn keyword_selection_rewards_earliest_matches() {
    let mock = Arc::new(MockSocialClient::new());
    mock.add_top_level_comment("p1", top_level("c1", "bob", "no clue", 0));
    mock.add_top_level_comment("p1", top_level("c2", "carol", "is it BANANA?", 10));
    mock.add_top_level_comment("p1", top_level("c3", "dave", "banana bread", 20));

    let (collector, selector) = rig(&mock);
    let entries = collector.collect("p1", "alice").await.unwrap();
    let request = request(
        GiveawayKind::Keyword {
            word: "banana".to_string(),
        },
        2,
    );

    let winners = selector.select(&request, &entries).await.unwrap();
    assert_eq!(winners.len(), 2);
    assert_eq!(winners[0].author, "carol");
    assert_eq!(winners[1].author, "dave");
}

#[tokio::test]
async fn thresholds_skip_young_accounts() {
    let mock = Arc::new(MockSocialClient::new());
    mock.add_top_level_comment("p1", top_level("c1", "bob", "50", 0));
    mock.add_top_level_comment("p1", top_level("c2", "carol", "51", 10));
    mock.set_metrics("bob", metrics(1000, 5));
    mock.set_metrics("carol", metrics(1000, 500));

    let (collector, selector) = rig(&mock);
    let entries = collector.collect("p1", "alice").await.unwrap();
    let mut request = request(
        GiveawayKind::Number {
            guess: 50,
            min: 1,
            max: 100,
        },
        1,
    );
    request.thresholds.min_account_age_days = 30;

    // bob is closest but too new; carol takes it.
    let winners = selector.select(&request, &entries).await.unwrap();
    assert_eq!(winners[0].author, "carol");
}

#[tokio::test]
async fn disqualified_claimant_does_not_free_the_number() {
    let mock = Arc::new(MockSocialClient::new());
    // bob claims the exact guess but fails thresholds; carol posted the
    // same number later and never becomes an entrant for it.
    mock.add_top_level_comment("p1", top_level("c1", "bob", "50", 0));
    mock.add_top_level_comment("p1", top_level("c2", "carol", "50", 10));
    mock.set_metrics("bob", metrics(0, 500));
    mock.set_metrics("carol", metrics(1000, 500));

    let (collector, selector) = rig(&mock);
    let entries = collector.collect("p1", "alice").await.unwrap();
    let mut request = request(
        GiveawayKind::Number {
            guess: 50,
            min: 1,
            max: 100,
        },
        1,
    );
    request.thresholds.min_post_karma = 10;

    let err = selector.select(&request, &entries).await.unwrap_err();
    assert!(matches!(err, SelectionError::NotEnoughValidAccounts));
}

#[tokio::test]
async fn owner_comment_never_wins_their_own_giveaway() {
    let mock = Arc::new(MockSocialClient::new());
    mock.add_top_level_comment("p1", top_level("c1", "alice", "testing 50", 0));
    mock.add_top_level_comment("p1", top_level("c2", "bob", "60", 10));

    let (collector, selector) = rig(&mock);
    let entries = collector.collect("p1", "alice").await.unwrap();
    let request = request(
        GiveawayKind::Number {
            guess: 50,
            min: 1,
            max: 100,
        },
        1,
    );

    let winners = selector.select(&request, &entries).await.unwrap();
    assert_eq!(winners[0].author, "bob");
}
