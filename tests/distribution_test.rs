//! Delivery rounds running through the scheduler.

mod common;

use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use common::{spawn_bot, test_config};

use windfall::models::Notification;
use windfall::scheduler::{Job, JobId, JobPayload, Stage};

fn notification(recipient: &str) -> Notification {
    Notification {
        recipient: recipient.to_string(),
        subject: "Giveaway Bot".to_string(),
        body: "Congratulations! Your code: X-1".to_string(),
    }
}

fn delivery_job(notifications: Vec<Notification>, round: u32) -> Job {
    Job::one_shot(
        JobId::new("123456".parse().unwrap(), "alice", Stage::Delivery),
        JobPayload::Delivery {
            notifications,
            round,
        },
        Utc::now() + Duration::seconds(1),
    )
}

#[tokio::test(start_paused = true)]
async fn failed_round_is_retried_later_and_succeeds() {
    let mut config = test_config();
    config.retry.max_retries = 1;
    let bot = spawn_bot(config);
    bot.social.fail_transient("send_message", 1);

    bot.handle
        .schedule(delivery_job(vec![notification("bob")], 1))
        .unwrap();

    // Round one fails and re-queues itself.
    tokio::time::sleep(StdDuration::from_secs(10)).await;
    assert!(bot.social.sent_messages().is_empty());
    let pending = bot.store.load_all().unwrap();
    assert_eq!(pending.len(), 1);
    match &pending[0].payload {
        JobPayload::Delivery { round, .. } => assert_eq!(*round, 2),
        other => panic!("unexpected payload: {other:?}"),
    }

    // Round two lands fifteen minutes later.
    tokio::time::sleep(StdDuration::from_secs(900)).await;
    let sent = bot.social.sent_messages();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].recipient, "bob");
    assert!(bot.store.load_all().unwrap().is_empty());

    bot.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn only_undelivered_recipients_go_around_again() {
    let mut config = test_config();
    config.retry.max_retries = 1;
    let bot = spawn_bot(config);
    // First send of the round fails; the rest of the batch still goes out.
    bot.social.fail_transient("send_message", 1);

    bot.handle
        .schedule(delivery_job(
            vec![notification("alice"), notification("bob")],
            1,
        ))
        .unwrap();

    tokio::time::sleep(StdDuration::from_secs(10)).await;
    let sent = bot.social.sent_messages();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].recipient, "bob");

    tokio::time::sleep(StdDuration::from_secs(900)).await;
    let sent = bot.social.sent_messages();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[1].recipient, "alice");
    assert!(bot.store.load_all().unwrap().is_empty());

    bot.shutdown().await;
}
