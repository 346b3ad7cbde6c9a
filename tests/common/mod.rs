//! Common test utilities

use std::sync::Arc;

use chrono::{Duration, Utc};

use windfall::config::Config;
use windfall::models::{EligibilityThresholds, GiveawayKind, GiveawayRequest};
use windfall::pipeline::GiveawayPipeline;
use windfall::platform::{Comment, InboxItem, InboxKind, MockPasteClient, MockSocialClient, Post};
use windfall::scheduler::{command_channel, Executor, JobStore, MemoryJobStore, SchedulerHandle};

/// A fully wired bot against in-memory collaborators, with the scheduler
/// executor running on its own task.
pub struct TestBot {
    pub social: Arc<MockSocialClient>,
    pub paste: Arc<MockPasteClient>,
    pub pipeline: Arc<GiveawayPipeline>,
    pub handle: SchedulerHandle,
    pub store: Arc<dyn JobStore>,
    pub join: tokio::task::JoinHandle<()>,
}

impl TestBot {
    #[allow(dead_code)]
    pub async fn shutdown(self) {
        self.handle.shutdown().unwrap();
        self.join.await.unwrap();
    }
}

#[allow(dead_code)]
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.platform.bot_username = "windfall-bot".to_string();
    config
}

#[allow(dead_code)]
pub fn spawn_bot(config: Config) -> TestBot {
    let social = Arc::new(MockSocialClient::new());
    let paste = Arc::new(MockPasteClient::new());
    let store: Arc<dyn JobStore> = Arc::new(MemoryJobStore::new());
    let (handle, rx) = command_channel();
    let pipeline = Arc::new(GiveawayPipeline::new(
        social.clone(),
        paste.clone(),
        handle.clone(),
        store.clone(),
        config,
    ));
    let executor = Executor::new(store.clone(), pipeline.clone(), rx).unwrap();
    let join = tokio::spawn(async move {
        executor.run().await.unwrap();
    });
    TestBot {
        social,
        paste,
        pipeline,
        handle,
        store,
        join,
    }
}

#[allow(dead_code)]
pub fn giveaway_message(author: &str, body: &str) -> InboxItem {
    InboxItem {
        id: format!("t4_{author}"),
        kind: InboxKind::Message,
        author: Some(author.to_string()),
        subject: "giveaway".to_string(),
        body: body.to_string(),
        parent_id: None,
        comment_id: None,
    }
}

#[allow(dead_code)]
pub fn mention(author: &str, comment_id: &str, body: &str) -> InboxItem {
    InboxItem {
        id: format!("t1_{comment_id}"),
        kind: InboxKind::Mention,
        author: Some(author.to_string()),
        subject: "username mention".to_string(),
        body: body.to_string(),
        parent_id: Some("t3_host".to_string()),
        comment_id: Some(comment_id.to_string()),
    }
}

#[allow(dead_code)]
pub fn post(id: &str, author: &str, title: &str) -> Post {
    Post {
        id: id.to_string(),
        title: title.to_string(),
        body: String::new(),
        author: author.to_string(),
        url: format!("/r/test/{id}"),
    }
}

#[allow(dead_code)]
pub fn top_level(id: &str, author: &str, body: &str, offset_secs: i64) -> Comment {
    Comment {
        id: id.to_string(),
        author: Some(author.to_string()),
        body: body.to_string(),
        created_at: Utc::now() + Duration::seconds(offset_secs),
        parent_id: "t3_p1".to_string(),
        post_id: "p1".to_string(),
    }
}

#[allow(dead_code)]
pub fn random_request(winner_count: usize, codes: &[&str]) -> GiveawayRequest {
    GiveawayRequest {
        kind: GiveawayKind::Random,
        close_time: Utc::now() + Duration::hours(1),
        winner_count,
        is_mention: false,
        thresholds: EligibilityThresholds::default(),
        codes: codes.iter().map(|c| c.to_string()).collect(),
    }
}
