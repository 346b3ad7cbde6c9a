use anyhow::{Context, Result};
use std::sync::Arc;

use windfall::config::Config;
use windfall::pipeline::GiveawayPipeline;
use windfall::platform::{PastebinClient, RedditClient};
use windfall::scheduler::{command_channel, Executor, SqliteJobStore};

/// Run the bot until interrupted: resume persisted jobs, then poll the inbox
/// for new requests while the executor fires scheduled work.
pub async fn run(config: Config) -> Result<()> {
    config.validate()?;

    let social = Arc::new(
        RedditClient::new(config.credentials()).context("Failed to build platform client")?,
    );
    let paste = Arc::new(
        PastebinClient::new(config.platform.paste_api_key.clone())
            .context("Failed to build paste client")?,
    );

    if let Some(parent) = config.scheduler.db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }
    let store = Arc::new(
        SqliteJobStore::new(&config.scheduler.db_path).context("Failed to open job store")?,
    );

    let (handle, rx) = command_channel();
    let pipeline = Arc::new(GiveawayPipeline::new(
        social,
        paste,
        handle.clone(),
        store.clone(),
        config.clone(),
    ));
    let executor = Executor::new(store, pipeline.clone(), rx)?;
    let executor_task = tokio::spawn(executor.run());

    tracing::info!(
        bot = %config.platform.bot_username,
        poll_secs = config.giveaway.inbox_poll_secs,
        "bot running"
    );

    let mut poll = tokio::time::interval(config.inbox_poll_interval());
    loop {
        tokio::select! {
            _ = poll.tick() => {
                if let Err(e) = pipeline.poll_inbox().await {
                    tracing::error!(error = %e, "inbox poll failed");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutdown signal received");
                break;
            }
        }
    }

    handle.shutdown()?;
    executor_task.await??;
    Ok(())
}
