use anyhow::{Context, Result};

use windfall::config::Config;
use windfall::scheduler::{JobStore, JobTrigger, SqliteJobStore};

/// List pending giveaway jobs from the persistent store.
pub fn jobs(config: &Config) -> Result<()> {
    let store = SqliteJobStore::new(&config.scheduler.db_path)
        .with_context(|| format!("Failed to open {}", config.scheduler.db_path.display()))?;

    let mut jobs = store.load_all()?;
    if jobs.is_empty() {
        println!("No pending jobs.");
        return Ok(());
    }
    jobs.sort_by_key(|job| job.next_run);

    for job in jobs {
        let trigger = match job.trigger {
            JobTrigger::OneShot => "one-shot".to_string(),
            JobTrigger::Interval { every_secs } => format!("every {every_secs}s"),
        };
        println!(
            "{:<40} {:<14} next run {}",
            job.id.to_string(),
            trigger,
            job.next_run.format("%Y-%m-%d %H:%M:%S UTC")
        );
    }
    Ok(())
}
