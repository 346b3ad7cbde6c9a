//! Serial job executor.
//!
//! All lifecycle work runs on one task: the executor owns the pending-job
//! table, sleeps until the earliest `next_run`, and fires due jobs one at a
//! time. Handlers therefore never race each other, and every mutation goes
//! through the command channel so callers on other tasks stay decoupled.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::error::SchedulerError;
use super::job::{Job, JobId, JobTrigger};
use super::store::JobStore;

/// Executes the payload of a fired job.
#[async_trait]
pub trait JobRunner: Send + Sync {
    async fn run(&self, job: &Job) -> crate::error::Result<()>;
}

enum Command {
    Schedule(Job),
    Cancel(JobId),
    Shutdown,
}

/// Cloneable front door to the executor. The executor stops when every
/// handle is dropped or [`SchedulerHandle::shutdown`] is called; the runner
/// itself holds a handle, so a long-lived deployment uses `shutdown`.
#[derive(Clone)]
pub struct SchedulerHandle {
    tx: mpsc::UnboundedSender<Command>,
}

impl SchedulerHandle {
    pub fn schedule(&self, job: Job) -> Result<(), SchedulerError> {
        self.tx
            .send(Command::Schedule(job))
            .map_err(|_| SchedulerError::Shutdown)
    }

    pub fn cancel(&self, id: JobId) -> Result<(), SchedulerError> {
        self.tx
            .send(Command::Cancel(id))
            .map_err(|_| SchedulerError::Shutdown)
    }

    /// Stop the executor after it drains commands queued before this one.
    pub fn shutdown(&self) -> Result<(), SchedulerError> {
        self.tx
            .send(Command::Shutdown)
            .map_err(|_| SchedulerError::Shutdown)
    }
}

/// Receiving half of the command channel, consumed by [`Executor::new`].
pub struct CommandReceiver {
    rx: mpsc::UnboundedReceiver<Command>,
}

/// Create the command channel before the executor exists, so the job runner
/// can hold a [`SchedulerHandle`] to schedule follow-up work.
pub fn command_channel() -> (SchedulerHandle, CommandReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (SchedulerHandle { tx }, CommandReceiver { rx })
}

/// The single-task scheduler loop.
pub struct Executor {
    store: Arc<dyn JobStore>,
    runner: Arc<dyn JobRunner>,
    rx: CommandReceiver,
    jobs: HashMap<String, Job>,
    epoch: tokio::time::Instant,
    epoch_wall: DateTime<Utc>,
}

impl Executor {
    /// Build the executor, reloading any jobs the store persisted.
    pub fn new(
        store: Arc<dyn JobStore>,
        runner: Arc<dyn JobRunner>,
        rx: CommandReceiver,
    ) -> Result<Self, SchedulerError> {
        let mut jobs = HashMap::new();
        for job in store.load_all()? {
            jobs.insert(job.id.to_string(), job);
        }
        if !jobs.is_empty() {
            info!(count = jobs.len(), "resuming persisted jobs");
        }
        Ok(Self {
            store,
            runner,
            rx,
            jobs,
            epoch: tokio::time::Instant::now(),
            epoch_wall: Utc::now(),
        })
    }

    /// Scheduler time: the wall clock at startup, advanced by the runtime
    /// clock. Sleeping and firing read the same timeline, which also keeps
    /// interval re-arms honest under `tokio::time::pause`.
    fn now(&self) -> DateTime<Utc> {
        let elapsed = chrono::Duration::from_std(self.epoch.elapsed())
            .unwrap_or_else(|_| chrono::Duration::zero());
        self.epoch_wall + elapsed
    }

    /// Run until shutdown is requested or every [`SchedulerHandle`] is
    /// dropped.
    pub async fn run(mut self) -> Result<(), SchedulerError> {
        loop {
            let next_due = self.jobs.values().map(|job| job.next_run).min();
            let keep_going = match next_due {
                Some(due_at) => {
                    let wait = (due_at - self.now()).to_std().unwrap_or(Duration::ZERO);
                    tokio::select! {
                        command = self.rx.rx.recv() => self.apply(command)?,
                        _ = tokio::time::sleep(wait) => {
                            let cutoff = due_at.max(self.now());
                            self.fire_due(cutoff).await?
                        }
                    }
                }
                None => {
                    let command = self.rx.rx.recv().await;
                    self.apply(command)?
                }
            };
            if !keep_going {
                break;
            }
        }
        info!("scheduler shut down");
        Ok(())
    }

    /// Apply one command; `Ok(false)` means the loop should stop.
    fn apply(&mut self, command: Option<Command>) -> Result<bool, SchedulerError> {
        match command {
            None | Some(Command::Shutdown) => return Ok(false),
            Some(Command::Schedule(job)) => {
                debug!(job = %job.id, next_run = %job.next_run, "job scheduled");
                self.store.upsert(&job)?;
                self.jobs.insert(job.id.to_string(), job);
            }
            Some(Command::Cancel(id)) => {
                if self.jobs.remove(&id.to_string()).is_some() {
                    debug!(job = %id, "job cancelled");
                    self.store.remove(&id)?;
                } else {
                    debug!(job = %id, "cancel of unknown job ignored");
                }
            }
        }
        Ok(true)
    }

    /// Fire every job due at or before `cutoff`, earliest first; `Ok(false)`
    /// means a shutdown arrived mid-batch. One-shot jobs are consumed
    /// whether or not the handler succeeds; interval jobs re-arm relative to
    /// completion time, coalescing missed ticks. Queued commands are applied
    /// between jobs so a cancel issued by one handler stops a batch peer
    /// that has not fired yet.
    async fn fire_due(&mut self, cutoff: DateTime<Utc>) -> Result<bool, SchedulerError> {
        let mut due: Vec<(DateTime<Utc>, String)> = self
            .jobs
            .values()
            .filter(|job| job.next_run <= cutoff)
            .map(|job| (job.next_run, job.id.to_string()))
            .collect();
        due.sort();

        for (_, key) in due {
            while let Ok(command) = self.rx.rx.try_recv() {
                if !self.apply(Some(command))? {
                    return Ok(false);
                }
            }
            let Some(job) = self.jobs.get(&key).cloned() else {
                debug!(job = %key, "due job cancelled before firing");
                continue;
            };
            if job.next_run > cutoff {
                continue;
            }

            match job.trigger {
                JobTrigger::OneShot => {
                    self.jobs.remove(&key);
                    self.store.remove(&job.id)?;
                }
                JobTrigger::Interval { every_secs } => {
                    let next_run = self.now() + chrono::Duration::seconds(every_secs as i64);
                    if let Some(pending) = self.jobs.get_mut(&key) {
                        pending.next_run = next_run;
                        self.store.upsert(pending)?;
                    }
                }
            }

            debug!(job = %job.id, "firing job");
            if let Err(e) = self.runner.run(&job).await {
                match job.trigger {
                    JobTrigger::OneShot => error!(job = %job.id, error = %e, "job failed"),
                    JobTrigger::Interval { .. } => {
                        warn!(job = %job.id, error = %e, "job tick failed, will retry on next interval")
                    }
                }
            }
        }
        Ok(true)
    }
}
