//! Job persistence.
//!
//! Jobs outlive the process: every schedule and cancel writes through to
//! SQLite, and startup reloads whatever was pending. [`MemoryJobStore`]
//! backs the fast tests.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection};
use tracing::{debug, info};

use crate::models::Identifier;

use super::error::SchedulerError;
use super::job::{Job, JobId};

/// Durable storage for pending jobs.
pub trait JobStore: Send + Sync {
    /// Insert or replace the job under its key.
    fn upsert(&self, job: &Job) -> Result<(), SchedulerError>;

    /// Remove a job. Removing an absent key is not an error.
    fn remove(&self, id: &JobId) -> Result<(), SchedulerError>;

    /// All pending jobs, in no particular order.
    fn load_all(&self) -> Result<Vec<Job>, SchedulerError>;

    /// Whether any pending job carries this giveaway identifier.
    fn identifier_in_use(&self, identifier: &Identifier) -> Result<bool, SchedulerError>;
}

/// SQLite-backed [`JobStore`].
pub struct SqliteJobStore {
    conn: Mutex<Connection>,
}

impl SqliteJobStore {
    pub fn new(path: impl AsRef<Path>) -> Result<Self, SchedulerError> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.create_schema()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self, SchedulerError> {
        let store = Self {
            conn: Mutex::new(Connection::open_in_memory()?),
        };
        store.create_schema()?;
        Ok(store)
    }

    fn create_schema(&self) -> Result<(), SchedulerError> {
        let conn = self.lock();
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS jobs (
                key         TEXT PRIMARY KEY,
                identifier  TEXT NOT NULL,
                requester   TEXT NOT NULL,
                stage       TEXT NOT NULL,
                trigger     TEXT NOT NULL,
                payload     TEXT NOT NULL,
                next_run    TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_jobs_identifier ON jobs (identifier);
            "#,
        )?;
        debug!("job store schema ready");
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        match self.conn.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl JobStore for SqliteJobStore {
    fn upsert(&self, job: &Job) -> Result<(), SchedulerError> {
        let conn = self.lock();
        conn.execute(
            r#"
            INSERT INTO jobs (key, identifier, requester, stage, trigger, payload, next_run)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT (key) DO UPDATE SET
                trigger = excluded.trigger,
                payload = excluded.payload,
                next_run = excluded.next_run
            "#,
            params![
                job.id.to_string(),
                job.id.identifier.to_string(),
                job.id.requester,
                job.id.stage.to_string(),
                serde_json::to_string(&job.trigger)?,
                serde_json::to_string(&job.payload)?,
                job.next_run.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn remove(&self, id: &JobId) -> Result<(), SchedulerError> {
        let conn = self.lock();
        let removed = conn.execute("DELETE FROM jobs WHERE key = ?1", params![id.to_string()])?;
        if removed == 0 {
            debug!(job = %id, "remove of absent job ignored");
        }
        Ok(())
    }

    fn load_all(&self) -> Result<Vec<Job>, SchedulerError> {
        let conn = self.lock();
        let mut stmt = conn.prepare("SELECT key, trigger, payload, next_run FROM jobs")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;

        let mut jobs = Vec::new();
        for row in rows {
            let (key, trigger, payload, next_run) = row?;
            jobs.push(Job {
                id: key.parse()?,
                trigger: serde_json::from_str(&trigger)?,
                payload: serde_json::from_str(&payload)?,
                next_run: chrono::DateTime::parse_from_rfc3339(&next_run)
                    .map_err(|e| SchedulerError::InvalidKey(format!("bad next_run: {e}")))?
                    .with_timezone(&chrono::Utc),
            });
        }
        info!(count = jobs.len(), "loaded pending jobs");
        Ok(jobs)
    }

    fn identifier_in_use(&self, identifier: &Identifier) -> Result<bool, SchedulerError> {
        let conn = self.lock();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM jobs WHERE identifier = ?1",
            params![identifier.to_string()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}

/// In-memory [`JobStore`] for tests.
#[derive(Default)]
pub struct MemoryJobStore {
    jobs: Mutex<HashMap<String, Job>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl JobStore for MemoryJobStore {
    fn upsert(&self, job: &Job) -> Result<(), SchedulerError> {
        self.jobs
            .lock()
            .unwrap()
            .insert(job.id.to_string(), job.clone());
        Ok(())
    }

    fn remove(&self, id: &JobId) -> Result<(), SchedulerError> {
        self.jobs.lock().unwrap().remove(&id.to_string());
        Ok(())
    }

    fn load_all(&self) -> Result<Vec<Job>, SchedulerError> {
        Ok(self.jobs.lock().unwrap().values().cloned().collect())
    }

    fn identifier_in_use(&self, identifier: &Identifier) -> Result<bool, SchedulerError> {
        Ok(self
            .jobs
            .lock()
            .unwrap()
            .values()
            .any(|job| &job.id.identifier == identifier))
    }
}
