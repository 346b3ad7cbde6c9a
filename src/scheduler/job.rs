//! Job identity, triggers and payloads.
//!
//! Every scheduled unit of work is a [`Job`]: a structured [`JobId`] keyed by
//! giveaway identifier, requester and stage, a [`JobTrigger`] saying when it
//! fires, and a serializable [`JobPayload`] carrying everything the handler
//! needs so jobs survive restarts.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{GiveawayRequest, Identifier, Notification};

use super::error::SchedulerError;

/// Lifecycle stage a job belongs to. One giveaway holds at most one live job
/// per stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    Locate,
    LocateTimeout,
    Close,
    RefreshNumbers,
    Delivery,
    Mention,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Locate => "LOCATE",
            Self::LocateTimeout => "LOCATE_TIMEOUT",
            Self::Close => "CLOSE",
            Self::RefreshNumbers => "REFRESH_NUMBERS",
            Self::Delivery => "DELIVERY",
            Self::Mention => "MENTION",
        };
        write!(f, "{s}")
    }
}

impl FromStr for Stage {
    type Err = SchedulerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LOCATE" => Ok(Self::Locate),
            "LOCATE_TIMEOUT" => Ok(Self::LocateTimeout),
            "CLOSE" => Ok(Self::Close),
            "REFRESH_NUMBERS" => Ok(Self::RefreshNumbers),
            "DELIVERY" => Ok(Self::Delivery),
            "MENTION" => Ok(Self::Mention),
            other => Err(SchedulerError::InvalidKey(format!("unknown stage {other:?}"))),
        }
    }
}

/// Structured job key, rendered as `identifier:requester:STAGE`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId {
    pub identifier: Identifier,
    pub requester: String,
    pub stage: Stage,
}

impl JobId {
    pub fn new(identifier: Identifier, requester: impl Into<String>, stage: Stage) -> Self {
        Self {
            identifier,
            requester: requester.into(),
            stage,
        }
    }

    /// The same giveaway at a different stage.
    pub fn with_stage(&self, stage: Stage) -> Self {
        Self {
            identifier: self.identifier.clone(),
            requester: self.requester.clone(),
            stage,
        }
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.identifier, self.requester, self.stage)
    }
}

impl FromStr for JobId {
    type Err = SchedulerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, ':');
        let (identifier, requester, stage) = match (parts.next(), parts.next(), parts.next()) {
            (Some(i), Some(r), Some(st)) => (i, r, st),
            _ => return Err(SchedulerError::InvalidKey(s.to_string())),
        };
        Ok(Self {
            identifier: identifier
                .parse()
                .map_err(SchedulerError::InvalidKey)?,
            requester: requester.to_string(),
            stage: stage.parse()?,
        })
    }
}

/// When a job fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobTrigger {
    /// Fire once, then the job is consumed.
    OneShot,
    /// Re-arm `every_secs` after each firing. Missed ticks coalesce into one.
    Interval { every_secs: u64 },
}

/// Work carried by a job, self-contained so a restart can resume it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "job", rename_all = "snake_case")]
pub enum JobPayload {
    /// Poll the requester's recent submissions for the identifier.
    Locate { request: GiveawayRequest },
    /// Give up on locating and notify the requester.
    LocateTimeout,
    /// Close the giveaway on the located post and pick winners. Results are
    /// edited into the announcement comment.
    Close {
        request: GiveawayRequest,
        post_id: String,
        announcement_comment_id: String,
        tracker_comment_id: Option<String>,
    },
    /// Refresh the used-numbers tracker paste.
    RefreshNumbers {
        min: i64,
        max: i64,
        post_id: String,
        tracker_comment_id: String,
        paste_key: Option<String>,
    },
    /// Send one round of winner notifications, rescheduling the failures.
    Delivery {
        notifications: Vec<Notification>,
        round: u32,
    },
    /// Close a mention-style giveaway on its host post.
    Mention {
        request: GiveawayRequest,
        post_id: String,
        mention_comment_id: String,
    },
}

impl JobPayload {
    /// The stage this payload belongs to; the key's stage must agree.
    pub fn stage(&self) -> Stage {
        match self {
            Self::Locate { .. } => Stage::Locate,
            Self::LocateTimeout => Stage::LocateTimeout,
            Self::Close { .. } => Stage::Close,
            Self::RefreshNumbers { .. } => Stage::RefreshNumbers,
            Self::Delivery { .. } => Stage::Delivery,
            Self::Mention { .. } => Stage::Mention,
        }
    }
}

/// A persisted, schedulable job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub trigger: JobTrigger,
    pub payload: JobPayload,
    pub next_run: DateTime<Utc>,
}

impl Job {
    pub fn one_shot(id: JobId, payload: JobPayload, at: DateTime<Utc>) -> Self {
        Self {
            id,
            trigger: JobTrigger::OneShot,
            payload,
            next_run: at,
        }
    }

    pub fn interval(
        id: JobId,
        payload: JobPayload,
        every_secs: u64,
        first_run: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            trigger: JobTrigger::Interval { every_secs },
            payload,
            next_run: first_run,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id() -> JobId {
        JobId::new("123456".parse().unwrap(), "alice", Stage::Locate)
    }

    #[test]
    fn test_job_id_round_trips_through_display() {
        let id = id();
        assert_eq!(id.to_string(), "123456:alice:LOCATE");
        assert_eq!("123456:alice:LOCATE".parse::<JobId>().unwrap(), id);
    }

    #[test]
    fn test_job_id_rejects_garbage() {
        assert!("123456:alice".parse::<JobId>().is_err());
        assert!("abc:alice:LOCATE".parse::<JobId>().is_err());
        assert!("123456:alice:NOPE".parse::<JobId>().is_err());
    }

    #[test]
    fn test_with_stage_keeps_giveaway_identity() {
        let timeout = id().with_stage(Stage::LocateTimeout);
        assert_eq!(timeout.to_string(), "123456:alice:LOCATE_TIMEOUT");
    }

    #[test]
    fn test_payload_stage_agreement() {
        assert_eq!(JobPayload::LocateTimeout.stage(), Stage::LocateTimeout);
        let payload = JobPayload::Delivery {
            notifications: Vec::new(),
            round: 1,
        };
        assert_eq!(payload.stage(), Stage::Delivery);
    }

    #[test]
    fn test_payload_serialization_is_tagged() {
        let payload = JobPayload::RefreshNumbers {
            min: 1,
            max: 1000,
            post_id: "p1".to_string(),
            tracker_comment_id: "c1".to_string(),
            paste_key: None,
        };
        let json = serde_json::to_string(&payload).unwrap();
        assert!(json.contains(r#""job":"refresh_numbers""#));
        let back: JobPayload = serde_json::from_str(&json).unwrap();
        assert_eq!(back, payload);
    }
}
