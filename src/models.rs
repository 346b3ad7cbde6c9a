// Core data structures for the windfall giveaway pipeline

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Giveaway type, closed over the three supported selection algorithms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GiveawayKind {
    /// Uniform random pick among commenters.
    Random,
    /// Closest number guess inside `[min, max]` (both 0 means unrestricted).
    Number { guess: i64, min: i64, max: i64 },
    /// Earliest comments containing the keyword as a case-insensitive substring.
    Keyword { word: String },
}

impl GiveawayKind {
    /// Short label used in log lines and announcements.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Random => "random",
            Self::Number { .. } => "number",
            Self::Keyword { .. } => "keyword",
        }
    }
}

impl std::fmt::Display for GiveawayKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Account-metric thresholds applied to winner candidates.
///
/// A threshold of zero disables that check; when all three are zero no
/// filtering happens at all. Active checks are strictly-greater-than.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityThresholds {
    pub min_post_karma: i64,
    pub min_comment_karma: i64,
    pub min_account_age_days: i64,
}

impl EligibilityThresholds {
    /// Whether any threshold is set, i.e. whether account checks run at all.
    pub fn is_active(&self) -> bool {
        self.min_post_karma > 0 || self.min_comment_karma > 0 || self.min_account_age_days > 0
    }

    /// Check metrics against the active thresholds.
    pub fn passes(&self, metrics: &AccountMetrics, now: DateTime<Utc>) -> bool {
        if self.min_post_karma > 0 && metrics.post_karma <= self.min_post_karma {
            return false;
        }
        if self.min_comment_karma > 0 && metrics.comment_karma <= self.min_comment_karma {
            return false;
        }
        if self.min_account_age_days > 0 && metrics.age_days(now) <= self.min_account_age_days {
            return false;
        }
        true
    }
}

/// A parsed giveaway request, held only as job payload for its lifetime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GiveawayRequest {
    #[serde(flatten)]
    pub kind: GiveawayKind,
    pub close_time: DateTime<Utc>,
    pub winner_count: usize,
    pub is_mention: bool,
    pub thresholds: EligibilityThresholds,
    /// Reward codes, in the order they were supplied. Empty for mentions.
    pub codes: Vec<String>,
}

/// Six-digit numeric token correlating a confirmation post to its giveaway.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identifier(String);

impl Identifier {
    pub const DIGITS: usize = 6;

    /// Draw a random identifier in `100000..=999999`.
    pub fn generate<R: Rng>(rng: &mut R) -> Self {
        Self(rng.gen_range(100_000..=999_999u32).to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for Identifier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() == Self::DIGITS && s.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Self(s.to_string()))
        } else {
            Err(format!("not a {}-digit identifier: {s:?}", Self::DIGITS))
        }
    }
}

/// A top-level comment kept for winner selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentRecord {
    pub id: String,
    pub author: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// What earned a winner their spot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "evidence", rename_all = "snake_case")]
pub enum WinnerEvidence {
    None,
    Number { value: i64 },
    Keyword { matched: String },
}

/// A selected winner with their assigned reward codes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WinnerRecord {
    pub author: String,
    pub evidence: WinnerEvidence,
    pub codes: Vec<String>,
}

impl WinnerRecord {
    pub fn new(author: impl Into<String>, evidence: WinnerEvidence) -> Self {
        Self {
            author: author.into(),
            evidence,
            codes: Vec::new(),
        }
    }
}

/// Account reputation metrics fetched from the platform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccountMetrics {
    pub post_karma: i64,
    pub comment_karma: i64,
    pub created_at: DateTime<Utc>,
}

impl AccountMetrics {
    /// Whole days since account creation.
    pub fn age_days(&self, now: DateTime<Utc>) -> i64 {
        (now - self.created_at).num_days()
    }
}

/// A pending winner notification, retried across delivery rounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub recipient: String,
    pub subject: String,
    pub body: String,
}
