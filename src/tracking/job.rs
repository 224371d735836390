use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::result::TrackingResult;
use super::state::JobStatus;

/// Kind of tracking reference. Decides which carriers are eligible and
/// what shape the normalized result takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Container,
    BillOfLading,
    Booking,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Container, Category::BillOfLading, Category::Booking];

    /// Name used on the provider wire protocol.
    pub fn as_wire(&self) -> &'static str {
        match self {
            Category::Container => "container",
            Category::BillOfLading => "bill_of_lading",
            Category::Booking => "booking",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_wire())
    }
}

/// Provider-assigned identifier of a remote tracking job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

/// Catalog identifier of a carrier integration (e.g. `MSC`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CandidateId(String);

impl CandidateId {
    /// Carrier ids are matched case-insensitively, so they are stored upper-cased.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into().trim().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CandidateId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl fmt::Display for CandidateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

/// Polling policy for a single tracking job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollConfig {
    /// Fixed delay before every poll.
    pub interval: Duration,
    /// Polls allowed before an in-progress job is declared timed out.
    pub max_attempts: u32,
    /// When true, a transport error during polling consumes an attempt
    /// exactly like an in-progress answer.
    pub count_transport_errors: bool,
    /// Consecutive transport errors tolerated when they do not consume attempts.
    pub max_transport_errors: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            max_attempts: 15,
            count_transport_errors: true,
            max_transport_errors: 15,
        }
    }
}

impl PollConfig {
    /// Wall-clock budget of one candidate: `max_attempts × interval`.
    pub fn budget(&self) -> Duration {
        self.interval * self.max_attempts
    }
}

/// One remote tracking job, created after the provider accepted a `create` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingJob {
    pub job_id: JobId,
    pub provider: CandidateId,
    pub category: Category,
    pub reference: String,
    pub status: JobStatus,
    pub attempts: u32,
    /// Consecutive transport errors not charged against `attempts`.
    pub transport_errors: u32,
    pub last_error: Option<String>,
    pub result: Option<TrackingResult>,
    pub status_history: Vec<JobStatus>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TrackingJob {
    pub fn new(
        job_id: JobId,
        provider: CandidateId,
        category: Category,
        reference: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            job_id,
            provider,
            category,
            reference,
            status: JobStatus::AwaitingFirstPoll,
            attempts: 0,
            transport_errors: 0,
            last_error: None,
            result: None,
            status_history: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
