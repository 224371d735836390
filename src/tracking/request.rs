use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::job::{CandidateId, Category, JobId, TrackingJob};
use super::result::TrackingResult;

/// How the carrier for a request is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// The caller names the carrier; no fallback.
    Manual,
    /// Carriers from the catalog are tried in order until one resolves.
    AutoDetect,
}

/// A caller's request to resolve one tracking reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingRequest {
    pub request_id: Uuid,
    pub reference: String,
    pub category: Category,
    pub mode: Mode,
    pub explicit_provider: Option<CandidateId>,
}

impl TrackingRequest {
    pub fn manual(reference: &str, category: Category, provider: CandidateId) -> Self {
        Self::build(reference, category, Mode::Manual, Some(provider))
    }

    pub fn auto_detect(reference: &str, category: Category) -> Self {
        Self::build(reference, category, Mode::AutoDetect, None)
    }

    fn build(
        reference: &str,
        category: Category,
        mode: Mode,
        explicit_provider: Option<CandidateId>,
    ) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            reference: reference.trim().to_string(),
            category,
            mode,
            explicit_provider,
        }
    }
}

/// How a single candidate trial ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrialState {
    /// Provider declined the `create` call; nothing was polled.
    CreateRejected,
    /// `create` failed on the transport; nothing was polled.
    TransportError,
    Succeeded,
    Failed,
    TimedOut,
    /// The request was cancelled while this trial was running.
    Abandoned,
}

impl fmt::Display for TrialState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TrialState::CreateRejected => "CreateRejected",
            TrialState::TransportError => "TransportError",
            TrialState::Succeeded => "Succeeded",
            TrialState::Failed => "Failed",
            TrialState::TimedOut => "TimedOut",
            TrialState::Abandoned => "Abandoned",
        };
        f.pad(label)
    }
}

/// One entry of the per-candidate trial log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialRecord {
    pub candidate: CandidateId,
    pub state: TrialState,
    pub error: Option<String>,
    pub job_id: Option<JobId>,
    pub attempts: u32,
}

/// Final, immutable output of the engine for one `TrackingRequest`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionOutcome {
    pub request_id: Uuid,
    pub reference: String,
    pub category: Category,
    pub mode: Mode,
    pub winner: Option<CandidateId>,
    /// Attempts of the winning trial, or the total over all trials when none won.
    pub attempts: u32,
    pub candidates_tried: u32,
    pub per_candidate_log: Vec<TrialRecord>,
    pub result: Option<TrackingResult>,
    /// Winning job, kept so the caller can request a refresh later.
    pub job: Option<TrackingJob>,
    /// True when the search stopped because its aggregate budget ran out.
    pub budget_exhausted: bool,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_ms: i64,
}

impl ResolutionOutcome {
    pub fn is_resolved(&self) -> bool {
        self.winner.is_some()
    }
}
