use thiserror::Error;

use crate::tracking::{CandidateId, ResolutionOutcome, TrialState};

/// Caller-facing failures of a resolution.
///
/// Rejections, transport faults, mismatches and timeouts of individual
/// candidates are handled inside the engine; they only surface here through
/// the trial log of the carried outcome.
#[derive(Debug, Error)]
pub enum ResolutionError {
    #[error("invalid tracking request: {0}")]
    InvalidRequest(String),

    #[error("unknown carrier: {0}")]
    UnknownProvider(CandidateId),

    /// Manual mode: the single named carrier did not resolve the reference.
    #[error("carrier {candidate} could not resolve the reference: {state}")]
    CandidateFailed {
        candidate: CandidateId,
        state: TrialState,
        outcome: Box<ResolutionOutcome>,
    },

    /// Auto-detect mode: every candidate was tried and none resolved.
    #[error("no carrier resolved the reference after {candidates_tried} candidate(s)")]
    AggregateFailure {
        candidates_tried: u32,
        outcome: Box<ResolutionOutcome>,
    },

    #[error("resolution cancelled")]
    Cancelled { outcome: Box<ResolutionOutcome> },

    #[error("resolution task failed: {0}")]
    TaskFailed(String),
}

impl ResolutionError {
    /// Outcome recorded up to the failure, with its per-candidate log.
    pub fn outcome(&self) -> Option<&ResolutionOutcome> {
        match self {
            ResolutionError::CandidateFailed { outcome, .. }
            | ResolutionError::AggregateFailure { outcome, .. }
            | ResolutionError::Cancelled { outcome } => Some(outcome),
            ResolutionError::InvalidRequest(_)
            | ResolutionError::UnknownProvider(_)
            | ResolutionError::TaskFailed(_) => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}
