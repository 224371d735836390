//! Progress events published while requests are resolved.
//!
//! Events fan out over a tokio broadcast channel. Every event carries the
//! `request_id` of its [`TrackingRequest`](crate::tracking::TrackingRequest)
//! so one subscriber can follow many concurrent requests.

use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::tracking::{CandidateId, ResolutionOutcome, TrialState};

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProgressEvent {
    CandidateStarted {
        request_id: Uuid,
        candidate: CandidateId,
    },
    CandidatePollTick {
        request_id: Uuid,
        candidate: CandidateId,
        attempt: u32,
        max_attempts: u32,
    },
    CandidateTerminal {
        request_id: Uuid,
        candidate: CandidateId,
        state: TrialState,
        error: Option<String>,
    },
    Resolved {
        request_id: Uuid,
        outcome: Box<ResolutionOutcome>,
    },
}

impl ProgressEvent {
    pub fn request_id(&self) -> Uuid {
        match self {
            ProgressEvent::CandidateStarted { request_id, .. }
            | ProgressEvent::CandidatePollTick { request_id, .. }
            | ProgressEvent::CandidateTerminal { request_id, .. }
            | ProgressEvent::Resolved { request_id, .. } => *request_id,
        }
    }
}

/// Publishes events for one request. Sending never fails the caller; events
/// published with no subscribers are dropped.
#[derive(Debug, Clone)]
pub struct ProgressSink {
    tx: broadcast::Sender<ProgressEvent>,
    request_id: Uuid,
}

impl ProgressSink {
    pub fn new(tx: broadcast::Sender<ProgressEvent>, request_id: Uuid) -> Self {
        Self { tx, request_id }
    }

    /// A sink with no subscribers.
    pub fn detached() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self::new(tx, Uuid::nil())
    }

    pub fn candidate_started(&self, candidate: &CandidateId) {
        self.emit(ProgressEvent::CandidateStarted {
            request_id: self.request_id,
            candidate: candidate.clone(),
        });
    }

    pub fn poll_tick(&self, candidate: &CandidateId, attempt: u32, max_attempts: u32) {
        self.emit(ProgressEvent::CandidatePollTick {
            request_id: self.request_id,
            candidate: candidate.clone(),
            attempt,
            max_attempts,
        });
    }

    pub fn candidate_terminal(
        &self,
        candidate: &CandidateId,
        state: TrialState,
        error: Option<String>,
    ) {
        self.emit(ProgressEvent::CandidateTerminal {
            request_id: self.request_id,
            candidate: candidate.clone(),
            state,
            error,
        });
    }

    pub fn resolved(&self, outcome: &ResolutionOutcome) {
        self.emit(ProgressEvent::Resolved {
            request_id: self.request_id,
            outcome: Box::new(outcome.clone()),
        });
    }

    fn emit(&self, event: ProgressEvent) {
        let _ = self.tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sink_tags_events_with_request_id() {
        let (tx, mut rx) = broadcast::channel(8);
        let request_id = Uuid::new_v4();
        let sink = ProgressSink::new(tx, request_id);

        sink.candidate_started(&CandidateId::new("MSC"));
        sink.poll_tick(&CandidateId::new("MSC"), 1, 15);

        let first = rx.recv().await.unwrap();
        assert_eq!(first.request_id(), request_id);
        match rx.recv().await.unwrap() {
            ProgressEvent::CandidatePollTick {
                attempt,
                max_attempts,
                ..
            } => {
                assert_eq!(attempt, 1);
                assert_eq!(max_attempts, 15);
            }
            other => panic!("expected poll tick, got {other:?}"),
        }
    }

    #[test]
    fn detached_sink_drops_events() {
        let sink = ProgressSink::detached();
        sink.candidate_terminal(&CandidateId::new("ZIM"), TrialState::Failed, None);
    }

    #[test]
    fn events_serialize_with_tag() {
        let event = ProgressEvent::CandidateStarted {
            request_id: Uuid::nil(),
            candidate: CandidateId::new("ONE"),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "candidate_started");
        assert_eq!(json["candidate"], "ONE");
    }
}
