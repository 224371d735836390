//! Scripted in-memory `TrackingClient` shared by the engine and supervisor tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::time::Instant;

use crate::provider::{ClientError, JobSnapshot, TrackingClient};
use crate::registry::JobRegistry;
use crate::supervisor::Ticker;
use crate::tracking::{CandidateId, Category, JobId};

#[derive(Debug, Clone)]
pub enum Step {
    Snapshot(JobSnapshot),
    Transport,
}

pub fn in_progress() -> Step {
    snapshot("in-progress", None, None)
}

pub fn succeeded() -> Step {
    snapshot(
        "succeeded",
        None,
        Some(json!({"carrier": "Carrier", "status": "IN_TRANSIT"})),
    )
}

pub fn succeeded_with(tracking: serde_json::Value) -> Step {
    snapshot("succeeded", None, Some(tracking))
}

pub fn failed(detail: &str) -> Step {
    snapshot("failed", Some(detail), None)
}

pub fn no_tracking() -> Step {
    snapshot("succeeded", None, None)
}

fn snapshot(status: &str, exception: Option<&str>, tracking: Option<serde_json::Value>) -> Step {
    Step::Snapshot(JobSnapshot {
        status: Some(status.to_string()),
        exception: exception.map(str::to_string),
        tracking,
    })
}

enum CreateScript {
    Accept,
    Reject,
    Unreachable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Create(CandidateId),
    Fetch(JobId),
    Refresh(JobId),
}

/// Each accepted candidate gets job id `job-<ID>`. Poll scripts are consumed
/// in order and the last step repeats forever.
#[derive(Default)]
pub struct ScriptedClient {
    creates: Mutex<HashMap<CandidateId, CreateScript>>,
    polls: Mutex<HashMap<JobId, VecDeque<Step>>>,
    calls: Mutex<Vec<Call>>,
    fetch_times: Mutex<Vec<Instant>>,
    watched: Option<JobRegistry>,
    active_during_fetch: Mutex<Vec<bool>>,
    create_latency: Option<Duration>,
    fetch_latency: Option<Duration>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn job_id(candidate: &str) -> JobId {
        JobId::new(format!("job-{}", CandidateId::new(candidate)))
    }

    pub fn candidate(self, id: &str, steps: Vec<Step>) -> Self {
        self.creates
            .lock()
            .unwrap()
            .insert(CandidateId::new(id), CreateScript::Accept);
        self.polls
            .lock()
            .unwrap()
            .insert(Self::job_id(id), steps.into_iter().collect());
        self
    }

    pub fn rejecting(self, id: &str) -> Self {
        self.creates
            .lock()
            .unwrap()
            .insert(CandidateId::new(id), CreateScript::Reject);
        self
    }

    pub fn unreachable(self, id: &str) -> Self {
        self.creates
            .lock()
            .unwrap()
            .insert(CandidateId::new(id), CreateScript::Unreachable);
        self
    }

    /// Record `registry.is_active(job)` on every fetch.
    pub fn watching(mut self, registry: JobRegistry) -> Self {
        self.watched = Some(registry);
        self
    }

    /// Every `create` answers only after `latency` has passed.
    pub fn with_create_latency(mut self, latency: Duration) -> Self {
        self.create_latency = Some(latency);
        self
    }

    /// Every `fetch` answers only after `latency` has passed.
    pub fn with_fetch_latency(mut self, latency: Duration) -> Self {
        self.fetch_latency = Some(latency);
        self
    }

    /// Replace the remaining poll script of an existing job.
    pub fn script(&self, job_id: &JobId, steps: Vec<Step>) {
        self.polls
            .lock()
            .unwrap()
            .insert(job_id.clone(), steps.into_iter().collect());
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn created(&self) -> Vec<CandidateId> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Create(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    pub fn fetch_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Fetch(_)))
            .count()
    }

    pub fn fetch_times(&self) -> Vec<Instant> {
        self.fetch_times.lock().unwrap().clone()
    }

    pub fn active_during_fetch(&self) -> Vec<bool> {
        self.active_during_fetch.lock().unwrap().clone()
    }
}

#[async_trait]
impl TrackingClient for ScriptedClient {
    async fn create(
        &self,
        _reference: &str,
        _category: Category,
        provider: &CandidateId,
    ) -> Result<JobId, ClientError> {
        self.calls.lock().unwrap().push(Call::Create(provider.clone()));
        if let Some(latency) = self.create_latency {
            tokio::time::sleep(latency).await;
        }
        match self.creates.lock().unwrap().get(provider) {
            Some(CreateScript::Accept) => Ok(Self::job_id(provider.as_str())),
            Some(CreateScript::Reject) | None => Err(ClientError::CreateRejected {
                status: 422,
                reason: format!("{provider} cannot track this reference"),
            }),
            Some(CreateScript::Unreachable) => {
                Err(ClientError::Transport("connection refused".into()))
            }
        }
    }

    async fn fetch(&self, job_id: &JobId) -> Result<JobSnapshot, ClientError> {
        self.calls.lock().unwrap().push(Call::Fetch(job_id.clone()));
        self.fetch_times.lock().unwrap().push(Instant::now());
        if let Some(registry) = &self.watched {
            self.active_during_fetch
                .lock()
                .unwrap()
                .push(registry.is_active(job_id));
        }
        if let Some(latency) = self.fetch_latency {
            tokio::time::sleep(latency).await;
        }

        let step = {
            let mut polls = self.polls.lock().unwrap();
            let steps = polls
                .get_mut(job_id)
                .ok_or_else(|| ClientError::Transport(format!("unknown job {job_id}")))?;
            if steps.len() > 1 {
                steps.pop_front()
            } else {
                steps.front().cloned()
            }
        };

        match step {
            Some(Step::Snapshot(snapshot)) => Ok(snapshot),
            Some(Step::Transport) | None => Err(ClientError::Transport("connection reset".into())),
        }
    }

    async fn request_refresh(&self, job_id: &JobId) -> Result<(), ClientError> {
        self.calls.lock().unwrap().push(Call::Refresh(job_id.clone()));
        Ok(())
    }
}

/// Records requested waits and returns immediately.
#[derive(Default)]
pub struct RecordingTicker {
    waits: Mutex<Vec<Duration>>,
}

impl RecordingTicker {
    pub fn waits(&self) -> Vec<Duration> {
        self.waits.lock().unwrap().clone()
    }
}

#[async_trait]
impl Ticker for RecordingTicker {
    async fn wait(&self, period: Duration) {
        self.waits.lock().unwrap().push(period);
        tokio::task::yield_now().await;
    }
}
