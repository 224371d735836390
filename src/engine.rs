use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::catalog::{CandidateCatalog, CandidateProvider};
use crate::error::ResolutionError;
use crate::events::{ProgressEvent, ProgressSink};
use crate::provider::{ClientError, TrackingClient};
use crate::registry::JobRegistry;
use crate::supervisor::{PollExit, PollSupervisor, Ticker, TokioTicker, observe};
use crate::tracking::{
    Mode, PollConfig, PollObservation, ResolutionOutcome, TrackingJob, TrackingRequest,
    TrackingResult, TrialRecord, TrialState,
};

const EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineConfig {
    pub poll: PollConfig,
    /// Wall-clock budget for a whole auto-detect search. `None` means unbounded.
    pub search_budget: Option<Duration>,
}

/// Result of [`ResolutionEngine::refresh`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// A poll already owns the job; nothing was sent.
    AlreadyPolling,
    /// The provider returned no new terminal result.
    Unchanged,
    Updated(TrackingResult),
}

struct Trial {
    record: TrialRecord,
    job: Option<TrackingJob>,
}

/// Resolves tracking references against the provider, discovering the
/// carrier when the caller does not name one.
///
/// Cloning is cheap; clones share the registry and the event channel.
#[derive(Clone)]
pub struct ResolutionEngine {
    client: Arc<dyn TrackingClient>,
    catalog: Arc<CandidateCatalog>,
    registry: JobRegistry,
    ticker: Arc<dyn Ticker>,
    config: EngineConfig,
    events: broadcast::Sender<ProgressEvent>,
}

impl ResolutionEngine {
    pub fn new(
        client: Arc<dyn TrackingClient>,
        catalog: CandidateCatalog,
        config: EngineConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            client,
            catalog: Arc::new(catalog),
            registry: JobRegistry::new(),
            ticker: Arc::new(TokioTicker),
            config,
            events,
        }
    }

    pub fn with_ticker(mut self, ticker: Arc<dyn Ticker>) -> Self {
        self.ticker = ticker;
        self
    }

    /// Share a registry with other engines.
    pub fn with_registry(mut self, registry: JobRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn registry(&self) -> &JobRegistry {
        &self.registry
    }

    pub fn catalog(&self) -> &CandidateCatalog {
        &self.catalog
    }

    /// Progress events of every request run by this engine.
    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.events.subscribe()
    }

    /// Run `request` on the tokio runtime and return a handle to it.
    ///
    /// Dropping the handle cancels the search.
    pub fn submit(&self, request: TrackingRequest) -> TrackingHandle {
        let cancel = CancellationToken::new();
        let request_id = request.request_id;
        let engine = self.clone();
        let token = cancel.clone();
        let task = tokio::spawn(async move { engine.resolve_with_cancel(&request, token).await });
        TrackingHandle {
            request_id,
            cancel_on_drop: cancel.clone().drop_guard(),
            cancel,
            task,
        }
    }

    pub async fn resolve(
        &self,
        request: &TrackingRequest,
    ) -> Result<ResolutionOutcome, ResolutionError> {
        self.resolve_with_cancel(request, CancellationToken::new()).await
    }

    /// Resolve `request`, stopping early once `cancel` fires.
    ///
    /// Manual mode runs the named carrier once. Auto-detect mode tries the
    /// catalog's carriers for the category strictly one after another; a
    /// candidate starts only after the previous one reached a terminal state
    /// or failed to create its job.
    pub async fn resolve_with_cancel(
        &self,
        request: &TrackingRequest,
        cancel: CancellationToken,
    ) -> Result<ResolutionOutcome, ResolutionError> {
        let candidates = self.candidates_for(request)?;
        let progress = ProgressSink::new(self.events.clone(), request.request_id);
        let started_at = Utc::now();
        let deadline = match request.mode {
            Mode::AutoDetect => self.config.search_budget.map(|budget| Instant::now() + budget),
            Mode::Manual => None,
        };

        info!(
            request_id = %request.request_id,
            reference = %request.reference,
            category = %request.category,
            mode = ?request.mode,
            candidates = candidates.len(),
            "resolving tracking reference"
        );

        let mut log = Vec::with_capacity(candidates.len());
        let mut winner = None;
        let mut budget_exhausted = false;

        for candidate in &candidates {
            if cancel.is_cancelled() {
                break;
            }
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                warn!(request_id = %request.request_id, "search budget exhausted");
                budget_exhausted = true;
                break;
            }

            let trial = self.run_trial(request, candidate, &progress, &cancel).await;
            let succeeded = trial.record.state == TrialState::Succeeded;
            log.push(trial.record);
            if succeeded {
                winner = trial.job;
                break;
            }
        }

        let outcome = build_outcome(request, log, winner, budget_exhausted, started_at);
        progress.resolved(&outcome);
        info!(
            request_id = %request.request_id,
            winner = outcome.winner.as_ref().map(|w| w.as_str()).unwrap_or("-"),
            candidates_tried = outcome.candidates_tried,
            attempts = outcome.attempts,
            "resolution finished"
        );

        if outcome.is_resolved() {
            return Ok(outcome);
        }
        if cancel.is_cancelled() {
            return Err(ResolutionError::Cancelled {
                outcome: Box::new(outcome),
            });
        }
        if request.mode == Mode::Manual {
            if let Some(last) = outcome.per_candidate_log.last() {
                return Err(ResolutionError::CandidateFailed {
                    candidate: last.candidate.clone(),
                    state: last.state,
                    outcome: Box::new(outcome),
                });
            }
        }
        Err(ResolutionError::AggregateFailure {
            candidates_tried: outcome.candidates_tried,
            outcome: Box::new(outcome),
        })
    }

    /// Ask the provider to refresh a previously resolved job and fetch it once.
    ///
    /// A no-op while the job id is active in the registry. The refresh itself
    /// does not register the job, which is already terminal. `job` is never
    /// modified; a new result is returned only when it differs from the
    /// stored one.
    pub async fn refresh(&self, job: &TrackingJob) -> Result<RefreshOutcome, ClientError> {
        if self.registry.is_active(&job.job_id) {
            debug!(job_id = %job.job_id, "job is being polled, refresh skipped");
            return Ok(RefreshOutcome::AlreadyPolling);
        }

        self.client.request_refresh(&job.job_id).await?;
        let snapshot = self.client.fetch(&job.job_id).await?;

        let outcome = match observe(job.category, &snapshot) {
            PollObservation::Succeeded(result) if job.result.as_ref() != Some(&result) => {
                RefreshOutcome::Updated(result)
            }
            _ => RefreshOutcome::Unchanged,
        };
        Ok(outcome)
    }

    fn candidates_for(
        &self,
        request: &TrackingRequest,
    ) -> Result<Vec<CandidateProvider>, ResolutionError> {
        if request.reference.trim().is_empty() {
            return Err(ResolutionError::InvalidRequest(
                "reference must not be empty".into(),
            ));
        }
        match request.mode {
            Mode::AutoDetect => Ok(self.catalog.list(request.category)),
            Mode::Manual => {
                let id = request.explicit_provider.as_ref().ok_or_else(|| {
                    ResolutionError::InvalidRequest("manual mode requires a carrier".into())
                })?;
                let provider = self
                    .catalog
                    .get(id)
                    .ok_or_else(|| ResolutionError::UnknownProvider(id.clone()))?;
                Ok(vec![provider.clone()])
            }
        }
    }

    async fn run_trial(
        &self,
        request: &TrackingRequest,
        candidate: &CandidateProvider,
        progress: &ProgressSink,
        cancel: &CancellationToken,
    ) -> Trial {
        info!(request_id = %request.request_id, candidate = %candidate.id, "trying carrier");
        progress.candidate_started(&candidate.id);

        let created = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            created = self
                .client
                .create(&request.reference, request.category, &candidate.id) => Some(created),
        };
        let job_id = match created {
            None => return finish_trial(progress, candidate, TrialState::Abandoned, None, None),
            Some(Ok(job_id)) => job_id,
            Some(Err(err)) => {
                let state = if err.is_rejection() {
                    TrialState::CreateRejected
                } else {
                    TrialState::TransportError
                };
                warn!(candidate = %candidate.id, error = %err, "could not create tracking job");
                return finish_trial(progress, candidate, state, Some(err.to_string()), None);
            }
        };

        let mut job = TrackingJob::new(
            job_id,
            candidate.id.clone(),
            request.category,
            request.reference.clone(),
        );
        let supervisor = PollSupervisor::new(
            Arc::clone(&self.client),
            self.registry.clone(),
            self.config.poll.clone(),
        )
        .with_ticker(Arc::clone(&self.ticker))
        .with_progress(progress.clone())
        .with_cancellation(cancel.child_token());

        let exit = supervisor.run(&mut job).await;
        let error = match exit {
            PollExit::AlreadyActive => Some(format!("job {} is already being polled", job.job_id)),
            _ => job.last_error.clone(),
        };
        finish_trial(progress, candidate, exit.into(), error, Some(job))
    }
}

fn finish_trial(
    progress: &ProgressSink,
    candidate: &CandidateProvider,
    state: TrialState,
    error: Option<String>,
    job: Option<TrackingJob>,
) -> Trial {
    info!(
        candidate = %candidate.id,
        %state,
        error = error.as_deref().unwrap_or(""),
        "carrier trial finished"
    );
    progress.candidate_terminal(&candidate.id, state, error.clone());
    Trial {
        record: TrialRecord {
            candidate: candidate.id.clone(),
            state,
            error,
            job_id: job.as_ref().map(|j| j.job_id.clone()),
            attempts: job.as_ref().map_or(0, |j| j.attempts),
        },
        job,
    }
}

fn build_outcome(
    request: &TrackingRequest,
    log: Vec<TrialRecord>,
    winner: Option<TrackingJob>,
    budget_exhausted: bool,
    started_at: DateTime<Utc>,
) -> ResolutionOutcome {
    let completed_at = Utc::now();
    let attempts = match &winner {
        Some(job) => job.attempts,
        None => log.iter().map(|r| r.attempts).sum(),
    };
    ResolutionOutcome {
        request_id: request.request_id,
        reference: request.reference.clone(),
        category: request.category,
        mode: request.mode,
        winner: winner.as_ref().map(|job| job.provider.clone()),
        attempts,
        candidates_tried: log.len() as u32,
        result: winner.as_ref().and_then(|job| job.result.clone()),
        per_candidate_log: log,
        job: winner,
        budget_exhausted,
        started_at,
        completed_at,
        duration_ms: (completed_at - started_at).num_milliseconds(),
    }
}

/// A resolution running on the tokio runtime.
///
/// Dropping the handle, or the future returned by [`outcome`](Self::outcome),
/// cancels the search like [`cancel`](Self::cancel) does.
pub struct TrackingHandle {
    request_id: Uuid,
    cancel: CancellationToken,
    cancel_on_drop: DropGuard,
    task: JoinHandle<Result<ResolutionOutcome, ResolutionError>>,
}

impl TrackingHandle {
    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    /// Stop the search: the running poll is abandoned and no further
    /// candidates are tried.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub async fn outcome(self) -> Result<ResolutionOutcome, ResolutionError> {
        let Self {
            task,
            cancel_on_drop,
            ..
        } = self;
        let joined = task.await;
        let _ = cancel_on_drop.disarm();
        joined.map_err(|err| ResolutionError::TaskFailed(err.to_string()))?
    }
}
