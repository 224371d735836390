//! Fixed-interval polling of one tracking job to a terminal status.
//!
//! [`PollSupervisor::run`] waits one interval before every fetch, feeds each
//! snapshot through the [`StateMachine`], and keeps the job registered in the
//! [`JobRegistry`] until it reaches a terminal status. Waiting goes through a
//! [`Ticker`] so tests can drive virtual time.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::events::ProgressSink;
use crate::projector::ResultProjector;
use crate::provider::{JobSnapshot, RemoteStatus, TrackingClient};
use crate::registry::JobRegistry;
use crate::tracking::{
    Category, JobStatus, PollConfig, PollObservation, StateMachine, TrackingJob, Transition,
    TrialState,
};

/// Source of the delay between polls.
#[async_trait]
pub trait Ticker: Send + Sync {
    async fn wait(&self, period: Duration);
}

/// Sleeps on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioTicker;

#[async_trait]
impl Ticker for TokioTicker {
    async fn wait(&self, period: Duration) {
        tokio::time::sleep(period).await;
    }
}

/// Why [`PollSupervisor::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollExit {
    Succeeded,
    Failed,
    TimedOut,
    /// `abandon()` was called; the job keeps its last non-terminal status.
    Abandoned,
    /// Another poll already owns this job id.
    AlreadyActive,
}

impl PollExit {
    fn from_status(status: JobStatus) -> Self {
        match status {
            JobStatus::Succeeded => PollExit::Succeeded,
            JobStatus::Failed => PollExit::Failed,
            JobStatus::TimedOut => PollExit::TimedOut,
            JobStatus::AwaitingFirstPoll | JobStatus::Polling => PollExit::Abandoned,
        }
    }
}

impl From<PollExit> for TrialState {
    fn from(exit: PollExit) -> Self {
        match exit {
            PollExit::Succeeded => TrialState::Succeeded,
            PollExit::Failed => TrialState::Failed,
            PollExit::TimedOut => TrialState::TimedOut,
            PollExit::Abandoned | PollExit::AlreadyActive => TrialState::Abandoned,
        }
    }
}

/// Map a provider snapshot to what the state machine consumes.
pub fn observe(category: Category, snapshot: &JobSnapshot) -> PollObservation {
    match snapshot.remote_status() {
        RemoteStatus::InProgress => PollObservation::InProgress,
        RemoteStatus::Succeeded => match snapshot.tracking_object() {
            Some(raw) => PollObservation::Succeeded(ResultProjector::project(category, raw)),
            None => PollObservation::Mismatch,
        },
        RemoteStatus::Failed => PollObservation::Failed(
            snapshot
                .exception
                .clone()
                .filter(|detail| !detail.trim().is_empty())
                .unwrap_or_else(|| "provider reported failure".to_string()),
        ),
        RemoteStatus::Unrecognized => PollObservation::Mismatch,
    }
}

pub struct PollSupervisor {
    client: Arc<dyn TrackingClient>,
    registry: JobRegistry,
    ticker: Arc<dyn Ticker>,
    config: PollConfig,
    cancel: CancellationToken,
    progress: ProgressSink,
}

impl PollSupervisor {
    pub fn new(
        client: Arc<dyn TrackingClient>,
        registry: JobRegistry,
        config: PollConfig,
    ) -> Self {
        Self {
            client,
            registry,
            ticker: Arc::new(TokioTicker),
            config,
            cancel: CancellationToken::new(),
            progress: ProgressSink::detached(),
        }
    }

    pub fn with_ticker(mut self, ticker: Arc<dyn Ticker>) -> Self {
        self.ticker = ticker;
        self
    }

    pub fn with_progress(mut self, progress: ProgressSink) -> Self {
        self.progress = progress;
        self
    }

    /// Tie this supervisor to an outer cancellation scope.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Stop polling. No further ticks are scheduled and a response still in
    /// flight is discarded without touching the job.
    pub fn abandon(&self) {
        self.cancel.cancel();
    }

    pub async fn run(&self, job: &mut TrackingJob) -> PollExit {
        if job.is_terminal() {
            return PollExit::from_status(job.status);
        }
        let Some(guard) = self.registry.register(job, self.config.max_attempts) else {
            warn!(job_id = %job.job_id, "job is already being polled");
            return PollExit::AlreadyActive;
        };

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return PollExit::Abandoned,
                _ = self.ticker.wait(self.config.interval) => {}
            }

            let fetched = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return PollExit::Abandoned,
                fetched = self.client.fetch(&job.job_id) => fetched,
            };

            let observation = match fetched {
                Ok(snapshot) => observe(job.category, &snapshot),
                Err(err) => {
                    warn!(
                        job_id = %job.job_id,
                        provider = %job.provider,
                        error = %err,
                        "poll failed"
                    );
                    PollObservation::Transport(err.to_string())
                }
            };

            let transition = StateMachine::next(job, observation, &self.config);
            self.progress
                .poll_tick(&job.provider, job.attempts, self.config.max_attempts);

            match transition {
                Transition::Continue { attempt } => {
                    debug!(
                        job_id = %job.job_id,
                        provider = %job.provider,
                        attempt,
                        max = self.config.max_attempts,
                        "still in progress"
                    );
                    guard.record_attempt(attempt);
                }
                Transition::Complete(status) => {
                    guard.release();
                    debug!(
                        job_id = %job.job_id,
                        provider = %job.provider,
                        %status,
                        "poll finished"
                    );
                    return PollExit::from_status(status);
                }
            }
        }
    }
}
