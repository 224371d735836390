use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::job::{PollConfig, TrackingJob};
use super::result::TrackingResult;

/// `last_error` recorded when the provider cannot service the reference at all.
pub const PROVIDER_MISMATCH: &str = "ProviderMismatch";

/// Lifecycle of a tracking job while it is being polled.
///
/// AWAITING_FIRST_POLL → POLLING → {SUCCEEDED, FAILED, TIMED_OUT}
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    AwaitingFirstPoll,
    Polling,
    Succeeded,
    Failed,
    TimedOut,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed | JobStatus::TimedOut)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::AwaitingFirstPoll => write!(f, "AWAITING_FIRST_POLL"),
            JobStatus::Polling => write!(f, "POLLING"),
            JobStatus::Succeeded => write!(f, "SUCCEEDED"),
            JobStatus::Failed => write!(f, "FAILED"),
            JobStatus::TimedOut => write!(f, "TIMED_OUT"),
        }
    }
}

/// What a single poll tick observed.
#[derive(Debug, Clone, PartialEq)]
pub enum PollObservation {
    /// Provider is still working on the job.
    InProgress,
    /// Provider finished and returned a tracking object.
    Succeeded(TrackingResult),
    /// Provider reported failure, with its exception detail.
    Failed(String),
    /// Tracking object missing or status not recognized.
    Mismatch,
    /// The fetch itself failed.
    Transport(String),
}

/// The result of applying one observation to a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Poll again after the interval.
    Continue { attempt: u32 },
    /// The job is in a terminal status.
    Complete(JobStatus),
}

/// Drives a `TrackingJob` through its poll lifecycle.
pub struct StateMachine;

impl StateMachine {
    /// Apply `observation` to `job` and return the resulting transition.
    ///
    /// Every observation except an uncounted transport error consumes one
    /// attempt. An in-progress answer keeps the job polling until
    /// `max_attempts` is reached, then times it out. Terminal jobs are never
    /// mutated again; they always return `Complete` with their status.
    pub fn next(
        job: &mut TrackingJob,
        observation: PollObservation,
        config: &PollConfig,
    ) -> Transition {
        if job.status.is_terminal() {
            return Transition::Complete(job.status);
        }

        let transition = match observation {
            PollObservation::InProgress => {
                job.attempts += 1;
                job.transport_errors = 0;
                Self::continue_or_time_out(job, config)
            }
            PollObservation::Transport(err) => {
                job.last_error = Some(err);
                if config.count_transport_errors {
                    job.attempts += 1;
                    Self::continue_or_time_out(job, config)
                } else {
                    job.transport_errors += 1;
                    if job.transport_errors >= config.max_transport_errors {
                        Transition::Complete(JobStatus::TimedOut)
                    } else {
                        Transition::Continue {
                            attempt: job.attempts,
                        }
                    }
                }
            }
            PollObservation::Succeeded(result) => {
                job.attempts += 1;
                job.last_error = None;
                job.result = Some(result);
                Transition::Complete(JobStatus::Succeeded)
            }
            PollObservation::Failed(detail) => {
                job.attempts += 1;
                job.last_error = Some(detail);
                Transition::Complete(JobStatus::Failed)
            }
            PollObservation::Mismatch => {
                job.attempts += 1;
                job.last_error = Some(PROVIDER_MISMATCH.to_string());
                Transition::Complete(JobStatus::Failed)
            }
        };

        job.status_history.push(job.status);
        job.status = match transition {
            Transition::Continue { .. } => JobStatus::Polling,
            Transition::Complete(status) => status,
        };
        job.updated_at = Utc::now();

        transition
    }

    fn continue_or_time_out(job: &TrackingJob, config: &PollConfig) -> Transition {
        if job.attempts < config.max_attempts {
            Transition::Continue {
                attempt: job.attempts,
            }
        } else {
            Transition::Complete(JobStatus::TimedOut)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::{CandidateId, Category, JobId};

    fn make_job() -> TrackingJob {
        TrackingJob::new(
            JobId::new("job-1"),
            CandidateId::new("MSC"),
            Category::Container,
            "DFSU7162007".into(),
        )
    }

    fn config(max_attempts: u32) -> PollConfig {
        PollConfig {
            max_attempts,
            ..Default::default()
        }
    }

    fn result() -> TrackingResult {
        TrackingResult::empty(Category::Container)
    }

    #[test]
    fn success_on_first_poll() {
        let mut job = make_job();
        let t = StateMachine::next(&mut job, PollObservation::Succeeded(result()), &config(15));
        assert_eq!(t, Transition::Complete(JobStatus::Succeeded));
        assert_eq!(job.status, JobStatus::Succeeded);
        assert_eq!(job.attempts, 1);
        assert!(job.result.is_some());
        assert_eq!(job.status_history, vec![JobStatus::AwaitingFirstPoll]);
    }

    #[test]
    fn in_progress_keeps_polling_then_times_out() {
        let mut job = make_job();
        let config = config(3);

        let t = StateMachine::next(&mut job, PollObservation::InProgress, &config);
        assert_eq!(t, Transition::Continue { attempt: 1 });
        assert_eq!(job.status, JobStatus::Polling);

        let t = StateMachine::next(&mut job, PollObservation::InProgress, &config);
        assert_eq!(t, Transition::Continue { attempt: 2 });

        let t = StateMachine::next(&mut job, PollObservation::InProgress, &config);
        assert_eq!(t, Transition::Complete(JobStatus::TimedOut));
        assert_eq!(job.status, JobStatus::TimedOut);
        assert_eq!(job.attempts, 3);
    }

    #[test]
    fn failure_marker_keeps_provider_detail() {
        let mut job = make_job();
        let t = StateMachine::next(
            &mut job,
            PollObservation::Failed("container not found".into()),
            &config(15),
        );
        assert_eq!(t, Transition::Complete(JobStatus::Failed));
        assert_eq!(job.last_error.as_deref(), Some("container not found"));
    }

    #[test]
    fn missing_tracking_object_is_provider_mismatch() {
        let mut job = make_job();
        StateMachine::next(&mut job, PollObservation::Mismatch, &config(15));
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.last_error.as_deref(), Some(PROVIDER_MISMATCH));
    }

    #[test]
    fn terminal_jobs_are_not_mutated() {
        let mut job = make_job();
        StateMachine::next(&mut job, PollObservation::Failed("nope".into()), &config(15));
        let before = job.clone();

        let t = StateMachine::next(&mut job, PollObservation::Succeeded(result()), &config(15));
        assert_eq!(t, Transition::Complete(JobStatus::Failed));
        assert_eq!(job, before);
    }

    #[test]
    fn counted_transport_errors_consume_attempts() {
        let mut job = make_job();
        let config = config(2);

        let t = StateMachine::next(&mut job, PollObservation::Transport("reset".into()), &config);
        assert_eq!(t, Transition::Continue { attempt: 1 });
        let t = StateMachine::next(&mut job, PollObservation::Transport("reset".into()), &config);
        assert_eq!(t, Transition::Complete(JobStatus::TimedOut));
        assert_eq!(job.last_error.as_deref(), Some("reset"));
    }

    #[test]
    fn uncounted_transport_errors_preserve_budget() {
        let mut job = make_job();
        let config = PollConfig {
            max_attempts: 2,
            count_transport_errors: false,
            max_transport_errors: 3,
            ..Default::default()
        };

        StateMachine::next(&mut job, PollObservation::InProgress, &config);
        let t = StateMachine::next(&mut job, PollObservation::Transport("502".into()), &config);
        assert_eq!(t, Transition::Continue { attempt: 1 });
        let t = StateMachine::next(&mut job, PollObservation::Transport("502".into()), &config);
        assert_eq!(t, Transition::Continue { attempt: 1 });
        assert_eq!(job.transport_errors, 2);

        let t = StateMachine::next(&mut job, PollObservation::Succeeded(result()), &config);
        assert_eq!(t, Transition::Complete(JobStatus::Succeeded));
        assert_eq!(job.attempts, 2);
    }

    #[test]
    fn uncounted_transport_errors_are_still_bounded() {
        let mut job = make_job();
        let config = PollConfig {
            count_transport_errors: false,
            max_transport_errors: 2,
            ..Default::default()
        };

        StateMachine::next(&mut job, PollObservation::Transport("timeout".into()), &config);
        let t = StateMachine::next(&mut job, PollObservation::Transport("timeout".into()), &config);
        assert_eq!(t, Transition::Complete(JobStatus::TimedOut));
        assert_eq!(job.attempts, 0);
    }

    #[test]
    fn status_display() {
        assert_eq!(JobStatus::AwaitingFirstPoll.to_string(), "AWAITING_FIRST_POLL");
        assert_eq!(JobStatus::Polling.to_string(), "POLLING");
        assert_eq!(JobStatus::TimedOut.to_string(), "TIMED_OUT");
    }
}
