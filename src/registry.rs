//! Process-wide table of tracking jobs that are currently being polled.
//!
//! Shared by every concurrent resolution; all mutations go through one mutex.
//! Registration hands out an [`ActiveJobGuard`] that unregisters the job when
//! released or dropped, so an abandoned poll never leaves a stale entry.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::tracking::{CandidateId, Category, JobId, TrackingJob};

/// Progress view of one active job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActiveJob {
    pub job_id: JobId,
    pub provider: CandidateId,
    pub category: Category,
    pub reference: String,
    pub attempt: u32,
    pub max_attempts: u32,
    pub registered_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct JobRegistry {
    inner: Arc<Mutex<HashMap<JobId, ActiveJob>>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically register `job`. Returns `None` if its id is already active.
    pub fn register(&self, job: &TrackingJob, max_attempts: u32) -> Option<ActiveJobGuard> {
        let mut jobs = self.lock();
        if jobs.contains_key(&job.job_id) {
            return None;
        }
        jobs.insert(
            job.job_id.clone(),
            ActiveJob {
                job_id: job.job_id.clone(),
                provider: job.provider.clone(),
                category: job.category,
                reference: job.reference.clone(),
                attempt: job.attempts,
                max_attempts,
                registered_at: Utc::now(),
            },
        );
        Some(ActiveJobGuard {
            registry: self.clone(),
            job_id: job.job_id.clone(),
            released: false,
        })
    }

    /// Remove `job_id`; returns whether it was registered.
    pub fn unregister(&self, job_id: &JobId) -> bool {
        self.lock().remove(job_id).is_some()
    }

    pub fn is_active(&self, job_id: &JobId) -> bool {
        self.lock().contains_key(job_id)
    }

    /// Active job ids, sorted.
    pub fn list_active(&self) -> Vec<JobId> {
        let mut ids: Vec<JobId> = self.lock().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Active jobs with their polling progress, sorted by job id.
    pub fn snapshot(&self) -> Vec<ActiveJob> {
        let mut jobs: Vec<ActiveJob> = self.lock().values().cloned().collect();
        jobs.sort_by(|a, b| a.job_id.cmp(&b.job_id));
        jobs
    }

    pub fn active_count(&self) -> usize {
        self.lock().len()
    }

    fn record_attempt(&self, job_id: &JobId, attempt: u32) {
        if let Some(entry) = self.lock().get_mut(job_id) {
            entry.attempt = attempt;
        }
    }

    // Entries are plain data, so a panic while holding the lock cannot leave
    // them half-updated.
    fn lock(&self) -> MutexGuard<'_, HashMap<JobId, ActiveJob>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Keeps a job registered until released or dropped.
#[derive(Debug)]
pub struct ActiveJobGuard {
    registry: JobRegistry,
    job_id: JobId,
    released: bool,
}

impl ActiveJobGuard {
    pub fn record_attempt(&self, attempt: u32) {
        self.registry.record_attempt(&self.job_id, attempt);
    }

    /// Unregister now, at the job's terminal transition.
    pub fn release(mut self) {
        self.registry.unregister(&self.job_id);
        self.released = true;
    }
}

impl Drop for ActiveJobGuard {
    fn drop(&mut self) {
        if !self.released {
            self.registry.unregister(&self.job_id);
        }
    }
}
