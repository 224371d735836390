mod job;
mod request;
mod result;
mod state;

pub use job::{CandidateId, Category, JobId, PollConfig, TrackingJob};
pub use request::{Mode, ResolutionOutcome, TrackingRequest, TrialRecord, TrialState};
pub use result::{KeyDate, Route, SubUnit, TrackingResult};
pub use state::{JobStatus, PROVIDER_MISMATCH, PollObservation, StateMachine, Transition};
