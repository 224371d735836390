//! Shipment tracking resolution: submit a container, bill of lading or
//! booking reference and either poll a named carrier or discover which
//! carrier knows it.

pub mod catalog;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod logging;
pub mod projector;
pub mod provider;
pub mod registry;
pub mod supervisor;
pub mod tracking;
pub mod ui;

#[cfg(test)]
mod testing;

pub use catalog::{CandidateCatalog, CandidateProvider};
pub use engine::{EngineConfig, RefreshOutcome, ResolutionEngine, TrackingHandle};
pub use error::{ConfigError, ResolutionError};
pub use events::ProgressEvent;
pub use registry::JobRegistry;
