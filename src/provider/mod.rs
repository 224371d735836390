pub mod client;
pub mod error;
pub mod types;

pub use client::{HttpTrackingClient, TrackingClient};
pub use error::ClientError;
pub use types::{JobSnapshot, RemoteStatus};
