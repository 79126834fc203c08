//! Legality client runtime: job polling, admin gate, feedback desk, batch commit.

mod error;

pub mod batch;
pub mod desk;
pub mod gate;
pub mod poller;

#[cfg(test)]
mod fake;

pub use batch::{BatchCommitReport, Confirmation, INVALID_KEY, ProvidedKey};
pub use desk::{DEFAULT_FEEDBACK_LIMIT, FeedbackDesk};
pub use error::DeskError;
pub use gate::AdminGate;
pub use poller::{DEFAULT_POLL_INTERVAL, JobPoller, PollStage, PollState};
