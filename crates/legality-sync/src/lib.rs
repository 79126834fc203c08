//! Client side of the Legality API: typed endpoints, admin session, and the traits the runtime drives.

mod api;
mod error;
mod session;

pub use api::{AdminApi, AnalysisApi, BatchSyncAck, SyncAck};
pub use error::ApiError;
pub use session::{AdminKey, AdminSession};

#[cfg(feature = "http")]
pub mod http;

#[cfg(feature = "http")]
pub use http::ApiClient;
