//! Session-local state: analysis results, the feedback collection, and on-disk client files.

mod error;
pub use error::StoreError;

mod collection;
mod config;
mod credentials;
mod results;

pub use collection::FeedbackCollection;
pub use config::{ClientConfig, default_config_dir};
pub use credentials::CredentialStore;
pub use results::ResultsStore;
