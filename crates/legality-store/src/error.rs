use std::path::PathBuf;

use legality_core::{FeedbackId, TransitionError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("results are already stored for this session (rejected write for job {0})")]
    ResultsAlreadySet(String),

    #[error("feedback {0} is not in the loaded collection")]
    FeedbackNotFound(FeedbackId),

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error("io error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid TOML in {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("cannot serialise TOML: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
