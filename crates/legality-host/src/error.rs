use legality_core::{FeedbackId, TransitionError};
use legality_store::StoreError;
use legality_sync::ApiError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeskError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error("feedback {0} is not in the loaded collection")]
    NotFound(FeedbackId),

    #[error("no admin credential available; log in first")]
    MissingCredential,

    #[error("no approved feedback to commit")]
    NothingToCommit,

    #[error("batch commit cancelled: no admin key confirmed")]
    CommitCancelled,

    #[error("sync failed: {message}")]
    CommitRejected {
        message: String,
        #[source]
        source: ApiError,
    },

    #[error("batch commit synced {synced} items but reloading feedback failed: {source}")]
    ReloadAfterCommit {
        synced: u64,
        #[source]
        source: Box<DeskError>,
    },
}
