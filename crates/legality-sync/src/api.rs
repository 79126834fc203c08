//! Seams between the HTTP client and the code that drives it.
//!
//! [`ApiClient`](crate::ApiClient) implements both traits; the job poller and
//! the feedback desk are generic over them so they can run against fakes.

use async_trait::async_trait;
use legality_core::{AnalysisJob, AnalysisResults, FeedbackId, FeedbackRecord, FeedbackStatus};
use serde::Deserialize;

use crate::{AdminKey, AdminSession, ApiError};

/// Read side of one analysis job.
#[async_trait]
pub trait AnalysisApi: Send + Sync {
    async fn job_status(&self, job_id: &str) -> Result<AnalysisJob, ApiError>;

    async fn job_results(&self, job_id: &str) -> Result<AnalysisResults, ApiError>;
}

/// Credentialed feedback administration.
#[async_trait]
pub trait AdminApi: Send + Sync {
    async fn list_feedback(
        &self,
        session: &AdminSession,
        limit: usize,
    ) -> Result<Vec<FeedbackRecord>, ApiError>;

    async fn update_feedback_status(
        &self,
        session: &AdminSession,
        id: &FeedbackId,
        status: FeedbackStatus,
    ) -> Result<(), ApiError>;

    /// Push one record into the knowledge store.
    async fn sync_feedback(
        &self,
        session: &AdminSession,
        id: &FeedbackId,
    ) -> Result<SyncAck, ApiError>;

    /// Push every approved record into the knowledge store in one call.
    ///
    /// `confirmed` is the key the operator re-entered to confirm the commit.
    async fn sync_batch(
        &self,
        session: &AdminSession,
        confirmed: &AdminKey,
    ) -> Result<BatchSyncAck, ApiError>;

    async fn export_csv(&self, session: &AdminSession) -> Result<String, ApiError>;
}

/// Reply to a single-record sync.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SyncAck {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Reply to a batch sync.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BatchSyncAck {
    pub count: u64,
    #[serde(default)]
    pub message: Option<String>,
}
