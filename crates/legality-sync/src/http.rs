//! HTTP client for the Legality API.

use std::time::Duration;

use async_trait::async_trait;
use legality_core::{
    AnalysisJob, AnalysisResults, FeedbackId, FeedbackReceipt, FeedbackRecord, FeedbackStatus,
    FeedbackSubmission, FeedbackType,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info};

use crate::{AdminApi, AdminKey, AdminSession, AnalysisApi, ApiError, BatchSyncAck, SyncAck};

/// HTTP client for the analysis, feedback, and admin endpoints.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Create a client for the given API base URL.
    ///
    /// `base_url` should be like `http://localhost:8000` (no trailing slash).
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Like [`new`](Self::new), with a per-request timeout.
    pub fn with_timeout(base_url: String, timeout: Duration) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `true` if the API root answers with a success status.
    pub async fn health(&self) -> bool {
        let url = self.url("/");
        match self.client.get(&url).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                debug!(url = %url, error = %e, "health check failed");
                false
            }
        }
    }

    /// Submit end-user feedback on a clause.
    pub async fn submit_feedback(
        &self,
        kind: FeedbackType,
        submission: &FeedbackSubmission,
    ) -> Result<FeedbackReceipt, ApiError> {
        let url = self.url(&format!("/feedback/{}", kind.as_str()));
        info!(url = %url, chunk_id = %submission.chunk_id, "submitting feedback");
        let resp = self.client.post(&url).json(submission).send().await?;
        let receipt: FeedbackReceipt = read_json(resp).await?;
        info!(feedback_id = %receipt.feedback_id, "feedback recorded");
        Ok(receipt)
    }
}

#[async_trait]
impl AnalysisApi for ApiClient {
    async fn job_status(&self, job_id: &str) -> Result<AnalysisJob, ApiError> {
        let url = self.url(&format!("/analyze/{job_id}/status"));
        debug!(url = %url, "polling job status");
        let resp = self.client.get(&url).send().await?;
        read_json(resp).await
    }

    async fn job_results(&self, job_id: &str) -> Result<AnalysisResults, ApiError> {
        let url = self.url(&format!("/analyze/{job_id}/results"));
        info!(url = %url, "fetching analysis results");
        let resp = self.client.get(&url).send().await?;
        read_json(resp).await
    }
}

#[async_trait]
impl AdminApi for ApiClient {
    async fn list_feedback(
        &self,
        session: &AdminSession,
        limit: usize,
    ) -> Result<Vec<FeedbackRecord>, ApiError> {
        let url = self.url("/admin/feedback");
        info!(url = %url, limit, "loading feedback");
        let req = self.client.get(&url).query(&[("limit", limit)]);
        let resp = session.authorize(req).send().await?;
        let records = feedback_page(read_json(resp).await?)?;
        info!(count = records.len(), "loaded feedback");
        Ok(records)
    }

    async fn update_feedback_status(
        &self,
        session: &AdminSession,
        id: &FeedbackId,
        status: FeedbackStatus,
    ) -> Result<(), ApiError> {
        let url = self.url(&format!("/admin/feedback/{id}/status"));
        info!(url = %url, status = %status, "updating feedback status");
        let req = self.client.patch(&url).query(&[("status", status.as_str())]);
        let resp = session.authorize(req).send().await?;
        ensure_success(resp).await?;
        Ok(())
    }

    async fn sync_feedback(
        &self,
        session: &AdminSession,
        id: &FeedbackId,
    ) -> Result<SyncAck, ApiError> {
        let url = self.url(&format!("/admin/feedback/{id}/sync"));
        info!(url = %url, "syncing feedback to knowledge store");
        let req = self.client.post(&url).json(&serde_json::json!({}));
        let resp = session.authorize(req).send().await?;
        let resp = ensure_success(resp).await?;
        let bytes = resp.bytes().await?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(SyncAck::default());
        }
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn sync_batch(
        &self,
        session: &AdminSession,
        confirmed: &AdminKey,
    ) -> Result<BatchSyncAck, ApiError> {
        let url = self.url("/admin/feedback/sync-batch");
        info!(url = %url, "batch syncing approved feedback");
        let req = self
            .client
            .post(&url)
            .query(&[("admin_key", confirmed.expose())]);
        let resp = session.authorize(req).send().await?;
        let ack: BatchSyncAck = read_json(resp).await?;
        info!(count = ack.count, "batch sync complete");
        Ok(ack)
    }

    async fn export_csv(&self, session: &AdminSession) -> Result<String, ApiError> {
        let url = self.url("/admin/export/csv");
        info!(url = %url, "exporting feedback as CSV");
        let resp = session.authorize(self.client.get(&url)).send().await?;
        let resp = ensure_success(resp).await?;
        Ok(resp.text().await?)
    }
}

async fn ensure_success(resp: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(ApiError::server(status.as_u16(), body))
}

/// `GET /admin/feedback` has been seen both bare and wrapped in `{"feedback": [...]}`.
///
/// Records are decoded after unwrapping so field-level errors keep their message.
fn feedback_page(page: Value) -> Result<Vec<FeedbackRecord>, ApiError> {
    let records = match page {
        Value::Object(mut wrapper) => wrapper.remove("feedback").unwrap_or(Value::Null),
        bare => bare,
    };
    Ok(serde_json::from_value(records)?)
}

async fn read_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, ApiError> {
    let resp = ensure_success(resp).await?;
    let bytes = resp.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}
