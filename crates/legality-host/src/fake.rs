//! In-memory [`AdminApi`] used by the desk and batch tests.

use std::sync::Mutex;

use async_trait::async_trait;
use legality_core::{FeedbackId, FeedbackRecord, FeedbackStatus};
use legality_sync::{AdminApi, AdminKey, AdminSession, ApiError, BatchSyncAck, SyncAck};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    List(usize),
    Status(FeedbackId, FeedbackStatus),
    Sync(FeedbackId),
    Batch(String),
    Export,
}

#[derive(Default)]
pub(crate) struct FakeAdmin {
    records: Mutex<Vec<FeedbackRecord>>,
    calls: Mutex<Vec<Call>>,
    list_failure: Mutex<Option<ApiError>>,
    status_failure: Mutex<Option<ApiError>>,
    batch_failure: Mutex<Option<ApiError>>,
}

impl FakeAdmin {
    pub(crate) fn with_records(records: Vec<FeedbackRecord>) -> Self {
        Self {
            records: Mutex::new(records),
            ..Self::default()
        }
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| pred(c)).count()
    }

    /// Fail the next list call.
    pub(crate) fn fail_list_with(&self, err: ApiError) {
        *self.list_failure.lock().unwrap() = Some(err);
    }

    pub(crate) fn fail_status_with(&self, err: ApiError) {
        *self.status_failure.lock().unwrap() = Some(err);
    }

    pub(crate) fn fail_batch_with(&self, err: ApiError) {
        *self.batch_failure.lock().unwrap() = Some(err);
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl AdminApi for FakeAdmin {
    async fn list_feedback(
        &self,
        _session: &AdminSession,
        limit: usize,
    ) -> Result<Vec<FeedbackRecord>, ApiError> {
        self.record(Call::List(limit));
        if let Some(err) = self.list_failure.lock().unwrap().take() {
            return Err(err);
        }
        Ok(self.records.lock().unwrap().iter().take(limit).cloned().collect())
    }

    async fn update_feedback_status(
        &self,
        _session: &AdminSession,
        id: &FeedbackId,
        status: FeedbackStatus,
    ) -> Result<(), ApiError> {
        self.record(Call::Status(id.clone(), status));
        if let Some(err) = self.status_failure.lock().unwrap().take() {
            return Err(err);
        }
        if let Some(r) = self.records.lock().unwrap().iter_mut().find(|r| &r.id == id) {
            r.status = status;
        }
        Ok(())
    }

    async fn sync_feedback(
        &self,
        _session: &AdminSession,
        id: &FeedbackId,
    ) -> Result<SyncAck, ApiError> {
        self.record(Call::Sync(id.clone()));
        Ok(SyncAck {
            status: Some("success".into()),
            message: None,
        })
    }

    async fn sync_batch(
        &self,
        _session: &AdminSession,
        confirmed: &AdminKey,
    ) -> Result<BatchSyncAck, ApiError> {
        self.record(Call::Batch(confirmed.expose().to_string()));
        if let Some(err) = self.batch_failure.lock().unwrap().take() {
            return Err(err);
        }
        let count = self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.status == FeedbackStatus::Approved)
            .count() as u64;
        Ok(BatchSyncAck {
            count,
            message: Some(format!("Synced {count} items")),
        })
    }

    async fn export_csv(&self, _session: &AdminSession) -> Result<String, ApiError> {
        self.record(Call::Export);
        Ok("id,feedback_type,status\n".into())
    }
}
