//! The feedback collection an operator is working on.

use chrono::{DateTime, Utc};
use legality_core::{Buckets, FeedbackId, FeedbackRecord, FeedbackStatus, TriagePolicy};
use tracing::debug;

use crate::StoreError;

/// Last feedback collection fetched from the server.
///
/// Changes happen in two ways only: the whole collection is replaced after a
/// load, or one record's status is patched after the server acknowledged it.
/// `revision` increments on every change so views know to re-triage.
#[derive(Debug, Default)]
pub struct FeedbackCollection {
    records: Vec<FeedbackRecord>,
    revision: u64,
    loaded_at: Option<DateTime<Utc>>,
}

impl FeedbackCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace(&mut self, records: Vec<FeedbackRecord>, loaded_at: DateTime<Utc>) {
        debug!(count = records.len(), "feedback collection replaced");
        self.records = records;
        self.loaded_at = Some(loaded_at);
        self.revision += 1;
    }

    pub fn records(&self) -> &[FeedbackRecord] {
        &self.records
    }

    pub fn get(&self, id: &FeedbackId) -> Option<&FeedbackRecord> {
        self.records.iter().find(|r| &r.id == id)
    }

    /// Apply a server-acknowledged status change to one record.
    pub fn apply_status(
        &mut self,
        id: &FeedbackId,
        status: FeedbackStatus,
    ) -> Result<(), StoreError> {
        let record = self
            .records
            .iter_mut()
            .find(|r| &r.id == id)
            .ok_or_else(|| StoreError::FeedbackNotFound(id.clone()))?;
        record.apply_status(status)?;
        self.revision += 1;
        Ok(())
    }

    pub fn buckets(&self, policy: &TriagePolicy, now: DateTime<Utc>) -> Buckets<'_> {
        policy.triage(&self.records, now)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn loaded_at(&self) -> Option<DateTime<Utc>> {
        self.loaded_at
    }
}
