//! Operator-facing feedback administration.

use chrono::{DateTime, Utc};
use legality_core::{Buckets, FeedbackId, FeedbackRecord, FeedbackStatus, TriagePolicy};
use legality_store::FeedbackCollection;
use legality_sync::{AdminApi, AdminSession, SyncAck};
use tracing::{info, warn};

use crate::DeskError;

pub const DEFAULT_FEEDBACK_LIMIT: usize = 100;

/// Owns the admin session, the loaded feedback collection, and the triage
/// policy used to view it.
///
/// The collection only changes after the server has acknowledged a call:
/// [`load`](Self::load) replaces it wholesale and
/// [`update_status`](Self::update_status) patches one record.
pub struct FeedbackDesk<A: AdminApi> {
    api: A,
    session: AdminSession,
    collection: FeedbackCollection,
    policy: TriagePolicy,
    limit: usize,
}

impl<A: AdminApi> FeedbackDesk<A> {
    pub fn new(api: A, session: AdminSession) -> Self {
        Self {
            api,
            session,
            collection: FeedbackCollection::new(),
            policy: TriagePolicy::default(),
            limit: DEFAULT_FEEDBACK_LIMIT,
        }
    }

    pub fn with_policy(mut self, policy: TriagePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn session(&self) -> &AdminSession {
        &self.session
    }

    pub fn collection(&self) -> &FeedbackCollection {
        &self.collection
    }

    pub fn policy(&self) -> &TriagePolicy {
        &self.policy
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Fetch the feedback collection and replace the local copy.
    pub async fn load(&mut self) -> Result<usize, DeskError> {
        let records = self.api.list_feedback(&self.session, self.limit).await?;
        let count = records.len();
        self.collection.replace(records, Utc::now());
        info!(count, limit = self.limit, "feedback loaded");
        Ok(count)
    }

    pub fn buckets(&self, now: DateTime<Utc>) -> Buckets<'_> {
        self.collection.buckets(&self.policy, now)
    }

    pub fn record(&self, id: &FeedbackId) -> Option<&FeedbackRecord> {
        self.collection.get(id)
    }

    /// Change one record's review status.
    ///
    /// The transition is checked before any request. The local record is
    /// patched only once the server accepts the change.
    pub async fn update_status(
        &mut self,
        id: &FeedbackId,
        status: FeedbackStatus,
    ) -> Result<(), DeskError> {
        let current = self
            .collection
            .get(id)
            .ok_or_else(|| DeskError::NotFound(id.clone()))?
            .status;
        current.transition_to(status)?;

        if let Err(e) = self
            .api
            .update_feedback_status(&self.session, id, status)
            .await
        {
            warn!(%id, %status, error = %e, "status update refused");
            return Err(e.into());
        }

        self.collection.apply_status(id, status)?;
        info!(%id, from = %current, to = %status, "feedback status updated");
        Ok(())
    }

    /// Push one record into the knowledge store.
    pub async fn sync_one(&self, id: &FeedbackId) -> Result<SyncAck, DeskError> {
        let ack = self.api.sync_feedback(&self.session, id).await?;
        info!(%id, "feedback synced");
        Ok(ack)
    }

    pub async fn export_csv(&self) -> Result<String, DeskError> {
        Ok(self.api.export_csv(&self.session).await?)
    }

    pub(crate) fn approved_count(&self, now: DateTime<Utc>) -> usize {
        self.buckets(now).approved.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::{Call, FakeAdmin};
    use legality_core::{Bucket, FeedbackType, VisibilityWindow};
    use legality_sync::{AdminKey, ApiError};

    fn session() -> AdminSession {
        AdminSession::new(AdminKey::new("op").unwrap())
    }

    fn records() -> Vec<FeedbackRecord> {
        let now = Utc::now();
        vec![
            FeedbackRecord::new("1", FeedbackType::FalsePositive, Some(now)),
            FeedbackRecord::new("2", FeedbackType::ApproveFix, Some(now)),
            FeedbackRecord::new(3.to_string(), FeedbackType::FalseNegative, Some(now)),
        ]
    }

    async fn loaded(api: FakeAdmin) -> FeedbackDesk<FakeAdmin> {
        let mut desk = FeedbackDesk::new(api, session()).with_limit(25);
        desk.load().await.unwrap();
        desk
    }

    #[tokio::test]
    async fn load_replaces_collection_with_limit() {
        let desk = loaded(FakeAdmin::with_records(records())).await;
        assert_eq!(desk.collection().len(), 3);
        assert_eq!(desk.api().calls(), vec![Call::List(25)]);

        let buckets = desk.buckets(Utc::now());
        assert_eq!(buckets.get(Bucket::FalsePositiveReview).len(), 1);
        assert_eq!(buckets.get(Bucket::FixReview).len(), 1);
        assert!(buckets.approved.is_empty());
    }

    #[tokio::test]
    async fn update_status_applies_after_ack() {
        let mut desk = loaded(FakeAdmin::with_records(records())).await;
        desk.update_status(&"1".into(), FeedbackStatus::Approved)
            .await
            .unwrap();

        assert_eq!(
            desk.record(&"1".into()).unwrap().status,
            FeedbackStatus::Approved
        );
        assert!(
            desk.api()
                .calls()
                .contains(&Call::Status("1".into(), FeedbackStatus::Approved))
        );
        assert_eq!(desk.approved_count(Utc::now()), 1);
    }

    #[tokio::test]
    async fn failed_update_leaves_record_unchanged() {
        let api = FakeAdmin::with_records(records());
        api.fail_status_with(ApiError::server(500, r#"{"detail":"db down"}"#.into()));
        let mut desk = loaded(api).await;
        let before = desk.record(&"2".into()).cloned();
        let revision = desk.collection().revision();

        let err = desk
            .update_status(&"2".into(), FeedbackStatus::Approved)
            .await
            .unwrap_err();

        assert!(matches!(err, DeskError::Api(_)));
        assert_eq!(desk.record(&"2".into()).cloned(), before);
        assert_eq!(desk.collection().revision(), revision);
    }

    #[tokio::test]
    async fn rejected_is_refused_without_request() {
        let mut desk = loaded(FakeAdmin::with_records(records())).await;
        desk.update_status(&"1".into(), FeedbackStatus::Rejected)
            .await
            .unwrap();
        let calls_before = desk.api().calls().len();

        let err = desk
            .update_status(&"1".into(), FeedbackStatus::Pending)
            .await
            .unwrap_err();

        assert!(matches!(err, DeskError::Transition(_)));
        assert_eq!(desk.api().calls().len(), calls_before);
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let mut desk = loaded(FakeAdmin::with_records(records())).await;
        let err = desk
            .update_status(&"404".into(), FeedbackStatus::Approved)
            .await
            .unwrap_err();
        assert!(matches!(err, DeskError::NotFound(_)));
        assert_eq!(desk.api().calls(), vec![Call::List(25)]);
    }

    #[tokio::test]
    async fn approve_then_reset_restores_fix_review() {
        let mut desk = loaded(FakeAdmin::with_records(records())).await;
        let id: FeedbackId = "2".into();
        let before = desk.record(&id).cloned().unwrap();
        desk.update_status(&id, FeedbackStatus::Approved)
            .await
            .unwrap();
        assert!(desk.buckets(Utc::now()).fix_review.is_empty());

        desk.update_status(&id, FeedbackStatus::Pending)
            .await
            .unwrap();
        let buckets = desk.buckets(Utc::now());
        assert_eq!(buckets.fix_review.len(), 1);
        assert_eq!(buckets.fix_review[0], &before);
    }

    #[tokio::test]
    async fn policy_window_applies_to_buckets() {
        let old = Utc::now() - chrono::TimeDelta::days(10);
        let api = FakeAdmin::with_records(vec![FeedbackRecord::new(
            "7",
            FeedbackType::ApproveFix,
            Some(old),
        )]);
        let mut desk = FeedbackDesk::new(api, session())
            .with_policy(TriagePolicy::with_window(VisibilityWindow::days(7)));
        desk.load().await.unwrap();

        let buckets = desk.buckets(Utc::now());
        assert!(buckets.fix_review.is_empty());
        assert_eq!(buckets.hidden_fix_reviews, 1);
    }

    #[tokio::test]
    async fn sync_and_export_pass_through() {
        let desk = loaded(FakeAdmin::with_records(records())).await;
        let ack = desk.sync_one(&"1".into()).await.unwrap();
        assert_eq!(ack.status.as_deref(), Some("success"));

        let csv = desk.export_csv().await.unwrap();
        assert!(csv.starts_with("id,"));
        assert!(desk.api().calls().contains(&Call::Sync("1".into())));
        assert!(desk.api().calls().contains(&Call::Export));
    }
}
