//! Committing every approved record to the knowledge store in one call.

use chrono::Utc;
use legality_sync::{AdminApi, AdminKey};
use tracing::{info, warn};

use crate::{DeskError, FeedbackDesk};

/// Shown when the server rejects a commit without saying why.
pub const INVALID_KEY: &str = "Invalid Key";

/// Asks the operator to re-enter the admin key before a batch commit.
pub trait Confirmation {
    /// `approved` is how many records the commit will touch. `None` means
    /// the operator backed out.
    fn confirm_admin_key(&self, approved: usize) -> Option<String>;
}

/// A key supplied up front, e.g. from a command-line flag.
#[derive(Debug, Clone, Default)]
pub struct ProvidedKey(pub Option<String>);

impl Confirmation for ProvidedKey {
    fn confirm_admin_key(&self, _approved: usize) -> Option<String> {
        self.0.clone()
    }
}

impl<F> Confirmation for F
where
    F: Fn(usize) -> Option<String>,
{
    fn confirm_admin_key(&self, approved: usize) -> Option<String> {
        self(approved)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchCommitReport {
    /// Approved records in view when the commit was issued.
    pub approved_at_call: usize,
    /// Count reported by the server.
    pub synced: u64,
    pub message: Option<String>,
    /// Size of the collection after the post-commit reload.
    pub reloaded: usize,
}

impl<A: AdminApi> FeedbackDesk<A> {
    /// Confirm, commit all approved feedback, then reload the collection once.
    pub async fn commit_approved<C>(&mut self, confirm: &C) -> Result<BatchCommitReport, DeskError>
    where
        C: Confirmation + ?Sized,
    {
        let approved = self.approved_count(Utc::now());
        if approved == 0 {
            return Err(DeskError::NothingToCommit);
        }

        let raw = confirm
            .confirm_admin_key(approved)
            .ok_or(DeskError::CommitCancelled)?;
        let key = AdminKey::new(raw).map_err(|_| DeskError::MissingCredential)?;

        info!(approved, "committing approved feedback");
        let ack = match self.api().sync_batch(self.session(), &key).await {
            Ok(ack) => ack,
            Err(source) => {
                let message = source.server_detail().unwrap_or(INVALID_KEY).to_string();
                warn!(error = %source, "batch commit rejected");
                return Err(DeskError::CommitRejected { message, source });
            }
        };

        if ack.count != approved as u64 {
            warn!(
                approved,
                synced = ack.count,
                "server synced a different number of records than were approved"
            );
        }

        let reloaded = self
            .load()
            .await
            .map_err(|e| DeskError::ReloadAfterCommit {
                synced: ack.count,
                source: Box::new(e),
            })?;

        info!(synced = ack.count, reloaded, "batch commit complete");
        Ok(BatchCommitReport {
            approved_at_call: approved,
            synced: ack.count,
            message: ack.message,
            reloaded,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::{Call, FakeAdmin};
    use legality_core::{FeedbackRecord, FeedbackStatus, FeedbackType};
    use legality_sync::{AdminSession, ApiError};

    fn approved(id: &str) -> FeedbackRecord {
        let mut r = FeedbackRecord::new(id, FeedbackType::FalsePositive, Some(Utc::now()));
        r.status = FeedbackStatus::Approved;
        r
    }

    async fn desk(records: Vec<FeedbackRecord>) -> FeedbackDesk<FakeAdmin> {
        let session = AdminSession::new(AdminKey::new("op").unwrap());
        let mut desk = FeedbackDesk::new(FakeAdmin::with_records(records), session);
        desk.load().await.unwrap();
        desk
    }

    fn network_calls(desk: &FeedbackDesk<FakeAdmin>) -> usize {
        desk.api().count(|c| !matches!(c, Call::List(_)))
    }

    #[tokio::test]
    async fn absent_confirmation_makes_no_call() {
        let mut desk = desk(vec![approved("1")]).await;
        let err = desk.commit_approved(&ProvidedKey(None)).await.unwrap_err();
        assert!(matches!(err, DeskError::CommitCancelled));
        assert_eq!(network_calls(&desk), 0);
        assert_eq!(desk.api().calls(), vec![Call::List(100)]);
    }

    #[tokio::test]
    async fn blank_confirmation_makes_no_call() {
        let mut desk = desk(vec![approved("1")]).await;
        let err = desk
            .commit_approved(&ProvidedKey(Some("  ".into())))
            .await
            .unwrap_err();
        assert!(matches!(err, DeskError::MissingCredential));
        assert_eq!(desk.api().calls(), vec![Call::List(100)]);
    }

    #[tokio::test]
    async fn nothing_approved_is_refused_before_prompting() {
        let mut desk = desk(vec![FeedbackRecord::new(
            "1",
            FeedbackType::ApproveFix,
            Some(Utc::now()),
        )])
        .await;
        let prompt = |_: usize| -> Option<String> { panic!("prompted with nothing to commit") };
        let err = desk.commit_approved(&prompt).await.unwrap_err();
        assert!(matches!(err, DeskError::NothingToCommit));
    }

    #[tokio::test]
    async fn success_reloads_exactly_once_and_reports_count() {
        let mut desk = desk(vec![
            approved("1"),
            approved("2"),
            FeedbackRecord::new("3", FeedbackType::FalsePositive, Some(Utc::now())),
        ])
        .await;

        let prompt = |n: usize| {
            assert_eq!(n, 2);
            Some("confirm-key".to_string())
        };
        let report = desk.commit_approved(&prompt).await.unwrap();

        assert_eq!(report.approved_at_call, 2);
        assert_eq!(report.synced, 2);
        assert_eq!(report.reloaded, 3);
        assert_eq!(
            desk.api().calls(),
            vec![
                Call::List(100),
                Call::Batch("confirm-key".into()),
                Call::List(100),
            ]
        );
    }

    #[tokio::test]
    async fn rejection_carries_server_detail() {
        let mut desk = desk(vec![approved("1")]).await;
        desk.api()
            .fail_batch_with(ApiError::server(403, r#"{"detail":"Invalid Admin Key"}"#.into()));

        let err = desk
            .commit_approved(&ProvidedKey(Some("wrong".into())))
            .await
            .unwrap_err();

        match err {
            DeskError::CommitRejected { message, .. } => assert_eq!(message, "Invalid Admin Key"),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(desk.api().count(|c| matches!(c, Call::List(_))), 1);
    }

    #[tokio::test]
    async fn rejection_without_detail_is_invalid_key() {
        let mut desk = desk(vec![approved("1")]).await;
        desk.api()
            .fail_batch_with(ApiError::server(500, "Internal Server Error".into()));

        let err = desk
            .commit_approved(&ProvidedKey(Some("k".into())))
            .await
            .unwrap_err();

        match err {
            DeskError::CommitRejected { message, .. } => assert_eq!(message, INVALID_KEY),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn reload_failure_keeps_synced_count() {
        let mut desk = desk(vec![approved("1"), approved("2")]).await;
        desk.api()
            .fail_list_with(ApiError::server(502, "bad gateway".into()));

        let err = desk
            .commit_approved(&ProvidedKey(Some("k".into())))
            .await
            .unwrap_err();

        assert!(matches!(err, DeskError::ReloadAfterCommit { synced: 2, .. }));
        assert_eq!(desk.api().count(|c| matches!(c, Call::Batch(_))), 1);
    }
}
