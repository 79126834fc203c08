//! Write-once holder for the results of the analysis tracked in this session.

use std::sync::OnceLock;

use legality_core::AnalysisResults;
use tracing::info;

use crate::StoreError;

/// Holds at most one [`AnalysisResults`], tagged with its job id.
///
/// Written once by the job poller when the job completes; every later write
/// fails and leaves the stored value in place.
#[derive(Debug, Default)]
pub struct ResultsStore {
    slot: OnceLock<StoredResults>,
}

#[derive(Debug)]
struct StoredResults {
    job_id: String,
    results: AnalysisResults,
}

impl ResultsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, job_id: &str, results: AnalysisResults) -> Result<(), StoreError> {
        let clauses = results.risky_clauses.len();
        self.slot
            .set(StoredResults {
                job_id: job_id.to_string(),
                results,
            })
            .map_err(|rejected| StoreError::ResultsAlreadySet(rejected.job_id))?;
        info!(job_id, clauses, "analysis results stored");
        Ok(())
    }

    pub fn get(&self) -> Option<&AnalysisResults> {
        self.slot.get().map(|s| &s.results)
    }

    /// Results only if they belong to `job_id`.
    pub fn get_for(&self, job_id: &str) -> Option<&AnalysisResults> {
        self.slot
            .get()
            .filter(|s| s.job_id == job_id)
            .map(|s| &s.results)
    }

    pub fn job_id(&self) -> Option<&str> {
        self.slot.get().map(|s| s.job_id.as_str())
    }

    pub fn is_ready(&self) -> bool {
        self.slot.get().is_some()
    }
}
