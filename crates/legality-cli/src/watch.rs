//! Follow one analysis job until it settles, then hand back its results.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::bail;
use legality_core::AnalysisResults;
use legality_host::{JobPoller, PollState};
use legality_sync::ApiClient;

use crate::display;

pub struct WatchOutcome {
    /// `None` when the watch was interrupted.
    pub results: Option<AnalysisResults>,
    pub elapsed_secs: f64,
}

/// Poll `job_id` every `period`, echoing progress to stderr.
///
/// Ctrl-C cancels the poller, which aborts any request still in flight.
pub async fn run_watch(
    api: Arc<ApiClient>,
    job_id: &str,
    period: Duration,
) -> anyhow::Result<WatchOutcome> {
    let start = Instant::now();
    let mut poller = JobPoller::spawn(api, job_id, period);
    let mut updates = poller.subscribe();

    let last = loop {
        let state = updates.borrow_and_update().clone();
        if let Some(job) = state.job() {
            display::print_progress(job);
        }
        if state.is_terminal() {
            break state;
        }
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break poller.state();
                }
            }
            _ = tokio::signal::ctrl_c() => {
                poller.cancel();
            }
        }
    };
    eprintln!();

    let elapsed_secs = start.elapsed().as_secs_f64();
    let results = match last {
        PollState::Done { .. } => poller.results().get().cloned(),
        PollState::Cancelled => {
            eprintln!("  Cancelled after {elapsed_secs:.1}s");
            None
        }
        PollState::Failed { job } => bail!("analysis {} failed on the server", job.analysis_id),
        PollState::Errored { stage, message, .. } => {
            bail!("{stage:?} request for {job_id} failed: {message}")
        }
        PollState::Polling { .. } | PollState::FetchingResults { .. } => {
            bail!("poller for {job_id} stopped before the job settled")
        }
    };

    Ok(WatchOutcome {
        results,
        elapsed_secs,
    })
}
