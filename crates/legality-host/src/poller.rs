//! Polls one analysis job until it reaches a terminal status.
//!
//! ```text
//! Polling ──completed──▶ FetchingResults ──ok──▶ Done
//!    │                          └──error──▶ Errored (results)
//!    ├──failed──▶ Failed
//!    └──transport/parse error──▶ Errored (status)
//! ```
//!
//! Every tick spawns its own status request, so requests overlap when the
//! server is slower than the interval. Each request is stamped with a
//! generation; a response no newer than the last applied one is dropped.
//! Tearing the poller down aborts the timer and every request still in flight.

use std::sync::Arc;
use std::time::Duration;

use legality_core::{AnalysisJob, JobStatus};
use legality_store::ResultsStore;
use legality_sync::{AnalysisApi, ApiError};
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2000);

/// Which request failed when a poller ends in [`PollState::Errored`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStage {
    Status,
    Results,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PollState {
    /// Waiting for a terminal status. `last` is the newest status applied.
    Polling { last: Option<AnalysisJob> },
    /// `completed` was observed and the single results fetch is in flight.
    FetchingResults { job: AnalysisJob },
    /// Results are in the store.
    Done { job: AnalysisJob },
    /// The server reported the job as failed.
    Failed { job: AnalysisJob },
    /// A request or its payload failed. Distinct from a failed job.
    Errored {
        stage: PollStage,
        message: String,
        last: Option<AnalysisJob>,
    },
    /// Torn down before reaching any other terminal state.
    Cancelled,
}

impl PollState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Done { .. } | Self::Failed { .. } | Self::Errored { .. } | Self::Cancelled
        )
    }

    /// Newest job snapshot known in this state.
    pub fn job(&self) -> Option<&AnalysisJob> {
        match self {
            Self::Polling { last } | Self::Errored { last, .. } => last.as_ref(),
            Self::FetchingResults { job } | Self::Done { job } | Self::Failed { job } => Some(job),
            Self::Cancelled => None,
        }
    }
}

/// Handle to a running poll loop for one job.
///
/// Dropping the handle cancels the loop.
pub struct JobPoller<A: AnalysisApi + ?Sized + 'static> {
    api: Arc<A>,
    job_id: String,
    period: Duration,
    results: Arc<ResultsStore>,
    state: Arc<watch::Sender<PollState>>,
    task: Option<JoinHandle<()>>,
}

impl<A: AnalysisApi + ?Sized + 'static> JobPoller<A> {
    /// Start polling `job_id` every `period`. The first request goes out immediately.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(api: Arc<A>, job_id: impl Into<String>, period: Duration) -> Self {
        // `interval` panics on a zero period.
        let period = period.max(Duration::from_millis(1));
        let mut poller = Self {
            api,
            job_id: job_id.into(),
            period,
            results: Arc::new(ResultsStore::new()),
            state: Arc::new(watch::channel(PollState::Polling { last: None }).0),
            task: None,
        };
        poller.start();
        poller
    }

    fn start(&mut self) {
        info!(job_id = %self.job_id, period_ms = self.period.as_millis() as u64, "polling job");
        self.task = Some(tokio::spawn(drive(
            Arc::clone(&self.api),
            self.job_id.clone(),
            self.period,
            Arc::clone(&self.results),
            Arc::clone(&self.state),
        )));
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn state(&self) -> PollState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PollState> {
        self.state.subscribe()
    }

    /// Results for the current job once the poller reaches [`PollState::Done`].
    pub fn results(&self) -> Arc<ResultsStore> {
        Arc::clone(&self.results)
    }

    /// Wait until the poller reaches a terminal state and return it.
    pub async fn wait(&self) -> PollState {
        let mut rx = self.state.subscribe();
        match rx.wait_for(PollState::is_terminal).await {
            Ok(state) => state.clone(),
            Err(_) => PollState::Cancelled,
        }
    }

    /// Stop polling. Safe to call repeatedly and when nothing is in flight.
    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            let cancelled = self.state.send_if_modified(|state| {
                if state.is_terminal() {
                    false
                } else {
                    *state = PollState::Cancelled;
                    true
                }
            });
            if cancelled {
                debug!(job_id = %self.job_id, "poller cancelled");
            }
        }
    }

    /// Tear down the current loop and start polling a different job with fresh state.
    pub fn retarget(&mut self, job_id: impl Into<String>) {
        self.cancel();
        self.job_id = job_id.into();
        self.results = Arc::new(ResultsStore::new());
        self.state = Arc::new(watch::channel(PollState::Polling { last: None }).0);
        self.start();
    }
}

impl<A: AnalysisApi + ?Sized + 'static> Drop for JobPoller<A> {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Publish `next` unless the poller was already cancelled.
fn publish(state: &watch::Sender<PollState>, next: PollState) {
    state.send_if_modified(|current| {
        if matches!(current, PollState::Cancelled) {
            false
        } else {
            *current = next;
            true
        }
    });
}

async fn drive<A: AnalysisApi + ?Sized + 'static>(
    api: Arc<A>,
    job_id: String,
    period: Duration,
    results: Arc<ResultsStore>,
    state: Arc<watch::Sender<PollState>>,
) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut in_flight: JoinSet<(u64, Result<AnalysisJob, ApiError>)> = JoinSet::new();
    let mut issued = 0u64;
    let mut applied = 0u64;
    let mut last: Option<AnalysisJob> = None;

    let completed = loop {
        tokio::select! {
            _ = ticker.tick() => {
                issued += 1;
                let generation = issued;
                let api = Arc::clone(&api);
                let id = job_id.clone();
                in_flight.spawn(async move { (generation, api.job_status(&id).await) });
            }
            Some(joined) = in_flight.join_next() => {
                let (generation, outcome) = match joined {
                    Ok(pair) => pair,
                    Err(e) => {
                        warn!(job_id = %job_id, error = %e, "status request task failed");
                        publish(&state, PollState::Errored {
                            stage: PollStage::Status,
                            message: e.to_string(),
                            last,
                        });
                        return;
                    }
                };
                if generation <= applied {
                    debug!(job_id = %job_id, generation, applied, "discarding stale status response");
                    continue;
                }
                applied = generation;

                let job = match outcome {
                    Ok(job) => job,
                    Err(e) => {
                        warn!(job_id = %job_id, error = %e, "status poll failed, stopping");
                        publish(&state, PollState::Errored {
                            stage: PollStage::Status,
                            message: e.to_string(),
                            last,
                        });
                        return;
                    }
                };
                match job.status {
                    JobStatus::Processing => {
                        debug!(job_id = %job_id, progress = job.progress, "job still processing");
                        last = Some(job.clone());
                        publish(&state, PollState::Polling { last: Some(job) });
                    }
                    JobStatus::Completed => break job,
                    JobStatus::Failed => {
                        info!(job_id = %job_id, "job failed");
                        publish(&state, PollState::Failed { job });
                        return;
                    }
                }
            }
        }
    };

    // Stop the timer and abandon any older status requests before the one results fetch.
    drop(in_flight);
    drop(ticker);
    info!(job_id = %job_id, "job completed");
    publish(
        &state,
        PollState::FetchingResults {
            job: completed.clone(),
        },
    );

    let next = match api.job_results(&job_id).await {
        Ok(fetched) => match results.set(&job_id, fetched) {
            Ok(()) => PollState::Done { job: completed },
            Err(e) => PollState::Errored {
                stage: PollStage::Results,
                message: e.to_string(),
                last: Some(completed),
            },
        },
        Err(e) => {
            warn!(job_id = %job_id, error = %e, "results fetch failed");
            PollState::Errored {
                stage: PollStage::Results,
                message: e.to_string(),
                last: Some(completed),
            }
        }
    };
    publish(&state, next);
}
