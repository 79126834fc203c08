pub mod analysis;
pub mod feedback;
pub mod triage;

pub use analysis::{
    AnalysisJob, AnalysisResults, CompoundRisk, DocumentInfo, JobStatus, RiskSummary, RiskyClause,
};
pub use feedback::{
    FeedbackId, FeedbackReceipt, FeedbackRecord, FeedbackStatus, FeedbackSubmission,
    FeedbackType, TransitionError,
};
pub use triage::{Bucket, Buckets, TriagePolicy, VisibilityWindow};
