//! Analysis job status and results as served by the `/analyze` endpoints.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Server-side lifecycle of one document analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    /// `completed` and `failed` end the job; nothing polls or mutates it afterwards.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status snapshot returned by `GET /analyze/{id}/status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisJob {
    pub analysis_id: String,
    pub status: JobStatus,
    #[serde(default)]
    pub filename: String,
    /// Percentage, 0..=100.
    #[serde(default)]
    pub progress: u8,
}

/// Full report returned by `GET /analyze/{id}/results`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResults {
    pub document: DocumentInfo,
    pub summary: RiskSummary,
    #[serde(default)]
    pub risky_clauses: Vec<RiskyClause>,
    #[serde(default)]
    pub compound_risks: Vec<CompoundRisk>,
}

impl AnalysisResults {
    /// Look up a flagged clause by its chunk id.
    pub fn clause(&self, chunk_id: &str) -> Option<&RiskyClause> {
        self.risky_clauses.iter().find(|c| c.chunk_id == chunk_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub filename: String,
    pub total_chunks: u32,
    pub risky_clauses_found: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskSummary {
    pub overall_risk: String,
    pub average_risk_score: f64,
    pub compound_risks_found: u32,
    #[serde(default)]
    pub categories_flagged: Vec<String>,
}

/// A clause the analysis pipeline flagged, with the three-way debate and a fix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskyClause {
    /// Unique within one job.
    pub chunk_id: String,
    pub category: String,
    pub original_text: String,
    /// 0..=100.
    pub risk_score: u8,
    pub risk_level: String,
    #[serde(default)]
    pub pessimist_analysis: String,
    #[serde(default)]
    pub optimist_analysis: String,
    #[serde(default)]
    pub arbiter_reasoning: String,
    #[serde(default)]
    pub suggested_fix: String,
    #[serde(default)]
    pub fix_comment: String,
    #[serde(default)]
    pub key_changes: Vec<String>,
}

/// A risk that only emerges from several clauses read together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompoundRisk {
    pub risk_type: String,
    pub severity: String,
    pub description: String,
    #[serde(default)]
    pub affected_clauses: Vec<String>,
    #[serde(default)]
    pub mitigation: String,
    pub risk_score: f64,
}
