//! User feedback records, their review status, and submission payloads.
//!
//! Records come back from `GET /admin/feedback` in whatever shape the feedback
//! store wrote them, so deserialisation here is lenient: ids may be numbers or
//! strings, timestamps may lack an offset, and `approved` may be an integer.

use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::analysis::RiskyClause;

/// Opaque feedback identifier. Always carried as a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct FeedbackId(String);

impl FeedbackId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FeedbackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FeedbackId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for FeedbackId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl<'de> Deserialize<'de> for FeedbackId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Int(i64),
            Text(String),
        }
        Ok(match Raw::deserialize(deserializer)? {
            Raw::Int(n) => Self(n.to_string()),
            Raw::Text(s) => Self(s),
        })
    }
}

/// Kind of feedback a user submitted against a clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FeedbackType {
    /// "Not risky": the user disputes a flagged clause.
    FalsePositive,
    /// The user reports a clause the analysis missed. Never reviewed in a bucket.
    FalseNegative,
    /// A verdict on the quality of a generated fix.
    ApproveFix,
    /// Any other type the feedback store wrote. Never reviewed in a bucket.
    #[serde(other)]
    Unknown,
}

impl FeedbackType {
    /// Path segment used by `POST /feedback/{type}`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FalsePositive => "false-positive",
            Self::FalseNegative => "false-negative",
            Self::ApproveFix => "approve-fix",
            Self::Unknown => "unknown",
        }
    }

    fn from_wire(raw: &str) -> Self {
        match raw {
            "false-positive" => Self::FalsePositive,
            "false-negative" => Self::FalseNegative,
            "approve-fix" => Self::ApproveFix,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for FeedbackType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operator review status of a feedback record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
    /// A status this client does not know. No operator transition starts or ends here.
    #[serde(other)]
    Unknown,
}

impl FeedbackStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Unknown => "unknown",
        }
    }

    fn from_wire(raw: &str) -> Self {
        match raw {
            "pending" => Self::Pending,
            "approved" => Self::Approved,
            "rejected" => Self::Rejected,
            _ => Self::Unknown,
        }
    }

    /// Check that an operator may move a record from `self` to `next`.
    ///
    /// Allowed: pending → approved, pending → rejected, approved → pending.
    /// `rejected` is final.
    pub fn transition_to(self, next: FeedbackStatus) -> Result<FeedbackStatus, TransitionError> {
        use FeedbackStatus::*;
        match (self, next) {
            (Pending, Approved) | (Pending, Rejected) | (Approved, Pending) => Ok(next),
            (Rejected, _) => Err(TransitionError::RejectedIsFinal),
            (from, to) => Err(TransitionError::Illegal { from, to }),
        }
    }
}

impl fmt::Display for FeedbackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("rejected feedback cannot change status")]
    RejectedIsFinal,

    #[error("feedback status cannot move from {from} to {to}")]
    Illegal {
        from: FeedbackStatus,
        to: FeedbackStatus,
    },
}

/// One piece of user feedback as stored server-side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub id: FeedbackId,
    /// Unrecognised types read as [`FeedbackType::Unknown`].
    #[serde(deserialize_with = "lenient_type")]
    pub feedback_type: FeedbackType,
    /// Absent or null on the wire means pending; unrecognised values are `Unknown`.
    #[serde(default, deserialize_with = "nullable_status")]
    pub status: FeedbackStatus,
    /// `None` when missing or unparseable.
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "nullable_text")]
    pub category: String,
    #[serde(default, deserialize_with = "nullable_text")]
    pub clause_text: String,
    #[serde(default, deserialize_with = "nullable_text")]
    pub suggested_fix: String,
    /// Fix-quality verdict for `approve-fix` records.
    #[serde(default, deserialize_with = "lenient_bool")]
    pub approved: Option<bool>,
    #[serde(default, deserialize_with = "nullable_text")]
    pub user_comment: String,
    #[serde(default)]
    pub pessimist_analysis: Option<String>,
    #[serde(default)]
    pub optimist_analysis: Option<String>,
    #[serde(default)]
    pub arbiter_reasoning: Option<String>,
    #[serde(default)]
    pub system_risk_score: Option<u32>,
}

impl FeedbackRecord {
    /// A pending record with empty text fields.
    pub fn new(
        id: impl Into<FeedbackId>,
        feedback_type: FeedbackType,
        timestamp: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id: id.into(),
            feedback_type,
            status: FeedbackStatus::Pending,
            timestamp,
            category: String::new(),
            clause_text: String::new(),
            suggested_fix: String::new(),
            approved: None,
            user_comment: String::new(),
            pessimist_analysis: None,
            optimist_analysis: None,
            arbiter_reasoning: None,
            system_risk_score: None,
        }
    }

    /// Move to `next` if the transition is allowed. Other fields are untouched.
    pub fn apply_status(&mut self, next: FeedbackStatus) -> Result<(), TransitionError> {
        self.status = self.status.transition_to(next)?;
        Ok(())
    }

    pub fn has_debate(&self) -> bool {
        self.pessimist_analysis.is_some()
            || self.optimist_analysis.is_some()
            || self.arbiter_reasoning.is_some()
    }
}

/// Parse a feedback timestamp: RFC 3339, or naive ISO 8601 read as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

fn nullable_status<'de, D: Deserializer<'de>>(d: D) -> Result<FeedbackStatus, D::Error> {
    let Some(raw) = Option::<String>::deserialize(d)? else {
        return Ok(FeedbackStatus::Pending);
    };
    let status = FeedbackStatus::from_wire(&raw);
    if status == FeedbackStatus::Unknown {
        warn!(status = %raw, "unknown feedback status");
    }
    Ok(status)
}

fn lenient_type<'de, D: Deserializer<'de>>(d: D) -> Result<FeedbackType, D::Error> {
    let raw = String::deserialize(d)?;
    let kind = FeedbackType::from_wire(&raw);
    if kind == FeedbackType::Unknown {
        warn!(feedback_type = %raw, "unknown feedback type");
    }
    Ok(kind)
}

fn nullable_text<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(d)?.unwrap_or_default())
}

fn lenient_timestamp<'de, D: Deserializer<'de>>(d: D) -> Result<Option<DateTime<Utc>>, D::Error> {
    let Some(raw) = Option::<String>::deserialize(d)? else {
        return Ok(None);
    };
    let parsed = parse_timestamp(&raw);
    if parsed.is_none() {
        warn!(timestamp = %raw, "unparseable feedback timestamp");
    }
    Ok(parsed)
}

fn lenient_bool<'de, D: Deserializer<'de>>(d: D) -> Result<Option<bool>, D::Error> {
    use serde_json::Value;
    Ok(match Value::deserialize(d)? {
        Value::Null => None,
        Value::Bool(b) => Some(b),
        Value::Number(n) => Some(n.as_f64().is_some_and(|v| v != 0.0)),
        other => {
            warn!(value = %other, "unexpected `approved` value");
            None
        }
    })
}

/// Body of `POST /feedback/{type}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackSubmission {
    pub chunk_id: String,
    pub clause_text: String,
    pub category: String,
    pub system_risk_score: u32,
    pub suggested_fix: Option<String>,
    pub approved: Option<bool>,
    pub user_comment: Option<String>,
    pub user_id: String,
    pub analysis_id: Option<String>,
    pub pessimist_analysis: Option<String>,
    pub optimist_analysis: Option<String>,
    pub arbiter_reasoning: Option<String>,
}

impl FeedbackSubmission {
    pub const ANONYMOUS: &'static str = "anonymous";

    /// Build a submission carrying the clause text, fix, and debate.
    pub fn for_clause(clause: &RiskyClause, analysis_id: Option<&str>) -> Self {
        Self {
            chunk_id: clause.chunk_id.clone(),
            clause_text: clause.original_text.clone(),
            category: clause.category.clone(),
            system_risk_score: u32::from(clause.risk_score),
            suggested_fix: Some(clause.suggested_fix.clone()),
            approved: None,
            user_comment: None,
            user_id: Self::ANONYMOUS.to_string(),
            analysis_id: analysis_id.map(str::to_string),
            pessimist_analysis: Some(clause.pessimist_analysis.clone()),
            optimist_analysis: Some(clause.optimist_analysis.clone()),
            arbiter_reasoning: Some(clause.arbiter_reasoning.clone()),
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.user_comment = Some(comment.into());
        self
    }

    pub fn with_verdict(mut self, approved: bool) -> Self {
        self.approved = Some(approved);
        self
    }
}

/// Server acknowledgement of a submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackReceipt {
    pub feedback_id: String,
    pub status: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn id_accepts_number_or_string() {
        let a: FeedbackId = serde_json::from_str("17").unwrap();
        let b: FeedbackId = serde_json::from_str(r#""fp_c-3_1718000000.5""#).unwrap();
        assert_eq!(a.as_str(), "17");
        assert_eq!(b.as_str(), "fp_c-3_1718000000.5");
        assert_eq!(serde_json::to_string(&a).unwrap(), r#""17""#);
    }

    #[test]
    fn missing_and_null_status_read_as_pending() {
        let missing: FeedbackRecord =
            serde_json::from_str(r#"{"id": 1, "feedback_type": "false-positive"}"#).unwrap();
        let null: FeedbackRecord = serde_json::from_str(
            r#"{"id": 2, "feedback_type": "approve-fix", "status": null}"#,
        )
        .unwrap();
        assert_eq!(missing.status, FeedbackStatus::Pending);
        assert_eq!(null.status, FeedbackStatus::Pending);
    }

    #[test]
    fn full_record_parses() {
        let json = r#"{
            "id": 9,
            "feedback_type": "approve-fix",
            "status": "approved",
            "timestamp": "2026-10-01T08:30:00.123456",
            "category": "Termination",
            "clause_text": "Either party may terminate at will.",
            "suggested_fix": "Require 30 days notice.",
            "approved": 1,
            "user_comment": "Good fix",
            "pessimist_analysis": "No notice period.",
            "system_risk_score": 64
        }"#;
        let rec: FeedbackRecord = serde_json::from_str(json).unwrap();
        assert_eq!(rec.status, FeedbackStatus::Approved);
        assert_eq!(rec.approved, Some(true));
        assert_eq!(rec.system_risk_score, Some(64));
        assert!(rec.has_debate());
        assert_eq!(rec.optimist_analysis, None);
        let ts = rec.timestamp.unwrap();
        assert_eq!(ts.date_naive().to_string(), "2026-10-01");
    }

    #[test]
    fn null_text_fields_read_as_empty() {
        let rec: FeedbackRecord = serde_json::from_str(
            r#"{
                "id": 4,
                "feedback_type": "approve-fix",
                "category": null,
                "clause_text": "Late fees accrue daily.",
                "suggested_fix": null,
                "user_comment": null
            }"#,
        )
        .unwrap();
        assert_eq!(rec.clause_text, "Late fees accrue daily.");
        assert_eq!(rec.category, "");
        assert_eq!(rec.suggested_fix, "");
        assert_eq!(rec.user_comment, "");
    }

    #[test]
    fn unknown_type_and_status_do_not_fail_the_list() {
        let records: Vec<FeedbackRecord> = serde_json::from_str(
            r#"[
                {"id": 1, "feedback_type": "false-positive"},
                {"id": 2, "feedback_type": "score_adjustment"},
                {"id": 3, "feedback_type": "approve-fix", "status": "archived"}
            ]"#,
        )
        .unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].feedback_type, FeedbackType::FalsePositive);
        assert_eq!(records[1].feedback_type, FeedbackType::Unknown);
        assert_eq!(records[1].status, FeedbackStatus::Pending);
        assert_eq!(records[2].status, FeedbackStatus::Unknown);
    }

    #[test]
    fn unknown_status_cannot_transition() {
        assert!(FeedbackStatus::Unknown.transition_to(FeedbackStatus::Pending).is_err());
        assert!(FeedbackStatus::Pending.transition_to(FeedbackStatus::Unknown).is_err());
    }

    #[test]
    fn bad_timestamp_becomes_none() {
        let rec: FeedbackRecord = serde_json::from_str(
            r#"{"id": "x", "feedback_type": "approve-fix", "timestamp": "yesterday"}"#,
        )
        .unwrap();
        assert!(rec.timestamp.is_none());
    }

    #[test]
    fn parse_timestamp_formats() {
        let expected = Utc.with_ymd_and_hms(2026, 10, 1, 8, 30, 0).unwrap();
        assert_eq!(parse_timestamp("2026-10-01T08:30:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2026-10-01T10:30:00+02:00"), Some(expected));
        assert_eq!(parse_timestamp("2026-10-01T08:30:00"), Some(expected));
        assert_eq!(parse_timestamp(""), None);
    }

    #[test]
    fn allowed_transitions() {
        use FeedbackStatus::*;
        assert_eq!(Pending.transition_to(Approved), Ok(Approved));
        assert_eq!(Pending.transition_to(Rejected), Ok(Rejected));
        assert_eq!(Approved.transition_to(Pending), Ok(Pending));
    }

    #[test]
    fn refused_transitions() {
        use FeedbackStatus::*;
        assert_eq!(
            Rejected.transition_to(Pending),
            Err(TransitionError::RejectedIsFinal)
        );
        assert_eq!(
            Rejected.transition_to(Approved),
            Err(TransitionError::RejectedIsFinal)
        );
        assert_eq!(
            Approved.transition_to(Rejected),
            Err(TransitionError::Illegal {
                from: Approved,
                to: Rejected
            })
        );
        assert!(Pending.transition_to(Pending).is_err());
    }

    #[test]
    fn apply_status_keeps_other_fields() {
        let mut rec = FeedbackRecord::new("5", FeedbackType::FalsePositive, None);
        rec.clause_text = "Fees are non-refundable.".into();
        rec.user_comment = "Industry standard".into();
        let before = rec.clone();

        rec.apply_status(FeedbackStatus::Approved).unwrap();
        rec.apply_status(FeedbackStatus::Pending).unwrap();
        assert_eq!(rec, before);
    }

    #[test]
    fn submission_from_clause() {
        let clause = RiskyClause {
            chunk_id: "c-1".into(),
            category: "Payment".into(),
            original_text: "Payment due in 7 days.".into(),
            risk_score: 55,
            risk_level: "MEDIUM".into(),
            pessimist_analysis: "Tight.".into(),
            optimist_analysis: "Fine.".into(),
            arbiter_reasoning: "Borderline.".into(),
            suggested_fix: "Payment due in 30 days.".into(),
            fix_comment: String::new(),
            key_changes: vec![],
        };
        let sub = FeedbackSubmission::for_clause(&clause, Some("job-1"))
            .with_comment("ok")
            .with_verdict(true);
        let body = serde_json::to_value(&sub).unwrap();
        assert_eq!(body["chunk_id"], "c-1");
        assert_eq!(body["system_risk_score"], 55);
        assert_eq!(body["approved"], true);
        assert_eq!(body["user_id"], "anonymous");
        assert_eq!(body["analysis_id"], "job-1");
    }
}
