//! Feedback triage: partitions a feedback collection into operator review queues.
//!
//! Buckets are derived views. They are recomputed from the whole collection
//! and a clock instant every time they are asked for; nothing is cached and no
//! record is ever mutated here.
//!
//! | bucket                | feedback type            | status   | extra                |
//! |-----------------------|--------------------------|----------|----------------------|
//! | false-positive review | `false-positive`         | pending  |                      |
//! | fix-quality review    | `approve-fix`            | pending  | inside the window    |
//! | approved              | any (or the scoped type) | approved |                      |

use chrono::{DateTime, TimeDelta, Utc};

use crate::feedback::{FeedbackRecord, FeedbackStatus, FeedbackType};

/// Age limit for records shown in a review queue.
///
/// A record is visible while `now - timestamp < window`. A record with no
/// usable timestamp is never visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibilityWindow(TimeDelta);

impl VisibilityWindow {
    pub const DEFAULT_DAYS: u32 = 30;

    pub fn days(days: u32) -> Self {
        Self(TimeDelta::days(i64::from(days)))
    }

    pub fn length(&self) -> TimeDelta {
        self.0
    }

    pub fn admits(&self, timestamp: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        timestamp.is_some_and(|ts| now.signed_duration_since(ts) < self.0)
    }
}

impl Default for VisibilityWindow {
    fn default() -> Self {
        Self::days(Self::DEFAULT_DAYS)
    }
}

/// Named review queue a record can land in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    FalsePositiveReview,
    FixReview,
    Approved,
}

impl Bucket {
    pub fn title(self) -> &'static str {
        match self {
            Self::FalsePositiveReview => "False-positive claims",
            Self::FixReview => "Fix quality reviews",
            Self::Approved => "Approved",
        }
    }
}

/// Knobs for [`TriagePolicy::triage`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TriagePolicy {
    pub fix_review_window: VisibilityWindow,
    /// Restrict the approved bucket to one feedback type. `None` keeps every type.
    pub approved_scope: Option<FeedbackType>,
}

impl TriagePolicy {
    pub fn with_window(window: VisibilityWindow) -> Self {
        Self {
            fix_review_window: window,
            ..Self::default()
        }
    }

    /// Which bucket `record` belongs to at `now`, if any.
    pub fn bucket_of(&self, record: &FeedbackRecord, now: DateTime<Utc>) -> Option<Bucket> {
        match (record.status, record.feedback_type) {
            (FeedbackStatus::Pending, FeedbackType::FalsePositive) => {
                Some(Bucket::FalsePositiveReview)
            }
            (FeedbackStatus::Pending, FeedbackType::ApproveFix) => self
                .fix_review_window
                .admits(record.timestamp, now)
                .then_some(Bucket::FixReview),
            (_, FeedbackType::Unknown) => None,
            (FeedbackStatus::Approved, kind) => match self.approved_scope {
                Some(scope) if scope != kind => None,
                _ => Some(Bucket::Approved),
            },
            _ => None,
        }
    }

    /// Partition `records` into buckets, preserving collection order.
    pub fn triage<'a>(&self, records: &'a [FeedbackRecord], now: DateTime<Utc>) -> Buckets<'a> {
        let mut buckets = Buckets::default();
        for record in records {
            match self.bucket_of(record, now) {
                Some(Bucket::FalsePositiveReview) => buckets.false_positive_review.push(record),
                Some(Bucket::FixReview) => buckets.fix_review.push(record),
                Some(Bucket::Approved) => buckets.approved.push(record),
                None => {
                    if record.status == FeedbackStatus::Pending
                        && record.feedback_type == FeedbackType::ApproveFix
                    {
                        buckets.hidden_fix_reviews += 1;
                    }
                }
            }
        }
        buckets
    }
}

/// Result of one triage pass.
#[derive(Debug, Default)]
pub struct Buckets<'a> {
    pub false_positive_review: Vec<&'a FeedbackRecord>,
    pub fix_review: Vec<&'a FeedbackRecord>,
    pub approved: Vec<&'a FeedbackRecord>,
    /// Pending fix reviews excluded by the visibility window.
    pub hidden_fix_reviews: usize,
}

impl<'a> Buckets<'a> {
    pub fn get(&self, bucket: Bucket) -> &[&'a FeedbackRecord] {
        match bucket {
            Bucket::FalsePositiveReview => &self.false_positive_review,
            Bucket::FixReview => &self.fix_review,
            Bucket::Approved => &self.approved,
        }
    }

    pub fn pending_review_count(&self) -> usize {
        self.false_positive_review.len() + self.fix_review.len()
    }
}
