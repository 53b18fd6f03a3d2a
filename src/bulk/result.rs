//! Per-record outcomes of a bulk job

use serde::Serialize;
use serde_json::Value;

use super::{BulkError, JobKind};
use crate::client::{FailureKind, RequestEnvelope};
use crate::Task;

/// What happened to one record
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RecordOutcome {
    /// Remote call succeeded
    Succeeded {
        /// Task returned by the service
        task: Box<Task>,
    },
    /// Rejected locally or by the service
    Failed {
        /// Failure classification
        kind: FailureKind,
        /// Error text
        message: String,
    },
    /// Dry-run: the record passed every local check
    WouldSucceed {
        /// Request that would be sent
        request: RequestEnvelope,
    },
    /// Dry-run: the record fails local checks
    WouldFail {
        /// Why the record would be rejected
        reason: String,
    },
    /// Not attempted because the job was cancelled
    Skipped,
}

impl RecordOutcome {
    /// Label used in logs and metrics
    pub fn label(&self) -> &'static str {
        match self {
            RecordOutcome::Succeeded { .. } => "succeeded",
            RecordOutcome::Failed { .. } => "failed",
            RecordOutcome::WouldSucceed { .. } => "would_succeed",
            RecordOutcome::WouldFail { .. } => "would_fail",
            RecordOutcome::Skipped => "skipped",
        }
    }

    /// Failed or would fail
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            RecordOutcome::Failed { .. } | RecordOutcome::WouldFail { .. }
        )
    }
}

/// Outcome of one input record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordResult {
    /// Position of the record in the input
    pub index: usize,
    /// Record as read from the input
    pub raw: Value,
    /// Outcome
    #[serde(flatten)]
    pub outcome: RecordOutcome,
}

/// Outcome counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BulkSummary {
    /// Records in the job
    pub total: usize,
    /// Remote calls that succeeded
    pub succeeded: usize,
    /// Records that failed
    pub failed: usize,
    /// Dry-run records that passed
    pub would_succeed: usize,
    /// Dry-run records that would be rejected
    pub would_fail: usize,
    /// Records skipped after cancellation
    pub skipped: usize,
}

/// Result of a bulk job: one entry per input record, in input order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BulkResult {
    /// Job kind
    pub kind: JobKind,
    /// Whether this was a dry-run
    pub dry_run: bool,
    /// Whether the job stopped early on cancellation
    pub cancelled: bool,
    /// Sizes of the batches that ran, in order
    pub batches: Vec<usize>,
    /// Per-record results, same length and order as the input
    pub records: Vec<RecordResult>,
}

impl BulkResult {
    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the job had no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Outcome counts
    pub fn summary(&self) -> BulkSummary {
        let mut summary = BulkSummary {
            total: self.records.len(),
            ..BulkSummary::default()
        };
        for record in &self.records {
            match record.outcome {
                RecordOutcome::Succeeded { .. } => summary.succeeded += 1,
                RecordOutcome::Failed { .. } => summary.failed += 1,
                RecordOutcome::WouldSucceed { .. } => summary.would_succeed += 1,
                RecordOutcome::WouldFail { .. } => summary.would_fail += 1,
                RecordOutcome::Skipped => summary.skipped += 1,
            }
        }
        summary
    }

    /// Records that failed or would fail
    pub fn failures(&self) -> impl Iterator<Item = &RecordResult> {
        self.records.iter().filter(|r| r.outcome.is_failure())
    }

    /// Whether any record failed or would fail
    pub fn has_failures(&self) -> bool {
        self.failures().next().is_some()
    }

    /// `Ok` when every record succeeded (or would succeed), otherwise
    /// [`BulkError::PartialBatchFailure`] carrying the full result
    pub fn into_result(self) -> Result<Self, BulkError> {
        if self.has_failures() {
            Err(BulkError::PartialBatchFailure(self))
        } else {
            Ok(self)
        }
    }
}
