//! Bulk import, export and mass update
//!
//! A job is planned up front ([`BulkPlanner`]), then run by a
//! [`BulkExecutor`] in fixed-size batches. One bad record never aborts the
//! job: every input record gets exactly one [`RecordOutcome`], in input order.

pub mod executor;
pub mod export;
pub mod job;
pub mod planner;
pub mod result;

pub use executor::BulkExecutor;
pub use export::{collect_records, export_tasks, ExportFilter};
pub use job::{BulkAction, BulkJob, JobKind, PlannedOperation};
pub use planner::{parse_date, BulkPlanner, TaskFilter};
pub use result::{BulkResult, BulkSummary, RecordOutcome, RecordResult};

use crate::client::ApiError;
use crate::output::OutputError;

/// Bulk errors
#[derive(Debug, thiserror::Error)]
pub enum BulkError {
    /// Some records failed; carries every record's outcome
    #[error("{}", describe_partial(.0))]
    PartialBatchFailure(BulkResult),

    /// API error outside per-record work (e.g. fetching tasks to export)
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Reading or writing records failed
    #[error("codec error: {0}")]
    Codec(#[from] OutputError),

    /// Opening an input or output file failed
    #[error("IO error: {0}")]
    Io(String),
}

fn describe_partial(result: &BulkResult) -> String {
    let summary = result.summary();
    format!(
        "{} of {} records failed",
        summary.failed + summary.would_fail,
        summary.total
    )
}
