//! Bulk job definition

use serde::Serialize;
use serde_json::Value;
use std::fmt;

use crate::client::config::DEFAULT_BATCH_SIZE;
use crate::client::{
    create_task_envelope, update_task_envelope, ApiResult, NewTask, RequestEnvelope, TaskUpdate,
};
use crate::RemoteId;

/// Kind of bulk job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Create tasks from records
    Import,
    /// Update existing tasks
    Update,
}

impl JobKind {
    /// Label used in logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::Import => "import",
            JobKind::Update => "update",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The remote call planned for one record
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum BulkAction {
    /// Create a task in a list
    Create {
        /// Target list
        list_id: RemoteId,
        /// Task body
        task: NewTask,
    },
    /// Update a task
    Update {
        /// Target task
        task_id: RemoteId,
        /// Fields to change
        update: TaskUpdate,
    },
}

impl BulkAction {
    /// Validate and build the envelope this action would send
    pub fn envelope(&self) -> ApiResult<RequestEnvelope> {
        match self {
            BulkAction::Create { list_id, task } => create_task_envelope(list_id.as_str(), task),
            BulkAction::Update { task_id, update } => {
                update_task_envelope(task_id.as_str(), update)
            }
        }
    }
}

/// One record of a job: its input position, raw input and planned action
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedOperation {
    /// Position of the record in the input
    pub index: usize,
    /// Record as read from the input, kept for reporting
    pub raw: Value,
    /// Planned action, or why the record could not be planned
    pub action: Result<BulkAction, String>,
}

impl PlannedOperation {
    /// Planned operation with a valid action
    pub fn planned(index: usize, raw: Value, action: BulkAction) -> Self {
        Self {
            index,
            raw,
            action: Ok(action),
        }
    }

    /// Operation whose record failed local validation
    pub fn invalid(index: usize, raw: Value, reason: impl Into<String>) -> Self {
        Self {
            index,
            raw,
            action: Err(reason.into()),
        }
    }

    /// Run every local check and return the envelope that would be sent.
    ///
    /// Shared by dry-runs and live runs so both reject the same records.
    pub fn prepare(&self) -> Result<RequestEnvelope, String> {
        let action = self.action.as_ref().map_err(Clone::clone)?;
        action.envelope().map_err(|e| e.to_string())
    }
}

/// Ordered per-record operations with batching and dry-run settings
#[derive(Debug, Clone, PartialEq)]
pub struct BulkJob {
    /// Job kind
    pub kind: JobKind,
    /// Operations in input order
    pub operations: Vec<PlannedOperation>,
    /// Records per batch
    pub batch_size: usize,
    /// Validate and preview only
    pub dry_run: bool,
}

impl BulkJob {
    /// Job with the default batch size
    pub fn new(kind: JobKind, operations: Vec<PlannedOperation>) -> Self {
        Self {
            kind,
            operations,
            batch_size: DEFAULT_BATCH_SIZE,
            dry_run: false,
        }
    }

    /// Set the batch size (at least 1)
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Toggle dry-run
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Whether the job has no records
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Number of batches the job will run in
    pub fn batch_count(&self) -> usize {
        self.operations.len().div_ceil(self.batch_size.max(1))
    }

    /// Records rejected during planning
    pub fn invalid_count(&self) -> usize {
        self.operations.iter().filter(|op| op.action.is_err()).count()
    }
}
