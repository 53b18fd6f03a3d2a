//! Runs bulk jobs batch by batch

use futures::stream::{self, StreamExt};
use indicatif::ProgressBar;
use tracing::{info, info_span, warn, Instrument};

use super::job::{BulkAction, BulkJob, JobKind, PlannedOperation};
use super::result::{BulkResult, RecordOutcome, RecordResult};
use crate::cancel::CancelHandle;
use crate::client::{FailureKind, ResourceClient};
use crate::metrics;

/// Executes [`BulkJob`]s against a [`ResourceClient`].
///
/// Batches run one after another in input order. Within a batch up to
/// `concurrency` records are in flight at once; results are placed back by
/// position so the output order never depends on completion order.
#[derive(Clone)]
pub struct BulkExecutor {
    client: ResourceClient,
    concurrency: usize,
    cancel: Option<CancelHandle>,
    progress: Option<ProgressBar>,
}

impl BulkExecutor {
    /// Sequential executor
    pub fn new(client: ResourceClient) -> Self {
        Self {
            client,
            concurrency: 1,
            cancel: None,
            progress: None,
        }
    }

    /// Records in flight per batch (at least 1)
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Stop between batches once `cancel` trips
    pub fn with_cancel(mut self, cancel: CancelHandle) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Advance `progress` once per finished record
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelHandle::is_cancelled)
    }

    /// Run `job` to completion (or cancellation).
    ///
    /// Always returns one result per record. Dry-runs make no remote calls.
    pub async fn execute(&self, job: BulkJob) -> BulkResult {
        let span = info_span!(
            "bulk_job",
            kind = job.kind.as_str(),
            records = job.len(),
            batch_size = job.batch_size,
            dry_run = job.dry_run
        );
        self.run(job).instrument(span).await
    }

    async fn run(&self, job: BulkJob) -> BulkResult {
        let BulkJob {
            kind,
            operations,
            batch_size,
            dry_run,
        } = job;
        let batch_size = batch_size.max(1);

        let total = operations.len();
        let mut slots: Vec<Option<RecordResult>> = (0..total).map(|_| None).collect();
        let mut batches = Vec::new();
        let mut cancelled = false;
        let mut pending = operations.into_iter().enumerate();

        loop {
            let batch: Vec<(usize, PlannedOperation)> = pending.by_ref().take(batch_size).collect();
            if batch.is_empty() {
                break;
            }

            if self.is_cancelled() {
                cancelled = true;
                warn!(
                    completed = batches.iter().sum::<usize>(),
                    total = total,
                    "Cancellation requested, skipping remaining records"
                );
                for (position, op) in batch.into_iter().chain(pending.by_ref()) {
                    slots[position] = Some(self.finish(kind, op, RecordOutcome::Skipped));
                }
                break;
            }

            let batch_number = batches.len() + 1;
            batches.push(batch.len());
            info!(batch = batch_number, size = batch.len(), "Running batch");

            if dry_run {
                for (position, op) in batch {
                    let outcome = match op.prepare() {
                        Ok(request) => RecordOutcome::WouldSucceed { request },
                        Err(reason) => RecordOutcome::WouldFail { reason },
                    };
                    slots[position] = Some(self.finish(kind, op, outcome));
                }
            } else {
                let finished: Vec<(usize, RecordResult)> = stream::iter(batch)
                    .map(|(position, op)| async move {
                        let outcome = self.apply(&op).await;
                        (position, self.finish(kind, op, outcome))
                    })
                    .buffer_unordered(self.concurrency)
                    .collect()
                    .await;
                for (position, result) in finished {
                    slots[position] = Some(result);
                }
            }
        }

        let result = BulkResult {
            kind,
            dry_run,
            cancelled,
            batches,
            records: slots.into_iter().flatten().collect(),
        };

        let summary = result.summary();
        info!(
            total = summary.total,
            succeeded = summary.succeeded,
            failed = summary.failed,
            would_succeed = summary.would_succeed,
            would_fail = summary.would_fail,
            skipped = summary.skipped,
            "Bulk job finished"
        );
        result
    }

    async fn apply(&self, op: &PlannedOperation) -> RecordOutcome {
        let action = match &op.action {
            Ok(action) => action,
            Err(reason) => {
                return RecordOutcome::Failed {
                    kind: FailureKind::Validation,
                    message: reason.clone(),
                }
            }
        };

        let response = match action {
            BulkAction::Create { list_id, task } => {
                self.client.create_task(list_id.as_str(), task).await
            }
            BulkAction::Update { task_id, update } => {
                self.client.update_task(task_id.as_str(), update).await
            }
        };

        match response {
            Ok(task) => RecordOutcome::Succeeded {
                task: Box::new(task),
            },
            Err(e) => {
                warn!(index = op.index, error = %e, "Record failed");
                RecordOutcome::Failed {
                    kind: e.kind(),
                    message: e.to_string(),
                }
            }
        }
    }

    fn finish(&self, kind: JobKind, op: PlannedOperation, outcome: RecordOutcome) -> RecordResult {
        metrics::record_bulk_outcome(kind.as_str(), outcome.label());
        if let Some(progress) = &self.progress {
            progress.inc(1);
        }
        RecordResult {
            index: op.index,
            raw: op.raw,
            outcome,
        }
    }
}
