//! Task export

use std::io::Write;
use tracing::info;

use super::BulkError;
use crate::client::{ResourceClient, TaskQuery};
use crate::output::{self, RecordFormat, TaskRecord};
use crate::RemoteId;

/// Server-side filters for an export
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportFilter {
    /// Only these statuses
    pub statuses: Vec<String>,
    /// Only tasks assigned to these user ids
    pub assignees: Vec<String>,
    /// Include closed tasks
    pub include_closed: bool,
}

impl ExportFilter {
    /// Equivalent task listing query
    pub fn to_query(&self) -> TaskQuery {
        TaskQuery {
            statuses: self.statuses.clone(),
            assignees: self.assignees.clone(),
            include_closed: self.include_closed,
            ..TaskQuery::default()
        }
    }
}

/// Fetch every task of a list matching `filter` as export records
pub async fn collect_records(
    client: &ResourceClient,
    list_id: &RemoteId,
    filter: &ExportFilter,
) -> Result<Vec<TaskRecord>, BulkError> {
    let tasks = client
        .list_all_tasks(list_id.as_str(), &filter.to_query())
        .await?;
    Ok(tasks.iter().map(TaskRecord::from).collect())
}

/// Export a list's tasks to `out`. Returns the number of records written.
pub async fn export_tasks<W: Write>(
    client: &ResourceClient,
    list_id: &RemoteId,
    filter: &ExportFilter,
    format: RecordFormat,
    out: W,
) -> Result<usize, BulkError> {
    let records = collect_records(client, list_id, filter).await?;
    output::write_records(format, &records, out)?;
    info!(list_id = %list_id, records = records.len(), format = %format, "Exported tasks");
    Ok(records.len())
}
