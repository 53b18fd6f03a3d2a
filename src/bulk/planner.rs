//! Turns input records into bulk jobs.
//!
//! Records arrive as loosely typed JSON objects (CSV cells are always
//! strings, JSON files may carry numbers or arrays). Planning coerces each
//! field and keeps per-record errors instead of aborting the whole file.

use chrono::{DateTime, NaiveDate};
use serde_json::{Map, Value};
use tracing::debug;

use super::job::{BulkAction, BulkJob, JobKind, PlannedOperation};
use crate::client::config::DEFAULT_BATCH_SIZE;
use crate::client::{AssigneeChanges, NewTask, TaskUpdate};
use crate::output::{TaskRecord, LIST_SEPARATOR};
use crate::{Priority, RemoteId, Task};

/// Local filter applied to already fetched tasks.
///
/// Every set criterion must match; an empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    /// Status name, case-insensitive
    pub status: Option<String>,
    /// Assignee user id
    pub assignee: Option<String>,
    /// Substring of the name, case-insensitive
    pub name_contains: Option<String>,
    /// Tag name, case-insensitive
    pub tag: Option<String>,
}

impl TaskFilter {
    /// Whether `task` satisfies the filter
    pub fn matches(&self, task: &Task) -> bool {
        if let Some(status) = &self.status {
            if !task.status.status.eq_ignore_ascii_case(status.trim()) {
                return false;
            }
        }
        if let Some(assignee) = &self.assignee {
            if !task.is_assigned_to(assignee.trim()) {
                return false;
            }
        }
        if let Some(needle) = &self.name_contains {
            if !task.name.to_lowercase().contains(&needle.to_lowercase()) {
                return false;
            }
        }
        if let Some(tag) = &self.tag {
            if !task.tags.iter().any(|t| t.name.eq_ignore_ascii_case(tag.trim())) {
                return false;
            }
        }
        true
    }
}

/// Builds [`BulkJob`]s from records or fetched tasks
#[derive(Debug, Clone, Copy)]
pub struct BulkPlanner {
    batch_size: usize,
}

impl Default for BulkPlanner {
    fn default() -> Self {
        Self::new(DEFAULT_BATCH_SIZE)
    }
}

impl BulkPlanner {
    /// Planner producing jobs with `batch_size`
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
        }
    }

    /// One create per record, in input order. The `id` column is ignored.
    pub fn import(&self, records: Vec<Value>, list_id: &RemoteId) -> BulkJob {
        let operations = records
            .into_iter()
            .enumerate()
            .map(|(index, raw)| match new_task_from_record(&raw) {
                Ok(task) => PlannedOperation::planned(
                    index,
                    raw,
                    BulkAction::Create {
                        list_id: list_id.clone(),
                        task,
                    },
                ),
                Err(reason) => PlannedOperation::invalid(index, raw, reason),
            })
            .collect();
        self.job(JobKind::Import, operations)
    }

    /// The same update for every task that matches `filter`
    pub fn update_matching(&self, tasks: &[Task], filter: &TaskFilter, update: &TaskUpdate) -> BulkJob {
        let checked = update.validate();
        let operations = tasks
            .iter()
            .filter(|task| filter.matches(task))
            .enumerate()
            .map(|(index, task)| {
                let raw = serde_json::to_value(TaskRecord::from(task)).unwrap_or(Value::Null);
                match &checked {
                    Ok(()) => PlannedOperation::planned(
                        index,
                        raw,
                        BulkAction::Update {
                            task_id: task.id.clone(),
                            update: update.clone(),
                        },
                    ),
                    Err(reason) => PlannedOperation::invalid(index, raw, reason.clone()),
                }
            })
            .collect::<Vec<_>>();
        debug!(fetched = tasks.len(), matched = operations.len(), "Filtered tasks for update");
        self.job(JobKind::Update, operations)
    }

    /// One update per record; each record names its task in `id` (or `task_id`)
    pub fn updates_from_records(&self, records: Vec<Value>) -> BulkJob {
        let operations = records
            .into_iter()
            .enumerate()
            .map(|(index, raw)| match update_from_record(&raw) {
                Ok((task_id, update)) => {
                    PlannedOperation::planned(index, raw, BulkAction::Update { task_id, update })
                }
                Err(reason) => PlannedOperation::invalid(index, raw, reason),
            })
            .collect();
        self.job(JobKind::Update, operations)
    }

    fn job(&self, kind: JobKind, operations: Vec<PlannedOperation>) -> BulkJob {
        BulkJob::new(kind, operations).with_batch_size(self.batch_size)
    }
}

fn as_object(raw: &Value) -> Result<&Map<String, Value>, String> {
    raw.as_object()
        .ok_or_else(|| "record is not an object".to_string())
}

/// Task body from an import record
pub fn new_task_from_record(raw: &Value) -> Result<NewTask, String> {
    let record = as_object(raw)?;
    let name = text_field(record, "name")?.ok_or_else(|| "missing required field `name`".to_string())?;

    Ok(NewTask {
        name,
        description: free_text_field(record, "description")?,
        status: text_field(record, "status")?,
        priority: priority_field(record, "priority")?,
        due_date: date_field(record, "due_date")?,
        start_date: date_field(record, "start_date")?,
        assignees: user_ids_field(record, "assignees")?,
        tags: list_field(record, "tags")?,
    })
}

/// Target task and changes from an update record
pub fn update_from_record(raw: &Value) -> Result<(RemoteId, TaskUpdate), String> {
    let record = as_object(raw)?;
    let task_id = match text_field(record, "id")? {
        Some(id) => id,
        None => text_field(record, "task_id")?
            .ok_or_else(|| "missing required field `id`".to_string())?,
    };

    let update = TaskUpdate {
        name: text_field(record, "name")?,
        description: free_text_field(record, "description")?,
        status: text_field(record, "status")?,
        priority: priority_field(record, "priority")?,
        due_date: date_field(record, "due_date")?,
        start_date: date_field(record, "start_date")?,
        assignees: AssigneeChanges {
            add: user_ids_field(record, "assignees")?,
            remove: user_ids_field(record, "remove_assignees")?,
        },
    };
    update.validate()?;
    Ok((RemoteId::new(task_id), update))
}

/// Non-empty trimmed text; numbers and booleans are rendered as text
fn text_field(record: &Map<String, Value>, key: &str) -> Result<Option<String>, String> {
    match record.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
        }
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(_) => Err(format!("field `{key}` must be text")),
    }
}

/// Text kept verbatim, indentation and trailing newlines included.
/// Whitespace-only values read as absent.
fn free_text_field(record: &Map<String, Value>, key: &str) -> Result<Option<String>, String> {
    match record.get(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(Some(s.clone())),
        Some(Value::String(_)) => Ok(None),
        _ => text_field(record, key),
    }
}

/// Label (`high`) or level (`2`)
fn priority_field(record: &Map<String, Value>, key: &str) -> Result<Option<u8>, String> {
    let Some(text) = text_field(record, key)? else {
        return Ok(None);
    };
    text.parse::<Priority>().map(|p| Some(p.level()))
}

/// Unix milliseconds, `YYYY-MM-DD` (midnight UTC) or RFC 3339
fn date_field(record: &Map<String, Value>, key: &str) -> Result<Option<i64>, String> {
    let Some(text) = text_field(record, key)? else {
        return Ok(None);
    };
    parse_date(&text)
        .map(Some)
        .ok_or_else(|| {
            format!("invalid {key} '{text}': expected Unix milliseconds, YYYY-MM-DD or RFC 3339")
        })
}

/// Parse Unix milliseconds, `YYYY-MM-DD` (midnight UTC) or RFC 3339
pub fn parse_date(text: &str) -> Option<i64> {
    let text = text.trim();
    if text.bytes().all(|b| b.is_ascii_digit()) {
        return text.parse().ok();
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return date
            .and_hms_opt(0, 0, 0)
            .map(|midnight| midnight.and_utc().timestamp_millis());
    }
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|dt| dt.timestamp_millis())
}

/// Array of values, or one string separated by [`LIST_SEPARATOR`].
/// Commas stay inside items so exported tags like `a,b` survive a round trip.
fn list_field(record: &Map<String, Value>, key: &str) -> Result<Vec<String>, String> {
    let items: Vec<String> = match record.get(key) {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::String(s)) => s
            .split(LIST_SEPARATOR)
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect(),
        Some(Value::Array(values)) => values
            .iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s.trim().to_string()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .filter(|item| !item.is_empty())
            .collect(),
        Some(Value::Number(n)) => vec![n.to_string()],
        Some(_) => return Err(format!("field `{key}` must be a list")),
    };
    Ok(items)
}

fn user_ids_field(record: &Map<String, Value>, key: &str) -> Result<Vec<u64>, String> {
    list_field(record, key)?
        .into_iter()
        .map(|id| {
            id.parse::<u64>()
                .map_err(|_| format!("invalid user id '{id}' in `{key}`"))
        })
        .collect()
}
