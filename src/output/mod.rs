//! Record codecs for bulk import and export
//!
//! Export writes one [`TaskRecord`] per task, with a fixed field order, as CSV
//! (header row) or a JSON array. Import reads either encoding back into raw
//! JSON objects; typing and coercion happen in the bulk planner.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::Path;
use std::str::FromStr;

use crate::Task;

pub mod csv;
pub mod json;

pub use self::csv::CsvTaskWriter;
pub use self::json::JsonTaskWriter;

/// Column order of exported task records
pub const TASK_FIELDS: [&str; 9] = [
    "id",
    "name",
    "description",
    "status",
    "priority",
    "assignees",
    "tags",
    "due_date",
    "start_date",
];

/// Separator for multi-valued CSV cells
pub const LIST_SEPARATOR: char = ';';

/// Output writer errors
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    /// IO error
    #[error("IO error: {0}")]
    IoError(String),

    /// CSV read or write error
    #[error("CSV error: {0}")]
    CsvError(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// Buffer flush error
    #[error("flush error: {0}")]
    FlushError(String),

    /// File extension or format name not recognised
    #[error("unsupported format: {0} (expected csv or json)")]
    UnsupportedFormat(String),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Encoding of an import or export file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordFormat {
    /// Delimited text with a header row
    Csv,
    /// Array of objects
    Json,
}

impl RecordFormat {
    /// Infer the format from a file extension
    pub fn from_path(path: &Path) -> OutputResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        ext.parse()
            .map_err(|_| OutputError::UnsupportedFormat(path.display().to_string()))
    }
}

impl FromStr for RecordFormat {
    type Err = OutputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(RecordFormat::Csv),
            "json" => Ok(RecordFormat::Json),
            _ => Err(OutputError::UnsupportedFormat(s.to_string())),
        }
    }
}

impl fmt::Display for RecordFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RecordFormat::Csv => "csv",
            RecordFormat::Json => "json",
        };
        write!(f, "{s}")
    }
}

/// Serializable view of a task, fields in [`TASK_FIELDS`] order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    /// Task id
    pub id: String,
    /// Name
    pub name: String,
    /// Description
    pub description: Option<String>,
    /// Status name
    pub status: String,
    /// Priority label
    pub priority: Option<String>,
    /// Assignee user ids
    pub assignees: Vec<String>,
    /// Tag names
    pub tags: Vec<String>,
    /// Due date, Unix milliseconds
    pub due_date: Option<String>,
    /// Start date, Unix milliseconds
    pub start_date: Option<String>,
}

impl From<&Task> for TaskRecord {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id.to_string(),
            name: task.name.clone(),
            description: task.description.clone().filter(|d| !d.is_empty()),
            status: task.status.status.clone(),
            priority: task.priority_level().map(|p| p.to_string()),
            assignees: task.assignees.iter().map(|a| a.id.to_string()).collect(),
            tags: task.tags.iter().map(|t| t.name.clone()).collect(),
            due_date: task.due_date.clone(),
            start_date: task.start_date.clone(),
        }
    }
}

/// Generic output writer
pub trait OutputWriter {
    /// Flush any buffered data
    fn flush(&mut self) -> OutputResult<()>;

    /// Close the writer and finalize output
    fn close(self) -> OutputResult<()>;
}

/// Writer of task records
pub trait TaskWriter: OutputWriter {
    /// Write a single record
    fn write_task(&mut self, record: &TaskRecord) -> OutputResult<()>;

    /// Write multiple records at once
    fn write_tasks(&mut self, records: &[TaskRecord]) -> OutputResult<()> {
        for record in records {
            self.write_task(record)?;
        }
        Ok(())
    }
}

/// Encode `records` to `out` in `format`
pub fn write_records<W: Write>(
    format: RecordFormat,
    records: &[TaskRecord],
    out: W,
) -> OutputResult<()> {
    match format {
        RecordFormat::Csv => {
            let mut writer = CsvTaskWriter::new(out);
            writer.write_tasks(records)?;
            writer.close()
        }
        RecordFormat::Json => {
            let mut writer = JsonTaskWriter::new(out);
            writer.write_tasks(records)?;
            writer.close()
        }
    }
}

/// Decode raw records from `input` in `format`
pub fn read_records_from<R: Read>(format: RecordFormat, input: R) -> OutputResult<Vec<Value>> {
    match format {
        RecordFormat::Csv => csv::read_records(input),
        RecordFormat::Json => json::read_records(input),
    }
}

/// Decode raw records from a file, choosing the format by extension
pub fn read_records(path: &Path) -> OutputResult<Vec<Value>> {
    let format = RecordFormat::from_path(path)?;
    let file = File::open(path)
        .map_err(|e| OutputError::IoError(format!("Failed to open {}: {e}", path.display())))?;
    read_records_from(format, BufReader::new(file))
}
