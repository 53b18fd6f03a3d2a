//! CSV codec for task records

use csv::{ReaderBuilder, Trim, Writer};
use serde::Serialize;
use serde_json::{Map, Value};
use std::io::{Read, Write};
use tracing::debug;

use super::{
    OutputError, OutputResult, OutputWriter, TaskRecord, TaskWriter, LIST_SEPARATOR, TASK_FIELDS,
};

/// Flat CSV row; list fields are joined with [`LIST_SEPARATOR`]
#[derive(Debug, Serialize)]
struct TaskRow<'a> {
    id: &'a str,
    name: &'a str,
    description: &'a str,
    status: &'a str,
    priority: &'a str,
    assignees: String,
    tags: String,
    due_date: &'a str,
    start_date: &'a str,
}

impl<'a> From<&'a TaskRecord> for TaskRow<'a> {
    fn from(record: &'a TaskRecord) -> Self {
        let sep = LIST_SEPARATOR.to_string();
        Self {
            id: &record.id,
            name: &record.name,
            description: record.description.as_deref().unwrap_or_default(),
            status: &record.status,
            priority: record.priority.as_deref().unwrap_or_default(),
            assignees: record.assignees.join(&sep),
            tags: record.tags.join(&sep),
            due_date: record.due_date.as_deref().unwrap_or_default(),
            start_date: record.start_date.as_deref().unwrap_or_default(),
        }
    }
}

/// CSV writer for task records
pub struct CsvTaskWriter<W: Write> {
    writer: Writer<W>,
    records_written: u64,
}

impl<W: Write> CsvTaskWriter<W> {
    /// Wrap `out`; the header row is written before the first record
    pub fn new(out: W) -> Self {
        Self {
            writer: Writer::from_writer(out),
            records_written: 0,
        }
    }

    /// Records written so far
    pub fn records_written(&self) -> u64 {
        self.records_written
    }
}

impl<W: Write> TaskWriter for CsvTaskWriter<W> {
    fn write_task(&mut self, record: &TaskRecord) -> OutputResult<()> {
        self.writer
            .serialize(TaskRow::from(record))
            .map_err(|e| OutputError::CsvError(format!("Failed to write task {}: {e}", record.id)))?;
        self.records_written += 1;
        Ok(())
    }
}

impl<W: Write> OutputWriter for CsvTaskWriter<W> {
    fn flush(&mut self) -> OutputResult<()> {
        self.writer
            .flush()
            .map_err(|e| OutputError::FlushError(format!("Failed to flush: {e}")))
    }

    fn close(mut self) -> OutputResult<()> {
        // an empty export still gets a header row
        if self.records_written == 0 {
            self.writer
                .write_record(TASK_FIELDS)
                .map_err(|e| OutputError::CsvError(format!("Failed to write header: {e}")))?;
        }
        self.flush()?;
        debug!(records = self.records_written, "CSV writer closed");
        Ok(())
    }
}

/// Read CSV rows into JSON objects keyed by header.
///
/// Headers are trimmed, cells are kept verbatim so free text keeps its
/// indentation. Empty cells are omitted so they read as absent fields.
pub fn read_records<R: Read>(input: R) -> OutputResult<Vec<Value>> {
    let mut reader = ReaderBuilder::new()
        .trim(Trim::Headers)
        .flexible(false)
        .from_reader(input);

    let headers = reader
        .headers()
        .map_err(|e| OutputError::CsvError(format!("Failed to read header row: {e}")))?
        .clone();

    let mut records = Vec::new();
    for (row, result) in reader.records().enumerate() {
        let record =
            result.map_err(|e| OutputError::CsvError(format!("Malformed row {}: {e}", row + 1)))?;

        let object: Map<String, Value> = headers
            .iter()
            .zip(record.iter())
            .filter(|(_, cell)| !cell.is_empty())
            .map(|(header, cell)| (header.to_string(), Value::String(cell.to_string())))
            .collect();
        records.push(Value::Object(object));
    }

    debug!(records = records.len(), "Read CSV records");
    Ok(records)
}
