//! JSON codec for task records

use serde_json::Value;
use std::io::{Read, Write};
use tracing::debug;

use super::{OutputError, OutputResult, OutputWriter, TaskRecord, TaskWriter};

/// Writes records as one pretty-printed JSON array on close
pub struct JsonTaskWriter<W: Write> {
    out: W,
    records: Vec<TaskRecord>,
}

impl<W: Write> JsonTaskWriter<W> {
    /// Wrap `out`
    pub fn new(out: W) -> Self {
        Self {
            out,
            records: Vec::new(),
        }
    }
}

impl<W: Write> TaskWriter for JsonTaskWriter<W> {
    fn write_task(&mut self, record: &TaskRecord) -> OutputResult<()> {
        self.records.push(record.clone());
        Ok(())
    }
}

impl<W: Write> OutputWriter for JsonTaskWriter<W> {
    fn flush(&mut self) -> OutputResult<()> {
        self.out
            .flush()
            .map_err(|e| OutputError::FlushError(format!("Failed to flush: {e}")))
    }

    fn close(mut self) -> OutputResult<()> {
        serde_json::to_writer_pretty(&mut self.out, &self.records)
            .map_err(|e| OutputError::SerializationError(e.to_string()))?;
        self.out
            .write_all(b"\n")
            .map_err(|e| OutputError::IoError(e.to_string()))?;
        self.flush()?;
        debug!(records = self.records.len(), "JSON writer closed");
        Ok(())
    }
}

/// Read a JSON array of objects
pub fn read_records<R: Read>(input: R) -> OutputResult<Vec<Value>> {
    let value: Value = serde_json::from_reader(input)
        .map_err(|e| OutputError::SerializationError(format!("Invalid JSON: {e}")))?;

    let Value::Array(items) = value else {
        return Err(OutputError::SerializationError(
            "expected a JSON array of objects".to_string(),
        ));
    };
    if let Some(index) = items.iter().position(|item| !item.is_object()) {
        return Err(OutputError::SerializationError(format!(
            "element {index} is not an object"
        )));
    }
    Ok(items)
}
