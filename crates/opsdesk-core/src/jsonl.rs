//! JSONL (JSON Lines) read/write support for tasks.
//!
//! Each line is one task record. Lines produced by the engine's task
//! listener carry an `eventName` field; only `create` events become tasks,
//! every other event line is skipped.

use std::io::{self, BufRead, Write};

use serde_json::Value;

use crate::task::Task;

/// Event name of webhook records that create a task.
pub const CREATE_EVENT: &str = "create";

/// Error type for JSONL operations.
#[derive(Debug, thiserror::Error)]
pub enum JsonlError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error at line {line}: {source}")]
    Json {
        line: usize,
        source: serde_json::Error,
    },
}

/// Result alias for JSONL operations.
pub type Result<T> = std::result::Result<T, JsonlError>;

/// Writes tasks as JSONL to the given writer.
pub fn write_jsonl<W: Write>(writer: &mut W, tasks: &[Task]) -> Result<()> {
    for (i, task) in tasks.iter().enumerate() {
        serde_json::to_writer(&mut *writer, task).map_err(|e| JsonlError::Json {
            line: i + 1,
            source: e,
        })?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

/// Returns an iterator that reads tasks from a JSONL reader.
///
/// Empty lines and non-`create` event lines are skipped.
pub fn read_jsonl<R: BufRead>(reader: R) -> JsonlIter<R> {
    JsonlIter {
        reader,
        line_number: 0,
    }
}

/// Iterator over JSONL-encoded tasks.
pub struct JsonlIter<R> {
    reader: R,
    line_number: usize,
}

impl<R> JsonlIter<R> {
    fn parse_line(&self, trimmed: &str) -> Option<Result<Task>> {
        let json_err = |source| JsonlError::Json {
            line: self.line_number,
            source,
        };
        let value: Value = match serde_json::from_str(trimmed) {
            Ok(v) => v,
            Err(e) => return Some(Err(json_err(e))),
        };
        if let Some(event) = value.get("eventName").and_then(Value::as_str) {
            if event != CREATE_EVENT {
                return None;
            }
        }
        Some(
            serde_json::from_value::<Task>(value)
                .map(|mut task| {
                    task.set_defaults();
                    task
                })
                .map_err(json_err),
        )
    }
}

impl<R: BufRead> Iterator for JsonlIter<R> {
    type Item = Result<Task>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut line = String::new();
        loop {
            line.clear();
            match self.reader.read_line(&mut line) {
                Ok(0) => return None,
                Ok(_) => {
                    self.line_number += 1;
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    match self.parse_line(trimmed) {
                        Some(item) => return Some(item),
                        None => continue,
                    }
                }
                Err(e) => return Some(Err(JsonlError::Io(e))),
            }
        }
    }
}
