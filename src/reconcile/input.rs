//! Newline-delimited JSON input

use std::path::Path;

use mongodb::bson::{Bson, Document};
use serde_json::Value as JsonValue;
use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};

use crate::error::{RecordError, Result};

/// One parsed input line, or the reason it could not be parsed
pub type InputRecord = std::result::Result<Document, RecordError>;

/// Forward-only reader yielding one record per non-blank line.
///
/// Extended JSON (`{"$oid": ...}`, `{"$date": ...}`) is accepted. A line that
/// is not a JSON object yields a `MalformedInput` record error and reading
/// continues; I/O errors end the run.
pub struct JsonLinesReader<R> {
    lines: Lines<R>,
    line_number: usize,
}

impl JsonLinesReader<BufReader<File>> {
    /// Open a file for reading
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref()).await?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: AsyncBufRead + Unpin> JsonLinesReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_number: 0,
        }
    }

    /// Number of lines consumed so far, blank lines included
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    /// Next record, or `None` once the input is exhausted
    pub async fn next_record(&mut self) -> Result<Option<InputRecord>> {
        while let Some(line) = self.lines.next_line().await? {
            self.line_number += 1;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            return Ok(Some(parse_line(trimmed, self.line_number)));
        }
        Ok(None)
    }
}

fn parse_line(line: &str, line_number: usize) -> InputRecord {
    let malformed = |message: String| RecordError::MalformedInput {
        line: line_number,
        message,
    };

    let value: JsonValue = serde_json::from_str(line).map_err(|e| malformed(e.to_string()))?;
    if !value.is_object() {
        return Err(malformed("expected a JSON object".to_string()));
    }

    match Bson::try_from(value) {
        Ok(Bson::Document(doc)) => Ok(doc),
        Ok(other) => Err(malformed(format!(
            "expected a document, got {:?}",
            other.element_type()
        ))),
        Err(e) => Err(malformed(e.to_string())),
    }
}
