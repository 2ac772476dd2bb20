//! Record serialization for export
//!
//! Renders one document as one output line:
//! - JSON: a compact object per line, store-native types tagged
//! - CSV: one row per document in a fixed column order
//!
//! The CSV column order is the requested projection. Without one, the order
//! is taken from the first document rendered and kept for the whole run, so
//! every row lines up with the header.

pub mod bson_utils;

use std::fmt;

use mongodb::bson::Document;
use serde::{Deserialize, Serialize};

use bson_utils::{BsonConverter, CanonicalJsonConverter, PlainTextConverter, lookup_path};

/// Serialization format for exported records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// One JSON object per line
    Json,
    /// Comma-separated values
    Csv,
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportFormat::Json => write!(f, "json"),
            ExportFormat::Csv => write!(f, "csv"),
        }
    }
}

/// Serializer turning documents into output lines
pub struct RecordSerializer {
    format: ExportFormat,
    /// Column order; empty until fixed when no projection was requested
    columns: Vec<String>,
    json: CanonicalJsonConverter,
    text: PlainTextConverter,
}

impl RecordSerializer {
    /// Create a serializer
    ///
    /// # Arguments
    /// * `format` - Output format
    /// * `columns` - Column projection; empty means "all fields"
    pub fn new(format: ExportFormat, columns: Vec<String>) -> Self {
        Self {
            format,
            columns,
            json: CanonicalJsonConverter::new(),
            text: PlainTextConverter::new(),
        }
    }

    /// Output format
    pub fn format(&self) -> ExportFormat {
        self.format
    }

    /// Render one document as a line without trailing newline
    pub fn render(&mut self, doc: &Document) -> String {
        match self.format {
            ExportFormat::Json => self.json.convert_document(doc).to_string(),
            ExportFormat::Csv => {
                if self.columns.is_empty() {
                    self.columns = doc.keys().cloned().collect();
                }
                self.render_csv_row(doc)
            }
        }
    }

    /// Render a batch of documents, preserving order
    pub fn render_batch(&mut self, docs: &[Document]) -> Vec<String> {
        docs.iter().map(|doc| self.render(doc)).collect()
    }

    /// CSV header line, once the column order is known. JSON has none.
    pub fn header(&self) -> Option<String> {
        match self.format {
            ExportFormat::Json => None,
            ExportFormat::Csv if self.columns.is_empty() => None,
            ExportFormat::Csv => Some(
                self.columns
                    .iter()
                    .map(|c| escape_csv_value(c))
                    .collect::<Vec<_>>()
                    .join(","),
            ),
        }
    }

    fn render_csv_row(&self, doc: &Document) -> String {
        self.columns
            .iter()
            .map(|column| {
                let value = self.text.convert_optional(lookup_path(doc, column));
                escape_csv_value(&value)
            })
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Quote a CSV value if it contains a comma, quote, or line break
pub fn escape_csv_value(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') || value.contains('\r')
    {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
