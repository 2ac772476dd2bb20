//! Query and export pipeline
//!
//! The pipeline is built from four pieces:
//!
//! 1. **QueryFilter**: regex constraints compiled from `field=pattern` pairs
//! 2. **BatchReader**: one store cursor drained batch by batch, in natural order
//! 3. **RecordSerializer**: one JSON or CSV line per document
//! 4. **OutputSink**: stdout, a single file, or fixed-size chunk files
//!
//! [`ExportCoordinator`] drives them batch by batch. [`run_query`] wires
//! them together from an [`ExportOptions`].

pub mod coordinator;
pub mod filter;
pub mod progress;
pub mod sinks;
pub mod streaming;

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info};

use crate::error::Result;
use crate::formatter::{ExportFormat, RecordSerializer};
use crate::store::DocumentStore;

pub use coordinator::{ExportCoordinator, ExportResult};
pub use filter::QueryFilter;
pub use progress::ProgressTracker;
pub use sinks::{ChunkedFileSink, ConsoleSink, FileSink, OutputSink};
pub use streaming::{BatchReader, StreamingQuery};

/// Where exported lines go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    /// Standard output, flushed per batch
    Stdout,
    /// One file
    File { path: PathBuf },
    /// `<dir>/<prefix>-<index>.<extension>`, one file per batch
    Chunks {
        dir: PathBuf,
        prefix: String,
        extension: String,
    },
}

/// Fully resolved settings for one query run
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Fields to export; empty exports whole documents
    pub columns: Vec<String>,
    /// `(field, pattern)` pairs, ANDed
    pub filters: Vec<(String, String)>,
    pub batch_size: u32,
    pub limit: Option<u64>,
    pub format: ExportFormat,
    pub include_header: bool,
    pub target: OutputTarget,
    /// Draw a progress spinner on stderr
    pub progress: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            columns: Vec::new(),
            filters: Vec::new(),
            batch_size: 500,
            limit: None,
            format: ExportFormat::Json,
            include_header: false,
            target: OutputTarget::Stdout,
            progress: false,
        }
    }
}

/// Run one export.
///
/// Filter patterns are compiled before anything is opened, so an invalid
/// pattern never leaves an empty output file behind.
pub async fn run_query(
    store: Arc<dyn DocumentStore>,
    options: &ExportOptions,
) -> Result<ExportResult> {
    let filter = QueryFilter::build(&options.filters)?;
    if filter.is_match_all() {
        debug!("No filters given, exporting every document");
    }
    info!(
        filter = %filter.to_document(),
        batch_size = options.batch_size,
        limit = ?options.limit,
        "Starting query"
    );

    let columns = (!options.columns.is_empty()).then(|| options.columns.clone());
    let query = BatchReader::new(store, filter, columns, options.batch_size, options.limit);
    let serializer = RecordSerializer::new(options.format, options.columns.clone());
    let sink = open_sink(&options.target, options.batch_size).await?;
    let tracker = ProgressTracker::new("documents", options.progress);

    ExportCoordinator::new(Box::new(query), serializer, sink, tracker)
        .with_header(options.include_header)
        .execute()
        .await
}

async fn open_sink(target: &OutputTarget, batch_size: u32) -> Result<Box<dyn OutputSink>> {
    Ok(match target {
        OutputTarget::Stdout => Box::new(ConsoleSink::stdout()),
        OutputTarget::File { path } => Box::new(FileSink::create(path).await?),
        OutputTarget::Chunks {
            dir,
            prefix,
            extension,
        } => Box::new(ChunkedFileSink::new(
            dir,
            prefix.clone(),
            extension,
            batch_size as usize,
        )),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DbUtilsError, ExportError};
    use crate::reconcile::{JsonLinesReader, ReconcileOptions, Reconciler};
    use crate::store::MemoryStore;
    use mongodb::bson::doc;

    fn names(docs: &[(&str, &str)]) -> Vec<mongodb::bson::Document> {
        docs.iter()
            .map(|(name, value)| doc! { "name": *name, "value": *value })
            .collect()
    }

    async fn read(path: &std::path::Path) -> String {
        tokio::fs::read_to_string(path).await.unwrap()
    }

    #[tokio::test]
    async fn test_insert_then_query_to_file() {
        let store = Arc::new(MemoryStore::new());
        let input = "{\"name\":\"a\",\"value\":\"A\"}\n{\"name\":\"b\",\"value\":\"B\"}\n";
        let mut reader = JsonLinesReader::new(input.as_bytes());
        Reconciler::new(store.clone(), ReconcileOptions::default())
            .unwrap()
            .run(&mut reader, &ProgressTracker::hidden())
            .await
            .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let options = ExportOptions {
            columns: vec!["name".to_string(), "value".to_string()],
            format: ExportFormat::Csv,
            include_header: true,
            target: OutputTarget::File { path: path.clone() },
            ..ExportOptions::default()
        };

        let result = run_query(store, &options).await.unwrap();

        assert_eq!(result.documents_exported, 2);
        assert_eq!(result.files, vec![path.clone()]);
        assert_eq!(read(&path).await, "name,value\na,A\nb,B\n");
    }

    #[tokio::test]
    async fn test_json_export_reimports_unchanged() {
        use crate::reconcile::{ReconcileSummary, TimestampPolicy};
        use mongodb::bson::{Binary, Bson, Decimal128, spec::BinarySubtype};

        let blob = Binary {
            subtype: BinarySubtype::Generic,
            bytes: vec![7, 8, 9],
        };
        let store = Arc::new(MemoryStore::with_documents([doc! {
            "name": "a",
            "big": Bson::Int64(5),
            "price": Bson::Decimal128("12.50".parse::<Decimal128>().unwrap()),
            "blob": blob,
        }]));
        let before = store.documents().await;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.txt");
        let options = ExportOptions {
            target: OutputTarget::File { path: path.clone() },
            ..ExportOptions::default()
        };
        run_query(store.clone(), &options).await.unwrap();

        let exported = read(&path).await;
        let mut reader = JsonLinesReader::new(exported.as_bytes());
        let reconcile = ReconcileOptions {
            key_field: Some("name".to_string()),
            create_or_update: true,
            timestamps: TimestampPolicy::disabled(),
            ..ReconcileOptions::default()
        };
        let summary = Reconciler::new(store.clone(), reconcile)
            .unwrap()
            .run(&mut reader, &ProgressTracker::hidden())
            .await
            .unwrap();

        assert_eq!(
            summary,
            ReconcileSummary {
                skipped: 1,
                ..ReconcileSummary::default()
            }
        );
        assert_eq!(store.write_count(), 0);
        assert_eq!(store.documents().await, before);
    }

    #[tokio::test]
    async fn test_regex_filter_selects_anchored_names() {
        let store = Arc::new(MemoryStore::with_documents(names(&[
            ("a", "A"),
            ("b", "B2"),
            ("c", "C"),
            ("ac", "X"),
        ])));
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("filtered.txt");
        let options = ExportOptions {
            columns: vec!["name".to_string(), "value".to_string()],
            filters: vec![("name".to_string(), "^(a|c)$".to_string())],
            target: OutputTarget::File { path: path.clone() },
            ..ExportOptions::default()
        };

        run_query(store, &options).await.unwrap();

        assert_eq!(
            read(&path).await,
            "{\"name\":\"a\",\"value\":\"A\"}\n{\"name\":\"c\",\"value\":\"C\"}\n"
        );
    }

    #[tokio::test]
    async fn test_chunked_export_splits_by_batch_size() {
        let docs: Vec<_> = (0..5).map(|i| doc! { "_id": i, "n": i }).collect();
        let store = Arc::new(MemoryStore::with_documents(docs));
        let dir = tempfile::tempdir().unwrap();
        let options = ExportOptions {
            batch_size: 2,
            target: OutputTarget::Chunks {
                dir: dir.path().to_path_buf(),
                prefix: "part".to_string(),
                extension: "txt".to_string(),
            },
            ..ExportOptions::default()
        };

        let result = run_query(store, &options).await.unwrap();

        assert_eq!(result.files.len(), 3);
        assert_eq!(
            read(&dir.path().join("part-0.txt")).await,
            "{\"_id\":0,\"n\":0}\n{\"_id\":1,\"n\":1}\n"
        );
        assert_eq!(read(&dir.path().join("part-2.txt")).await, "{\"_id\":4,\"n\":4}\n");
    }

    #[tokio::test]
    async fn test_limit_bounds_export() {
        let docs: Vec<_> = (0..10).map(|i| doc! { "_id": i }).collect();
        let store = Arc::new(MemoryStore::with_documents(docs));
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("limited.txt");
        let options = ExportOptions {
            batch_size: 4,
            limit: Some(5),
            target: OutputTarget::File { path: path.clone() },
            ..ExportOptions::default()
        };

        let result = run_query(store, &options).await.unwrap();

        assert_eq!(result.documents_exported, 5);
        assert_eq!(read(&path).await.lines().count(), 5);
    }

    #[tokio::test]
    async fn test_invalid_pattern_fails_before_output_is_created() {
        let store = Arc::new(MemoryStore::new());
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("never.txt");
        let options = ExportOptions {
            filters: vec![("name".to_string(), "(unclosed".to_string())],
            target: OutputTarget::File { path: path.clone() },
            ..ExportOptions::default()
        };

        let err = run_query(store, &options).await.unwrap_err();

        let DbUtilsError::Export(ExportError::InvalidFilterPattern { field, .. }) = err else {
            panic!("expected invalid pattern error, got {err:?}");
        };
        assert_eq!(field, "name");
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_fetch_failure_aborts_run() {
        let docs: Vec<_> = (0..10).map(|i| doc! { "_id": i }).collect();
        let store = Arc::new(MemoryStore::with_documents(docs).with_read_failure_after(3));
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.txt");
        let options = ExportOptions {
            batch_size: 3,
            target: OutputTarget::File { path: path.clone() },
            ..ExportOptions::default()
        };

        let err = run_query(store, &options).await.unwrap_err();

        assert!(matches!(
            err,
            DbUtilsError::Export(ExportError::BatchFetchFailure(_))
        ));
        assert_eq!(read(&path).await.lines().count(), 3);
    }
}
