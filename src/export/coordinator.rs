//! Export coordinator
//!
//! Pulls batches from a [`StreamingQuery`], renders them with a
//! [`RecordSerializer`] and hands the lines to an [`OutputSink`], in order,
//! one batch at a time.

use std::path::PathBuf;
use std::time::Instant;

use tracing::{debug, info};

use crate::error::Result;
use crate::formatter::RecordSerializer;

use super::progress::ProgressTracker;
use super::sinks::OutputSink;
use super::streaming::StreamingQuery;

/// Result of an export run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportResult {
    /// Number of documents exported
    pub documents_exported: u64,
    /// Files written, in creation order (empty for stdout)
    pub files: Vec<PathBuf>,
    /// Wall time of the run
    pub elapsed_ms: u64,
}

/// Drives one export from query to sink
pub struct ExportCoordinator {
    query: Box<dyn StreamingQuery>,
    serializer: RecordSerializer,
    sink: Box<dyn OutputSink>,
    tracker: ProgressTracker,
    include_header: bool,
}

impl ExportCoordinator {
    pub fn new(
        query: Box<dyn StreamingQuery>,
        serializer: RecordSerializer,
        sink: Box<dyn OutputSink>,
        tracker: ProgressTracker,
    ) -> Self {
        Self {
            query,
            serializer,
            sink,
            tracker,
            include_header: false,
        }
    }

    /// Emit the CSV header at the top of every output file
    pub fn with_header(mut self, include_header: bool) -> Self {
        self.include_header = include_header;
        self
    }

    /// Run the export to completion.
    ///
    /// The first fetch or write error stops the run. Whatever was already
    /// written is flushed before the error is returned.
    pub async fn execute(&mut self) -> Result<ExportResult> {
        let start_time = Instant::now();
        info!("Starting export ({} format)", self.serializer.format());

        let outcome = self.pump().await;

        // Flush partial output even when the run failed
        let finalized = self.sink.finalize().await;
        let closed = self.query.close().await;
        self.tracker.finish();

        let exported = outcome?;
        finalized?;
        closed?;

        let elapsed_ms = start_time.elapsed().as_millis() as u64;
        let files = self.sink.files().to_vec();
        info!(
            "Export completed: {} documents, {} files, {} ms",
            exported,
            files.len(),
            elapsed_ms
        );

        Ok(ExportResult {
            documents_exported: exported,
            files,
            elapsed_ms,
        })
    }

    async fn pump(&mut self) -> Result<u64> {
        let mut exported = 0u64;
        let mut batch_count = 0u32;

        while let Some(docs) = self.query.next_batch().await? {
            batch_count += 1;
            debug!("Received batch #{} ({} documents)", batch_count, docs.len());

            let lines = self.serializer.render_batch(&docs);
            if self.include_header {
                self.sink.set_header(self.serializer.header());
            }
            self.sink.write_lines(&lines).await?;

            exported += docs.len() as u64;
            self.tracker.advance(docs.len() as u64);

            if batch_count % 10 == 0 {
                info!(
                    "Progress: {} documents exported ({} batches)",
                    exported, batch_count
                );
            }
        }

        if self.include_header {
            self.sink.set_header(self.serializer.header());
        }
        Ok(exported)
    }
}
