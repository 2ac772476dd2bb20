//! Output sinks for exported lines
//!
//! A sink receives already-serialized lines in order and decides where they
//! land:
//!
//! - [`ConsoleSink`]: straight to stdout, flushed after every batch
//! - [`FileSink`]: one file
//! - [`ChunkedFileSink`]: a new file every `chunk_size` lines

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::File;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};

use crate::error::{DbUtilsError, ExportError, Result};

pub mod chunked;
pub mod console;
pub mod file;

pub use chunked::ChunkedFileSink;
pub use console::ConsoleSink;
pub use file::FileSink;

/// Destination for serialized lines
#[async_trait]
pub trait OutputSink: Send {
    /// Line written at the top of each output, before any record.
    ///
    /// May be called repeatedly; the latest value is used for outputs not
    /// yet started.
    fn set_header(&mut self, header: Option<String>);

    /// Write lines in order, returning how many were written
    async fn write_lines(&mut self, lines: &[String]) -> Result<usize>;

    /// Flush and close everything still open
    async fn finalize(&mut self) -> Result<()>;

    /// Files produced so far, in creation order
    fn files(&self) -> &[PathBuf];
}

/// Newline-terminated line writer with an optional one-time header
pub(crate) struct LineWriter<W> {
    inner: W,
    label: String,
    header_written: bool,
    lines_written: usize,
}

impl<W: AsyncWrite + Unpin + Send> LineWriter<W> {
    pub(crate) fn new(inner: W, label: impl Into<String>) -> Self {
        Self {
            inner,
            label: label.into(),
            header_written: false,
            lines_written: 0,
        }
    }

    pub(crate) fn lines_written(&self) -> usize {
        self.lines_written
    }

    /// Write the header unless something was already written
    pub(crate) async fn start(&mut self, header: Option<&str>) -> Result<()> {
        if self.header_written {
            return Ok(());
        }
        self.header_written = true;
        match header {
            Some(header) => self.write_raw(header).await,
            None => Ok(()),
        }
    }

    pub(crate) async fn write_line(&mut self, line: &str) -> Result<()> {
        self.write_raw(line).await?;
        self.lines_written += 1;
        Ok(())
    }

    pub(crate) async fn flush(&mut self) -> Result<()> {
        let flushed = self.inner.flush().await;
        flushed.map_err(|e| self.write_error(e))
    }

    pub(crate) fn into_inner(self) -> W {
        self.inner
    }

    async fn write_raw(&mut self, line: &str) -> Result<()> {
        let written = match self.inner.write_all(line.as_bytes()).await {
            Ok(()) => self.inner.write_all(b"\n").await,
            Err(e) => Err(e),
        };
        written.map_err(|e| self.write_error(e))
    }

    fn write_error(&self, err: io::Error) -> DbUtilsError {
        ExportError::WriteFailed(format!("{}: {}", self.label, err)).into()
    }
}

/// Create (truncating) a buffered file, making parent directories as needed
pub(crate) async fn create_file(path: &Path) -> Result<LineWriter<BufWriter<File>>> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                ExportError::WriteFailed(format!("{}: {}", parent.display(), e))
            })?;
        }
    }

    let file = File::create(path)
        .await
        .map_err(|e| ExportError::WriteFailed(format!("{}: {}", path.display(), e)))?;
    Ok(LineWriter::new(
        BufWriter::with_capacity(1024 * 1024, file),
        path.display().to_string(),
    ))
}
