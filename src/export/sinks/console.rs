//! Direct-stream sink

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::io::{AsyncWrite, Stdout};

use crate::error::Result;

use super::{LineWriter, OutputSink};

/// Writes each batch to a stream as it arrives and flushes it
pub struct ConsoleSink<W> {
    out: LineWriter<W>,
    header: Option<String>,
}

impl ConsoleSink<Stdout> {
    /// Sink writing to the process's stdout
    pub fn stdout() -> Self {
        Self::new(tokio::io::stdout())
    }
}

impl<W: AsyncWrite + Unpin + Send> ConsoleSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            out: LineWriter::new(writer, "stdout"),
            header: None,
        }
    }

    /// Recover the underlying stream
    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> OutputSink for ConsoleSink<W> {
    fn set_header(&mut self, header: Option<String>) {
        self.header = header;
    }

    async fn write_lines(&mut self, lines: &[String]) -> Result<usize> {
        if lines.is_empty() {
            return Ok(0);
        }
        self.out.start(self.header.as_deref()).await?;
        for line in lines {
            self.out.write_line(line).await?;
        }
        self.out.flush().await?;
        Ok(lines.len())
    }

    async fn finalize(&mut self) -> Result<()> {
        self.out.start(self.header.as_deref()).await?;
        self.out.flush().await
    }

    fn files(&self) -> &[PathBuf] {
        &[]
    }
}
