//! Single-file sink

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::File;
use tokio::io::BufWriter;
use tracing::debug;

use crate::error::Result;

use super::{LineWriter, OutputSink, create_file};

/// Writes every line to one file, opened once up front
pub struct FileSink {
    out: LineWriter<BufWriter<File>>,
    header: Option<String>,
    files: Vec<PathBuf>,
}

impl FileSink {
    /// Create the file (and its parent directories), truncating any
    /// existing content
    pub async fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let out = create_file(path).await?;
        debug!("Created output file: {}", path.display());

        Ok(Self {
            out,
            header: None,
            files: vec![path.to_path_buf()],
        })
    }
}

#[async_trait]
impl OutputSink for FileSink {
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
        Ok(lines.len())
    }

    async fn finalize(&mut self) -> Result<()> {
        self.out.start(self.header.as_deref()).await?;
        self.out.flush().await?;
        debug!("Finalized output file ({} lines)", self.out.lines_written());
        Ok(())
    }

    fn files(&self) -> &[PathBuf] {
        &self.files
    }
}
