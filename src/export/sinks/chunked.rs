//! Chunked-files sink
//!
//! Files are named `<prefix>-<index>.<extension>` with a zero-based,
//! gap-free index. Each file holds exactly `chunk_size` lines except the
//! last, which holds the remainder. A file is only created once a line is
//! ready for it, so an empty export creates nothing.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::File;
use tokio::io::BufWriter;
use tracing::debug;

use crate::error::Result;

use super::{LineWriter, OutputSink, create_file};

/// Splits output across fixed-size files
pub struct ChunkedFileSink {
    dir: PathBuf,
    prefix: String,
    extension: String,
    chunk_size: usize,
    current: Option<LineWriter<BufWriter<File>>>,
    header: Option<String>,
    files: Vec<PathBuf>,
}

impl ChunkedFileSink {
    /// # Arguments
    /// * `dir` - Directory receiving the chunk files (created on demand)
    /// * `prefix` - File name prefix
    /// * `extension` - File extension, with or without the leading dot
    /// * `chunk_size` - Lines per file, at least 1
    pub fn new(
        dir: impl AsRef<Path>,
        prefix: impl Into<String>,
        extension: &str,
        chunk_size: usize,
    ) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            prefix: prefix.into(),
            extension: extension.trim_start_matches('.').to_string(),
            chunk_size: chunk_size.max(1),
            current: None,
            header: None,
            files: Vec::new(),
        }
    }

    /// Path of the chunk with the given index
    pub fn chunk_path(&self, index: usize) -> PathBuf {
        let name = if self.extension.is_empty() {
            format!("{}-{}", self.prefix, index)
        } else {
            format!("{}-{}.{}", self.prefix, index, self.extension)
        };
        self.dir.join(name)
    }

    async fn close_current(&mut self) -> Result<()> {
        if let Some(mut chunk) = self.current.take() {
            chunk.flush().await?;
            debug!(
                "Closed chunk #{} ({} lines)",
                self.files.len() - 1,
                chunk.lines_written()
            );
        }
        Ok(())
    }

    /// Writer with room for one more line, rolling to a new file if needed
    async fn writer(&mut self) -> Result<&mut LineWriter<BufWriter<File>>> {
        let full = self
            .current
            .as_ref()
            .is_some_and(|chunk| chunk.lines_written() >= self.chunk_size);
        if full {
            self.close_current().await?;
        }

        if self.current.is_none() {
            let path = self.chunk_path(self.files.len());
            let mut chunk = create_file(&path).await?;
            chunk.start(self.header.as_deref()).await?;
            debug!("Opened chunk file: {}", path.display());
            self.files.push(path);
            self.current = Some(chunk);
        }

        match self.current.as_mut() {
            Some(chunk) => Ok(chunk),
            None => Err("chunk writer unavailable".into()),
        }
    }
}

#[async_trait]
impl OutputSink for ChunkedFileSink {
    fn set_header(&mut self, header: Option<String>) {
        self.header = header;
    }

    async fn write_lines(&mut self, lines: &[String]) -> Result<usize> {
        for line in lines {
            self.writer().await?.write_line(line).await?;
        }
        Ok(lines.len())
    }

    async fn finalize(&mut self) -> Result<()> {
        self.close_current().await
    }

    fn files(&self) -> &[PathBuf] {
        &self.files
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered(range: std::ops::Range<usize>) -> Vec<String> {
        range.map(|i| format!("line-{i}")).collect()
    }

    async fn read_lines(path: &Path) -> Vec<String> {
        tokio::fs::read_to_string(path)
            .await
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[tokio::test]
    async fn test_file_count_is_ceiling_of_records_over_chunk() {
        for (records, chunk, expected_files) in [(0, 3, 0), (1, 3, 1), (3, 3, 1), (7, 3, 3), (9, 3, 3)] {
            let dir = tempfile::tempdir().unwrap();
            let mut sink = ChunkedFileSink::new(dir.path(), "part", "txt", chunk);

            // Uneven write sizes must not affect chunk boundaries
            let all = numbered(0..records);
            for piece in all.chunks(2) {
                sink.write_lines(piece).await.unwrap();
            }
            sink.finalize().await.unwrap();

            assert_eq!(sink.files().len(), expected_files, "{records} records / {chunk}");

            let mut concatenated = Vec::new();
            for (index, path) in sink.files().iter().enumerate() {
                assert_eq!(path, &dir.path().join(format!("part-{index}.txt")));
                let lines = read_lines(path).await;
                if index + 1 < expected_files {
                    assert_eq!(lines.len(), chunk);
                } else {
                    assert!(!lines.is_empty() && lines.len() <= chunk);
                }
                concatenated.extend(lines);
            }
            assert_eq!(concatenated, all);
        }
    }

    #[tokio::test]
    async fn test_empty_export_creates_no_files() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("chunks");
        let mut sink = ChunkedFileSink::new(&target, "part", "txt", 5);
        sink.finalize().await.unwrap();

        assert!(sink.files().is_empty());
        assert!(!target.exists());
    }

    #[tokio::test]
    async fn test_header_in_every_chunk() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = ChunkedFileSink::new(dir.path(), "rows", ".csv", 2);
        sink.set_header(Some("name".to_string()));
        sink.write_lines(&numbered(0..3)).await.unwrap();
        sink.finalize().await.unwrap();

        assert_eq!(
            read_lines(&dir.path().join("rows-0.csv")).await,
            vec!["name", "line-0", "line-1"]
        );
        assert_eq!(
            read_lines(&dir.path().join("rows-1.csv")).await,
            vec!["name", "line-2"]
        );
    }
}
