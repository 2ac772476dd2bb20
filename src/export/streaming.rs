//! Batched reads for export
//!
//! One store cursor is opened per export and drained `batch_size` documents
//! at a time, so batch boundaries never reorder, skip or repeat a document.
//! Documents come back in the store's natural order.

use std::sync::Arc;

use async_trait::async_trait;
use mongodb::bson::Document;
use tracing::{debug, info};

use crate::error::{DbUtilsError, ExportError, Result};
use crate::store::{DocumentCursor, DocumentStore, ReadRequest};

use super::filter::QueryFilter;

/// Source of document batches for an export
#[async_trait]
pub trait StreamingQuery: Send {
    /// Next batch, or `None` once exhausted
    async fn next_batch(&mut self) -> Result<Option<Vec<Document>>>;

    /// Stop reading and release resources
    async fn close(&mut self) -> Result<()>;
}

/// Cursor-backed reader over a [`DocumentStore`].
///
/// The cursor is opened on the first batch. Forward-only and not
/// restartable.
pub struct BatchReader {
    store: Arc<dyn DocumentStore>,
    filter: QueryFilter,
    columns: Option<Vec<String>>,
    batch_size: u32,
    limit: Option<u64>,
    cursor: Option<Box<dyn DocumentCursor>>,
    total_fetched: u64,
    closed: bool,
}

impl BatchReader {
    /// Create a reader
    ///
    /// # Arguments
    /// * `store` - Collection to read
    /// * `filter` - Regex constraints, ANDed
    /// * `columns` - Fields to keep; `None` keeps whole documents
    /// * `batch_size` - Maximum documents per batch, at least 1
    /// * `limit` - Maximum documents overall
    pub fn new(
        store: Arc<dyn DocumentStore>,
        filter: QueryFilter,
        columns: Option<Vec<String>>,
        batch_size: u32,
        limit: Option<u64>,
    ) -> Self {
        Self {
            store,
            filter,
            columns,
            batch_size: batch_size.max(1),
            limit,
            cursor: None,
            total_fetched: 0,
            closed: false,
        }
    }

    /// Documents returned so far
    pub fn total_fetched(&self) -> u64 {
        self.total_fetched
    }

    fn remaining(&self) -> u64 {
        let batch = u64::from(self.batch_size);
        match self.limit {
            Some(limit) => batch.min(limit.saturating_sub(self.total_fetched)),
            None => batch,
        }
    }

    async fn open(&mut self) -> Result<Box<dyn DocumentCursor>> {
        let request = ReadRequest {
            filter: &self.filter,
            fields: self.columns.as_deref(),
            limit: self.limit,
            batch_size: self.batch_size,
        };
        self.store.open_cursor(request).await
    }

    fn fail(&mut self, err: DbUtilsError) -> DbUtilsError {
        self.cursor = None;
        self.closed = true;
        ExportError::BatchFetchFailure(err.to_string()).into()
    }
}

#[async_trait]
impl StreamingQuery for BatchReader {
    async fn next_batch(&mut self) -> Result<Option<Vec<Document>>> {
        if self.closed {
            return Ok(None);
        }

        let wanted = self.remaining();
        if wanted == 0 {
            debug!("Limit reached after {} documents", self.total_fetched);
            self.cursor = None;
            self.closed = true;
            return Ok(None);
        }

        let mut cursor = match self.cursor.take() {
            Some(cursor) => cursor,
            None => match self.open().await {
                Ok(cursor) => cursor,
                Err(e) => return Err(self.fail(e)),
            },
        };

        let mut batch = Vec::with_capacity(wanted as usize);
        while (batch.len() as u64) < wanted {
            match cursor.next_document().await {
                Ok(Some(doc)) => batch.push(doc),
                Ok(None) => {
                    self.closed = true;
                    break;
                }
                Err(e) => return Err(self.fail(e)),
            }
        }

        if !self.closed {
            self.cursor = Some(cursor);
        }
        if batch.is_empty() {
            debug!("Query exhausted after {} documents", self.total_fetched);
            return Ok(None);
        }

        self.total_fetched += batch.len() as u64;
        debug!(
            "Fetched batch of {} documents (total: {})",
            batch.len(),
            self.total_fetched
        );
        Ok(Some(batch))
    }

    async fn close(&mut self) -> Result<()> {
        if !self.closed {
            self.cursor = None;
            self.closed = true;
            info!(
                "Closed query after fetching {} documents",
                self.total_fetched
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use mongodb::bson::doc;

    fn numbered(n: i32) -> Vec<Document> {
        (0..n).map(|i| doc! { "_id": i, "n": i, "tag": "x" }).collect()
    }

    async fn drain(reader: &mut BatchReader) -> Vec<Vec<Document>> {
        let mut batches = Vec::new();
        while let Some(batch) = reader.next_batch().await.unwrap() {
            batches.push(batch);
        }
        batches
    }

    #[tokio::test]
    async fn test_batches_preserve_order_across_boundaries() {
        let store = Arc::new(MemoryStore::with_documents(numbered(7)));
        let mut reader = BatchReader::new(store, QueryFilter::match_all(), None, 3, None);

        let batches = drain(&mut reader).await;

        let sizes: Vec<usize> = batches.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![3, 3, 1]);
        let ids: Vec<i32> = batches
            .iter()
            .flatten()
            .map(|d| d.get_i32("_id").unwrap())
            .collect();
        assert_eq!(ids, (0..7).collect::<Vec<_>>());
        assert_eq!(reader.total_fetched(), 7);
    }

    #[tokio::test]
    async fn test_limit_caps_last_page() {
        let store = Arc::new(MemoryStore::with_documents(numbered(10)));
        let mut reader = BatchReader::new(store.clone(), QueryFilter::match_all(), None, 4, Some(6));

        let batches = drain(&mut reader).await;

        let sizes: Vec<usize> = batches.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![4, 2]);
        assert_eq!(store.cursor_count(), 1);
    }

    #[tokio::test]
    async fn test_projection_leaves_out_unrequested_id() {
        let store = Arc::new(MemoryStore::with_documents(numbered(3)));
        let mut reader = BatchReader::new(
            store,
            QueryFilter::match_all(),
            Some(vec!["n".to_string()]),
            2,
            None,
        );

        let docs: Vec<Document> = drain(&mut reader).await.into_iter().flatten().collect();
        assert_eq!(docs, vec![doc! { "n": 0 }, doc! { "n": 1 }, doc! { "n": 2 }]);
    }

    #[tokio::test]
    async fn test_projection_keeps_requested_id() {
        let store = Arc::new(MemoryStore::with_documents(numbered(1)));
        let mut reader = BatchReader::new(
            store,
            QueryFilter::match_all(),
            Some(vec!["_id".to_string()]),
            5,
            None,
        );

        let docs: Vec<Document> = drain(&mut reader).await.into_iter().flatten().collect();
        assert_eq!(docs, vec![doc! { "_id": 0 }]);
    }

    #[tokio::test]
    async fn test_filter_applies_to_every_page() {
        let docs = (0..6).map(|i| {
            let name = if i % 2 == 0 { "even" } else { "odd" };
            doc! { "_id": i, "name": name }
        });
        let store = Arc::new(MemoryStore::with_documents(docs));
        let filter =
            QueryFilter::build(&[("name".to_string(), "^even$".to_string())]).unwrap();
        let mut reader = BatchReader::new(store, filter, None, 2, None);

        let ids: Vec<i32> = drain(&mut reader)
            .await
            .into_iter()
            .flatten()
            .map(|d| d.get_i32("_id").unwrap())
            .collect();
        assert_eq!(ids, vec![0, 2, 4]);
    }

    #[tokio::test]
    async fn test_fetch_failure_aborts() {
        let store = Arc::new(MemoryStore::with_documents(numbered(10)).with_read_failure_after(3));
        let mut reader = BatchReader::new(store, QueryFilter::match_all(), None, 3, None);

        assert_eq!(reader.next_batch().await.unwrap().map(|b| b.len()), Some(3));
        let err = reader.next_batch().await.unwrap_err();
        assert!(matches!(
            err,
            DbUtilsError::Export(ExportError::BatchFetchFailure(_))
        ));
        assert!(reader.next_batch().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_mixed_id_types_keep_natural_order() {
        let store = Arc::new(MemoryStore::with_documents(vec![
            doc! { "_id": 1, "name": "one" },
            doc! { "_id": 2, "name": "two" },
            doc! { "name": "three" },
            doc! { "_id": "z", "name": "four" },
            doc! { "_id": "a", "name": "five" },
        ]));
        let mut reader = BatchReader::new(
            store.clone(),
            QueryFilter::match_all(),
            Some(vec!["name".to_string()]),
            2,
            None,
        );

        let batches = drain(&mut reader).await;

        let sizes: Vec<usize> = batches.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![2, 2, 1]);
        let names: Vec<&str> = batches
            .iter()
            .flatten()
            .map(|d| d.get_str("name").unwrap())
            .collect();
        assert_eq!(names, vec!["one", "two", "three", "four", "five"]);
        assert_eq!(store.cursor_count(), 1);
    }

    #[tokio::test]
    async fn test_empty_collection() {
        let store = Arc::new(MemoryStore::new());
        let mut reader = BatchReader::new(store, QueryFilter::match_all(), None, 3, None);
        assert!(reader.next_batch().await.unwrap().is_none());
        reader.close().await.unwrap();
    }
}
