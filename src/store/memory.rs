//! In-memory document store
//!
//! Keeps documents in insertion order, which is also the natural order its
//! cursors return. Counts lookups and writes so callers can assert that a
//! code path never touched the store, and can be told to fail writes or
//! cursor reads to exercise error handling.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::vec;

use async_trait::async_trait;
use mongodb::bson::{Bson, Document, oid::ObjectId};
use tokio::sync::RwLock;

use crate::error::Result;

use super::{DocumentCursor, DocumentStore, ReadRequest};

/// Document store backed by a vector.
#[derive(Default)]
pub struct MemoryStore {
    documents: RwLock<Vec<Document>>,
    lookups: AtomicUsize,
    writes: AtomicUsize,
    cursors_opened: AtomicUsize,
    fail_writes: AtomicBool,
    fail_reads_after: Option<usize>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with documents.
    ///
    /// Documents without `_id` get a fresh ObjectId.
    pub fn with_documents(docs: impl IntoIterator<Item = Document>) -> Self {
        let documents = docs
            .into_iter()
            .map(|mut doc| {
                if !doc.contains_key("_id") {
                    doc.insert("_id", ObjectId::new());
                }
                doc
            })
            .collect();

        Self {
            documents: RwLock::new(documents),
            ..Self::default()
        }
    }

    /// Make every subsequent insert/replace fail
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make cursors fail once they have returned `documents` documents
    pub fn with_read_failure_after(mut self, documents: usize) -> Self {
        self.fail_reads_after = Some(documents);
        self
    }

    /// Snapshot of all documents in natural order
    pub async fn documents(&self) -> Vec<Document> {
        self.documents.read().await.clone()
    }

    /// Number of key lookups performed
    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    /// Number of inserts and replaces performed
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Number of cursors opened
    pub fn cursor_count(&self) -> usize {
        self.cursors_opened.load(Ordering::SeqCst)
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err("simulated write failure".into());
        }
        Ok(())
    }

    fn project(doc: &Document, fields: Option<&[String]>) -> Document {
        match fields {
            None => doc.clone(),
            Some(fields) => doc
                .iter()
                .filter(|(key, _)| fields.iter().any(|f| f == *key))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find_by_field(&self, field: &str, value: &Bson) -> Result<Vec<Document>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);

        let documents = self.documents.read().await;
        Ok(documents
            .iter()
            .filter(|doc| doc.get(field) == Some(value))
            .cloned()
            .collect())
    }

    async fn insert(&self, mut doc: Document) -> Result<Bson> {
        self.check_writable()?;

        let id = match doc.get("_id") {
            Some(id) => id.clone(),
            None => {
                let id = Bson::ObjectId(ObjectId::new());
                doc.insert("_id", id.clone());
                id
            }
        };

        let mut documents = self.documents.write().await;
        if documents.iter().any(|d| d.get("_id") == Some(&id)) {
            return Err(format!("duplicate _id {id}").into());
        }
        documents.push(doc);
        self.writes.fetch_add(1, Ordering::SeqCst);

        Ok(id)
    }

    async fn replace_by_id(&self, id: &Bson, mut doc: Document) -> Result<()> {
        self.check_writable()?;

        let mut documents = self.documents.write().await;
        let slot = documents
            .iter_mut()
            .find(|d| d.get("_id") == Some(id))
            .ok_or_else(|| format!("no document with _id {id} to replace"))?;

        doc.insert("_id", id.clone());
        *slot = doc;
        self.writes.fetch_add(1, Ordering::SeqCst);

        Ok(())
    }

    async fn open_cursor(&self, request: ReadRequest<'_>) -> Result<Box<dyn DocumentCursor>> {
        self.cursors_opened.fetch_add(1, Ordering::SeqCst);

        let limit = request
            .limit
            .map(|limit| usize::try_from(limit).unwrap_or(usize::MAX))
            .unwrap_or(usize::MAX);
        let matching: Vec<Document> = self
            .documents
            .read()
            .await
            .iter()
            .filter(|doc| request.filter.matches(doc))
            .take(limit)
            .map(|doc| Self::project(doc, request.fields))
            .collect();

        Ok(Box::new(MemoryCursor {
            documents: matching.into_iter(),
            served: 0,
            fail_after: self.fail_reads_after,
        }))
    }
}

/// Cursor over a snapshot taken when it was opened
struct MemoryCursor {
    documents: vec::IntoIter<Document>,
    served: usize,
    fail_after: Option<usize>,
}

#[async_trait]
impl DocumentCursor for MemoryCursor {
    async fn next_document(&mut self) -> Result<Option<Document>> {
        if self.fail_after.is_some_and(|limit| self.served >= limit) {
            return Err("simulated read failure".into());
        }
        let next = self.documents.next();
        if next.is_some() {
            self.served += 1;
        }
        Ok(next)
    }
}
