//! Document store abstraction
//!
//! The reconciliation and export engines only talk to the collection through
//! [`DocumentStore`]. Two implementations are provided:
//!
//! - [`MongoStore`]: a MongoDB collection handle
//! - [`MemoryStore`]: an in-process vector of documents, used by tests and
//!   for dry runs
//!
//! Connection lifecycle, authentication and retries belong to the
//! implementation, never to the engines.

use async_trait::async_trait;
use mongodb::bson::{Bson, Document};

use crate::error::Result;
use crate::export::filter::QueryFilter;

pub mod memory;
pub mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

/// A filtered, projected read in the store's natural order.
#[derive(Debug, Clone, Copy)]
pub struct ReadRequest<'a> {
    /// Regex constraints, ANDed
    pub filter: &'a QueryFilter,
    /// Top-level fields to return; `None` returns whole documents.
    /// `_id` is only returned when listed.
    pub fields: Option<&'a [String]>,
    /// Maximum number of documents overall
    pub limit: Option<u64>,
    /// Documents per server round trip
    pub batch_size: u32,
}

/// Forward-only source of documents opened by [`DocumentStore::open_cursor`].
#[async_trait]
pub trait DocumentCursor: Send {
    /// Next document, or `None` once exhausted
    async fn next_document(&mut self) -> Result<Option<Document>>;
}

/// Storage operations needed by the engines.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Find documents whose `field` equals `value`.
    ///
    /// The value is matched literally, never interpreted as a query
    /// operator. Callers only distinguish zero, one and several matches, so
    /// an implementation may stop after the second match.
    async fn find_by_field(&self, field: &str, value: &Bson) -> Result<Vec<Document>>;

    /// Insert a new document and return its identity.
    ///
    /// The store assigns an `_id` if the document does not carry one.
    async fn insert(&self, doc: Document) -> Result<Bson>;

    /// Replace the document with identity `id`.
    async fn replace_by_id(&self, id: &Bson, doc: Document) -> Result<()>;

    /// Open one cursor over the matching documents in natural order.
    async fn open_cursor(&self, request: ReadRequest<'_>) -> Result<Box<dyn DocumentCursor>>;
}
