//! MongoDB-backed document store

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{Collection, Cursor};
use mongodb::bson::{Bson, Document, doc};
use mongodb::options::FindOptions;
use tracing::debug;

use crate::error::Result;

use super::{DocumentCursor, DocumentStore, ReadRequest};

/// Document store over a single MongoDB collection.
#[derive(Clone)]
pub struct MongoStore {
    collection: Collection<Document>,
}

impl MongoStore {
    /// Wrap a collection handle
    pub fn new(collection: Collection<Document>) -> Self {
        Self { collection }
    }

    /// Namespace string (`db.collection`) for logging
    pub fn namespace(&self) -> String {
        self.collection.namespace().to_string()
    }

    /// Equality lookup on `field`.
    ///
    /// `$eq` keeps a document-valued key from being read as an operator
    /// expression such as `{"$ne": null}`.
    fn lookup_filter(field: &str, value: &Bson) -> Document {
        doc! { field: { "$eq": value.clone() } }
    }

    /// Find options for an export cursor. No sort is applied so documents
    /// come back in natural order.
    fn read_options(request: &ReadRequest<'_>) -> FindOptions {
        let mut options = FindOptions::default();
        options.batch_size = Some(request.batch_size);
        options.limit = request
            .limit
            .map(|limit| i64::try_from(limit).unwrap_or(i64::MAX));
        options.projection = request.fields.map(Self::read_projection);
        options
    }

    fn read_projection(fields: &[String]) -> Document {
        let mut projection = Document::new();
        for field in fields {
            projection.insert(field.clone(), 1);
        }
        if !fields.iter().any(|field| field == "_id") {
            projection.insert("_id", 0);
        }
        projection
    }
}

#[async_trait]
impl DocumentCursor for Cursor<Document> {
    async fn next_document(&mut self) -> Result<Option<Document>> {
        Ok(self.try_next().await?)
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn find_by_field(&self, field: &str, value: &Bson) -> Result<Vec<Document>> {
        let mut options = FindOptions::default();
        options.limit = Some(2);

        let cursor = self
            .collection
            .find(Self::lookup_filter(field, value))
            .with_options(options)
            .await?;

        Ok(cursor.try_collect().await?)
    }

    async fn insert(&self, doc: Document) -> Result<Bson> {
        let result = self.collection.insert_one(doc).await?;
        Ok(result.inserted_id)
    }

    async fn replace_by_id(&self, id: &Bson, doc: Document) -> Result<()> {
        let result = self
            .collection
            .replace_one(doc! { "_id": id.clone() }, doc)
            .await?;

        if result.matched_count == 0 {
            return Err(format!("no document with _id {id} to replace").into());
        }
        Ok(())
    }

    async fn open_cursor(&self, request: ReadRequest<'_>) -> Result<Box<dyn DocumentCursor>> {
        let filter = request.filter.to_document();
        debug!(
            "Opening cursor on {} (batch size {}) with filter: {}",
            self.namespace(),
            request.batch_size,
            filter
        );

        let cursor = self
            .collection
            .find(filter)
            .with_options(Self::read_options(&request))
            .await?;
        Ok(Box::new(cursor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::filter::QueryFilter;

    fn request<'a>(filter: &'a QueryFilter, fields: Option<&'a [String]>) -> ReadRequest<'a> {
        ReadRequest {
            filter,
            fields,
            limit: None,
            batch_size: 500,
        }
    }

    #[test]
    fn test_lookup_filter_matches_literally() {
        assert_eq!(
            MongoStore::lookup_filter("name", &Bson::String("a".to_string())),
            doc! { "name": { "$eq": "a" } }
        );

        let operator = Bson::Document(doc! { "$ne": null });
        assert_eq!(
            MongoStore::lookup_filter("name", &operator),
            doc! { "name": { "$eq": { "$ne": null } } }
        );
    }

    #[test]
    fn test_read_options_keep_natural_order() {
        let filter = QueryFilter::match_all();
        let options = MongoStore::read_options(&ReadRequest {
            limit: Some(25),
            batch_size: 10,
            ..request(&filter, None)
        });

        assert!(options.sort.is_none());
        assert_eq!(options.limit, Some(25));
        assert_eq!(options.batch_size, Some(10));
        assert!(options.projection.is_none());
    }

    #[test]
    fn test_read_projection_hides_unrequested_id() {
        let fields = vec!["name".to_string(), "value".to_string()];
        let filter = QueryFilter::match_all();
        let options = MongoStore::read_options(&request(&filter, Some(&fields)));

        assert_eq!(options.limit, None);
        assert_eq!(
            options.projection,
            Some(doc! { "name": 1, "value": 1, "_id": 0 })
        );
    }

    #[test]
    fn test_read_projection_keeps_requested_id() {
        let fields = vec!["name".to_string(), "_id".to_string()];
        assert_eq!(
            MongoStore::read_projection(&fields),
            doc! { "name": 1, "_id": 1 }
        );
    }
}
