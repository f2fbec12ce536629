// SPDX-License-Identifier: MIT

//! Document store contract
//!
//! The backend is injected everywhere as `Arc<dyn DocumentStore>` so tests
//! can substitute an in-memory store for the real backend.

use async_trait::async_trait;

use super::error::StoreError;
use super::value::{Document, Fields, Reference, Value};

/// A single equality predicate for [`DocumentStore::query`].
#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilter {
    pub field: String,
    pub value: Value,
}

impl FieldFilter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }
}

/// Async contract for a document-oriented store.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch one document, `None` when absent.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    /// Fetch every document matching all of the given equality filters.
    async fn query(
        &self,
        collection: &str,
        filters: &[FieldFilter],
    ) -> Result<Vec<Document>, StoreError>;

    /// Create a document with a store-generated id; returns the id.
    async fn add(&self, collection: &str, fields: Fields) -> Result<String, StoreError>;

    /// Write a document at a caller-chosen id. With `merge` set, fields
    /// present in `fields` overwrite and absent fields are left untouched;
    /// without it the body is replaced wholesale.
    async fn set(
        &self,
        collection: &str,
        id: &str,
        fields: Fields,
        merge: bool,
    ) -> Result<(), StoreError>;

    /// Delete a document. Deleting an absent document is a no-op.
    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError>;

    /// Construct a reference value without fetching anything.
    fn doc_ref(&self, collection: &str, id: &str) -> Reference {
        Reference::new(collection, id)
    }
}
