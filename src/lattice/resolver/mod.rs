// SPDX-License-Identifier: MIT

//! Reference resolver
//!
//! Expands reference fields into embedded documents. Resolution is a pure
//! read: the resolver never creates, mutates, or deletes documents. A value
//! that cannot be fully resolved is replaced inline by a marker object, so
//! one unreachable corner of the reference graph never aborts the rest of
//! the tree:
//!
//! - cycle: `{"id", "path", "error": "circular reference"}`
//! - missing target: `{"error": "document not found", "path"}`
//! - store failure: `{"error": <message>, "path"}`

use futures::future::{join_all, BoxFuture};
use serde_json::{json, Map, Value as JsonValue};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::docstore::{Document, DocumentStore, Fields, Reference, Value};

/// Paths already entered during one top-level resolution. Shared by every
/// concurrent branch of that resolution and discarded when it returns; the
/// check-and-insert happens under a single lock guard, which is what
/// guarantees termination on cyclic graphs.
pub type VisitedSet = Arc<Mutex<HashSet<String>>>;

fn new_visited() -> VisitedSet {
    Arc::new(Mutex::new(HashSet::new()))
}

pub struct Resolver {
    store: Arc<dyn DocumentStore>,
}

impl Resolver {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Resolve a bare reference into a fully expanded tree. One top-level
    /// invocation, one fresh visited set.
    pub async fn resolve_reference(&self, reference: &Reference) -> JsonValue {
        self.resolve(reference.clone(), new_visited()).await
    }

    /// Expand one already-fetched document's reference-bearing fields.
    ///
    /// Each field is its own top-level resolution with its own visited set,
    /// so two fields pointing at the same target both expand fully; within a
    /// field's subtree the set is shared.
    pub async fn resolve_document(&self, document: &Document) -> JsonValue {
        let resolved = join_all(document.fields.iter().map(|(name, value)| {
            let name = name.clone();
            async move { (name, self.resolve_value(value, new_visited()).await) }
        }))
        .await;

        let mut map = Map::new();
        map.insert("id".to_string(), JsonValue::String(document.id.clone()));
        for (name, value) in resolved {
            map.insert(name, value);
        }
        JsonValue::Object(map)
    }

    fn resolve(&self, reference: Reference, visited: VisitedSet) -> BoxFuture<'_, JsonValue> {
        Box::pin(async move {
            let path = reference.path();
            {
                // Single guard for check-and-insert: two branches can never
                // both miss each other's entry.
                let mut entered = visited.lock().await;
                if !entered.insert(path.clone()) {
                    log::debug!("cycle at {}", path);
                    return json!({
                        "id": reference.id,
                        "path": path,
                        "error": "circular reference",
                    });
                }
            }

            match self.store.get(&reference.collection, &reference.id).await {
                Err(err) => json!({ "error": err.to_string(), "path": path }),
                Ok(None) => json!({ "error": "document not found", "path": path }),
                Ok(Some(document)) => {
                    self.expand_fields(&document.id, &document.fields, visited)
                        .await
                }
            }
        })
    }

    /// Expand a fetched document body inside an ongoing resolution; the
    /// subtree keeps the caller's visited set.
    async fn expand_fields(&self, id: &str, fields: &Fields, visited: VisitedSet) -> JsonValue {
        let resolved = join_all(fields.iter().map(|(name, value)| {
            let name = name.clone();
            let visited = visited.clone();
            async move { (name, self.resolve_value(value, visited).await) }
        }))
        .await;

        let mut map = Map::new();
        map.insert("id".to_string(), JsonValue::String(id.to_string()));
        for (name, value) in resolved {
            map.insert(name, value);
        }
        JsonValue::Object(map)
    }

    /// Direct reference fields recurse; list elements that are references
    /// recurse in place with order preserved; everything else passes through
    /// verbatim (no recursion into nested maps).
    async fn resolve_value(&self, value: &Value, visited: VisitedSet) -> JsonValue {
        match value {
            Value::Reference(reference) => self.resolve(reference.clone(), visited).await,
            Value::Array(items) => {
                let resolved = join_all(items.iter().map(|item| {
                    let visited = visited.clone();
                    async move {
                        match item {
                            Value::Reference(reference) => {
                                self.resolve(reference.clone(), visited).await
                            }
                            other => other.to_json(),
                        }
                    }
                }))
                .await;
                JsonValue::Array(resolved)
            }
            other => other.to_json(),
        }
    }
}
