//! Integration tests for resolution and graph reconciliation
//!
//! These tests verify end-to-end behavior over the in-memory store, plus
//! failure paths through a store wrapper that injects transport errors.

use async_trait::async_trait;
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;

use lattice_rs::docstore::{
    fields_from_json, Document, DocumentStore, FieldFilter, Fields, MemoryStore, Reference,
    StoreError, Value,
};
use lattice_rs::lattice::error::LatticeError;
use lattice_rs::lattice::reports::Reports;
use lattice_rs::lattice::resolver::Resolver;
use lattice_rs::lattice::seed::SeedLoader;
use lattice_rs::lattice::workflow::{
    EdgeSnapshot, GraphReconciler, NodeSnapshot, WORKFLOWS, WORKFLOW_EDGES, WORKFLOW_FIELD,
    WORKFLOW_NODES,
};

// ============================================================================
// Mock Components
// ============================================================================

/// Store wrapper that fails selected operations with transport errors.
struct FlakyStore {
    inner: MemoryStore,
    fail_gets: RwLock<HashSet<String>>,
    fail_writes: RwLock<HashSet<String>>,
}

impl FlakyStore {
    fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            fail_gets: RwLock::new(HashSet::new()),
            fail_writes: RwLock::new(HashSet::new()),
        }
    }

    async fn fail_get(&self, path: &str) {
        self.fail_gets.write().await.insert(path.to_string());
    }

    async fn fail_writes_in(&self, collection: &str) {
        self.fail_writes.write().await.insert(collection.to_string());
    }
}

#[async_trait]
impl DocumentStore for FlakyStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let path = format!("{}/{}", collection, id);
        if self.fail_gets.read().await.contains(&path) {
            return Err(StoreError::transport(format!("connection reset: {}", path)));
        }
        self.inner.get(collection, id).await
    }

    async fn query(
        &self,
        collection: &str,
        filters: &[FieldFilter],
    ) -> Result<Vec<Document>, StoreError> {
        self.inner.query(collection, filters).await
    }

    async fn add(&self, collection: &str, fields: Fields) -> Result<String, StoreError> {
        if self.fail_writes.read().await.contains(collection) {
            return Err(StoreError::transport(format!("write refused: {}", collection)));
        }
        self.inner.add(collection, fields).await
    }

    async fn set(
        &self,
        collection: &str,
        id: &str,
        fields: Fields,
        merge: bool,
    ) -> Result<(), StoreError> {
        if self.fail_writes.read().await.contains(collection) {
            return Err(StoreError::transport(format!("write refused: {}", collection)));
        }
        self.inner.set(collection, id, fields, merge).await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        if self.fail_writes.read().await.contains(collection) {
            return Err(StoreError::transport(format!("write refused: {}", collection)));
        }
        self.inner.delete(collection, id).await
    }
}

async fn seed_doc(store: &dyn DocumentStore, path: &str, body: serde_json::Value) {
    let reference = Reference::parse(path).unwrap();
    store
        .set(
            &reference.collection,
            &reference.id,
            fields_from_json(&body).unwrap(),
            false,
        )
        .await
        .unwrap();
}

fn node(id: &str) -> NodeSnapshot {
    serde_json::from_value(json!({
        "id": id,
        "type": "default",
        "position": {"x": 1.0, "y": 2.0},
        "data": {"label": id},
    }))
    .unwrap()
}

fn edge(id: &str, source: &str, target: &str) -> EdgeSnapshot {
    serde_json::from_value(json!({"id": id, "source": source, "target": target})).unwrap()
}

async fn workflow_ids(
    store: &dyn DocumentStore,
    collection: &str,
    workflow_id: &str,
) -> Vec<String> {
    let mut ids: Vec<String> = store
        .query(
            collection,
            &[FieldFilter::eq(
                WORKFLOW_FIELD,
                Value::Reference(Reference::new(WORKFLOWS, workflow_id)),
            )],
        )
        .await
        .unwrap()
        .into_iter()
        .map(|doc| doc.id)
        .collect();
    ids.sort();
    ids
}

// ============================================================================
// Resolver
// ============================================================================

#[tokio::test]
async fn resolves_org_document_with_mixed_outcomes() {
    // One reference resolves, one target is missing.
    let store = Arc::new(MemoryStore::new());
    seed_doc(store.as_ref(), "users/u1", json!({"name": "ada", "email": "ada@acme.io"})).await;
    seed_doc(
        store.as_ref(),
        "tasks/t1",
        json!({
            "title": "ship it",
            "assigned_to": {"$ref": "users/u1"},
            "department": {"$ref": "departments/d1"},
        }),
    )
    .await;

    let resolver = Resolver::new(store);
    let tree = resolver.resolve_reference(&Reference::new("tasks", "t1")).await;

    assert_eq!(tree["id"], "t1");
    assert_eq!(tree["assigned_to"]["id"], "u1");
    assert_eq!(tree["assigned_to"]["name"], "ada");
    assert_eq!(
        tree["department"],
        json!({"error": "document not found", "path": "departments/d1"})
    );
}

#[tokio::test]
async fn transport_failure_is_contained_to_its_subtree() {
    let flaky = Arc::new(FlakyStore::new(MemoryStore::new()));
    seed_doc(flaky.as_ref(), "users/u1", json!({"name": "ada"})).await;
    seed_doc(
        flaky.as_ref(),
        "tasks/t1",
        json!({
            "assigned_to": {"$ref": "users/u1"},
            "department": {"$ref": "departments/d1"},
        }),
    )
    .await;
    flaky.fail_get("departments/d1").await;

    let resolver = Resolver::new(flaky);
    let tree = resolver.resolve_reference(&Reference::new("tasks", "t1")).await;

    // The broken branch carries the error inline; the sibling resolved.
    assert_eq!(tree["assigned_to"]["name"], "ada");
    assert_eq!(tree["department"]["path"], "departments/d1");
    assert!(tree["department"]["error"]
        .as_str()
        .unwrap()
        .contains("connection reset"));
}

#[tokio::test]
async fn deep_cycle_terminates_with_one_marker() {
    let store = Arc::new(MemoryStore::new());
    seed_doc(store.as_ref(), "orgs/o1", json!({"parent": {"$ref": "orgs/o2"}})).await;
    seed_doc(store.as_ref(), "orgs/o2", json!({"parent": {"$ref": "orgs/o3"}})).await;
    seed_doc(store.as_ref(), "orgs/o3", json!({"parent": {"$ref": "orgs/o1"}})).await;

    let resolver = Resolver::new(store);
    let tree = resolver.resolve_reference(&Reference::new("orgs", "o1")).await;

    let marker = &tree["parent"]["parent"]["parent"];
    assert_eq!(
        *marker,
        json!({"id": "o1", "path": "orgs/o1", "error": "circular reference"})
    );
}

#[tokio::test]
async fn resolver_never_mutates_the_store() {
    let store = Arc::new(MemoryStore::new());
    seed_doc(store.as_ref(), "users/u1", json!({"manager": {"$ref": "users/u1"}})).await;
    let before = store.get("users", "u1").await.unwrap();

    let resolver = Resolver::new(store.clone());
    resolver.resolve_reference(&Reference::new("users", "u1")).await;

    assert_eq!(store.get("users", "u1").await.unwrap(), before);
    assert_eq!(store.len("users").await, 1);
}

// ============================================================================
// Reconciler
// ============================================================================

#[tokio::test]
async fn snapshot_convergence_end_to_end() {
    let store = Arc::new(MemoryStore::new());
    seed_doc(store.as_ref(), "workflows/w1", json!({"name": "pipeline"})).await;
    let reconciler = GraphReconciler::new(store.clone());

    reconciler
        .reconcile("w1", &[node("n1"), node("n3")], &[edge("e9", "n1", "n3")])
        .await
        .unwrap();
    reconciler
        .reconcile("w1", &[node("n1"), node("n2")], &[edge("e1", "n1", "n2")])
        .await
        .unwrap();

    assert_eq!(
        workflow_ids(store.as_ref(), WORKFLOW_NODES, "w1").await,
        ["n1", "n2"]
    );
    assert_eq!(
        workflow_ids(store.as_ref(), WORKFLOW_EDGES, "w1").await,
        ["e1"]
    );
}

#[tokio::test]
async fn repeated_snapshot_is_a_no_op() {
    let store = Arc::new(MemoryStore::new());
    seed_doc(store.as_ref(), "workflows/w1", json!({"name": "pipeline"})).await;
    let reconciler = GraphReconciler::new(store.clone());

    let nodes = [node("n1"), node("n2")];
    let edges = [edge("e1", "n1", "n2")];
    reconciler.reconcile("w1", &nodes, &edges).await.unwrap();
    let n1_before = store.get(WORKFLOW_NODES, "n1").await.unwrap();

    let summary = reconciler.reconcile("w1", &nodes, &edges).await.unwrap();

    assert_eq!(summary.nodes_deleted, 0);
    assert_eq!(summary.edges_deleted, 0);
    assert_eq!(store.get(WORKFLOW_NODES, "n1").await.unwrap(), n1_before);
}

#[tokio::test]
async fn write_failure_aborts_reconciliation() {
    let flaky = Arc::new(FlakyStore::new(MemoryStore::new()));
    seed_doc(flaky.as_ref(), "workflows/w1", json!({"name": "pipeline"})).await;
    flaky.fail_writes_in(WORKFLOW_NODES).await;

    let reconciler = GraphReconciler::new(flaky);
    let err = reconciler
        .reconcile("w1", &[node("n1")], &[])
        .await
        .unwrap_err();

    assert!(matches!(err, LatticeError::Store(_)));
}

#[tokio::test]
async fn cascade_delete_leaves_nothing_behind() {
    let store = Arc::new(MemoryStore::new());
    seed_doc(store.as_ref(), "workflows/w1", json!({"name": "pipeline"})).await;
    let reconciler = GraphReconciler::new(store.clone());
    reconciler
        .reconcile(
            "w1",
            &[node("n1"), node("n2")],
            &[edge("e1", "n1", "n2"), edge("e2", "n2", "n1")],
        )
        .await
        .unwrap();

    reconciler.delete_workflow("w1").await.unwrap();

    assert!(workflow_ids(store.as_ref(), WORKFLOW_NODES, "w1").await.is_empty());
    assert!(workflow_ids(store.as_ref(), WORKFLOW_EDGES, "w1").await.is_empty());
    assert!(store.get(WORKFLOWS, "w1").await.unwrap().is_none());
    assert_eq!(store.len(WORKFLOW_NODES).await, 0);
    assert_eq!(store.len(WORKFLOW_EDGES).await, 0);
}

// ============================================================================
// Seed + service flows
// ============================================================================

#[tokio::test]
async fn seeded_documents_resolve_through_references() {
    let store = Arc::new(MemoryStore::new());
    SeedLoader::load_str(
        r#"
organizations:
  acme:
    name: Acme
users:
  u1:
    name: ada
    organization:
      $ref: organizations/acme
tasks:
  t1:
    title: launch
    assigned_to:
      $ref: users/u1
"#,
        store.as_ref(),
    )
    .await
    .unwrap();

    let resolver = Resolver::new(store);
    let tree = resolver.resolve_reference(&Reference::new("tasks", "t1")).await;

    assert_eq!(tree["assigned_to"]["organization"]["name"], "Acme");
}

#[tokio::test]
async fn reports_aggregate_seeded_rows() {
    let store = Arc::new(MemoryStore::new());
    for (id, city, units) in [("r1", "Lima", 3), ("r2", "Lima", 4), ("r3", "Cusco", 5)] {
        seed_doc(
            store.as_ref(),
            &format!("maps_data/{}", id),
            json!({
                "country": "PE", "city": city, "route": "R1",
                "sales_units": units, "sales_liters": 1.0, "sales_usd": 10.0,
                "gps_coordinates": {"lat": 0.0, "lng": 0.0},
            }),
        )
        .await;
    }

    let reports = Reports::new(store);
    let zones = reports.distribution_zones("PE").await.unwrap();

    assert_eq!(zones.len(), 2);
    let lima = zones.iter().find(|z| z["city"] == "Lima").unwrap();
    assert_eq!(lima["sales_summary"]["total_units"], 7);
    assert_eq!(lima["points"].as_array().unwrap().len(), 2);
}
