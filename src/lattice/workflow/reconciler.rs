// SPDX-License-Identifier: MIT

//! Graph reconciler
//!
//! Converges the stored node/edge set for a workflow to match an incoming
//! snapshot: upsert what is present, delete what is absent. The plan is
//! computed before anything is written, so a batching layer can later apply
//! it in one shot without changing the algorithm. The apply phase is not
//! atomic; a store failure aborts the call and leaves partial progress
//! visible to the caller.

use std::collections::HashSet;
use std::sync::Arc;

use crate::docstore::{fields_from_json, DocumentStore, FieldFilter, Fields, Reference, Value};
use crate::lattice::error::LatticeError;

use super::types::{
    EdgeSnapshot, NodeSnapshot, ReconcileSummary, WORKFLOWS, WORKFLOW_EDGES, WORKFLOW_FIELD,
    WORKFLOW_NODES,
};

/// Everything `reconcile` intends to write or remove, computed up front.
#[derive(Debug, Default)]
pub struct ReconcilePlan {
    pub node_upserts: Vec<(String, Fields)>,
    pub node_deletes: Vec<String>,
    pub edge_upserts: Vec<(String, Fields)>,
    pub edge_deletes: Vec<String>,
    pub skipped: usize,
}

impl ReconcilePlan {
    /// Build the plan from the current stored ids and the snapshot. Items
    /// without an id are counted as skipped, not synchronized.
    pub fn build(
        workflow_ref: &Reference,
        existing_node_ids: &HashSet<String>,
        existing_edge_ids: &HashSet<String>,
        nodes: &[NodeSnapshot],
        edges: &[EdgeSnapshot],
    ) -> Result<Self, LatticeError> {
        let mut plan = ReconcilePlan::default();
        let mut incoming_nodes = HashSet::new();
        let mut incoming_edges = HashSet::new();

        for node in nodes {
            let Some(id) = node.id.as_ref().filter(|id| !id.is_empty()) else {
                plan.skipped += 1;
                continue;
            };
            let mut fields = fields_from_json(&node.body())?;
            fields.insert(
                WORKFLOW_FIELD.to_string(),
                Value::Reference(workflow_ref.clone()),
            );
            incoming_nodes.insert(id.clone());
            plan.node_upserts.push((id.clone(), fields));
        }

        for edge in edges {
            let Some(id) = edge.id.as_ref().filter(|id| !id.is_empty()) else {
                plan.skipped += 1;
                continue;
            };
            let mut fields = fields_from_json(&edge.body())?;
            fields.insert(
                WORKFLOW_FIELD.to_string(),
                Value::Reference(workflow_ref.clone()),
            );
            incoming_edges.insert(id.clone());
            plan.edge_upserts.push((id.clone(), fields));
        }

        plan.node_deletes = existing_node_ids
            .difference(&incoming_nodes)
            .cloned()
            .collect();
        plan.edge_deletes = existing_edge_ids
            .difference(&incoming_edges)
            .cloned()
            .collect();
        // Deterministic apply order.
        plan.node_deletes.sort();
        plan.edge_deletes.sort();
        Ok(plan)
    }

    pub fn summary(&self) -> ReconcileSummary {
        ReconcileSummary {
            nodes_upserted: self.node_upserts.len(),
            nodes_deleted: self.node_deletes.len(),
            edges_upserted: self.edge_upserts.len(),
            edges_deleted: self.edge_deletes.len(),
            skipped: self.skipped,
        }
    }
}

pub struct GraphReconciler {
    store: Arc<dyn DocumentStore>,
}

impl GraphReconciler {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Converge the stored graph for `workflow_id` to the snapshot.
    ///
    /// Idempotent: repeating the call with the same snapshot re-writes
    /// identical content and finds nothing to delete, so the stored set is
    /// unchanged. A failed apply is safely recovered by re-sending the same
    /// snapshot.
    pub async fn reconcile(
        &self,
        workflow_id: &str,
        nodes: &[NodeSnapshot],
        edges: &[EdgeSnapshot],
    ) -> Result<ReconcileSummary, LatticeError> {
        if workflow_id.is_empty() {
            return Err(LatticeError::validation("workflow id is required"));
        }
        let workflow_ref = self.store.doc_ref(WORKFLOWS, workflow_id);
        if self
            .store
            .get(WORKFLOWS, workflow_id)
            .await?
            .is_none()
        {
            return Err(LatticeError::not_found(workflow_ref.path()));
        }

        let existing_node_ids = self.owned_ids(WORKFLOW_NODES, &workflow_ref).await?;
        let existing_edge_ids = self.owned_ids(WORKFLOW_EDGES, &workflow_ref).await?;

        let plan = ReconcilePlan::build(
            &workflow_ref,
            &existing_node_ids,
            &existing_edge_ids,
            nodes,
            edges,
        )?;
        log::debug!(
            "reconciling {}: +{} nodes / -{} nodes, +{} edges / -{} edges",
            workflow_ref.path(),
            plan.node_upserts.len(),
            plan.node_deletes.len(),
            plan.edge_upserts.len(),
            plan.edge_deletes.len(),
        );

        self.apply(&plan).await?;
        Ok(plan.summary())
    }

    /// Delete every node and edge referencing the workflow, then the
    /// workflow document itself. Graph elements never outlive their
    /// workflow.
    pub async fn delete_workflow(&self, workflow_id: &str) -> Result<(), LatticeError> {
        if workflow_id.is_empty() {
            return Err(LatticeError::validation("workflow id is required"));
        }
        let workflow_ref = self.store.doc_ref(WORKFLOWS, workflow_id);
        if self
            .store
            .get(WORKFLOWS, workflow_id)
            .await?
            .is_none()
        {
            return Err(LatticeError::not_found(workflow_ref.path()));
        }

        for collection in [WORKFLOW_NODES, WORKFLOW_EDGES] {
            for id in self.owned_ids(collection, &workflow_ref).await? {
                self.store.delete(collection, &id).await?;
            }
        }
        self.store.delete(WORKFLOWS, workflow_id).await?;
        log::info!("deleted workflow {} and its graph", workflow_id);
        Ok(())
    }

    async fn owned_ids(
        &self,
        collection: &str,
        workflow_ref: &Reference,
    ) -> Result<HashSet<String>, LatticeError> {
        let docs = self
            .store
            .query(
                collection,
                &[FieldFilter::eq(
                    WORKFLOW_FIELD,
                    Value::Reference(workflow_ref.clone()),
                )],
            )
            .await?;
        Ok(docs.into_iter().map(|doc| doc.id).collect())
    }

    async fn apply(&self, plan: &ReconcilePlan) -> Result<(), LatticeError> {
        for (id, fields) in &plan.node_upserts {
            self.store
                .set(WORKFLOW_NODES, id, fields.clone(), true)
                .await?;
        }
        for (id, fields) in &plan.edge_upserts {
            self.store
                .set(WORKFLOW_EDGES, id, fields.clone(), true)
                .await?;
        }
        for id in &plan.node_deletes {
            self.store.delete(WORKFLOW_NODES, id).await?;
        }
        for id in &plan.edge_deletes {
            self.store.delete(WORKFLOW_EDGES, id).await?;
        }
        Ok(())
    }
}
