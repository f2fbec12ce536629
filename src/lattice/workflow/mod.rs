// SPDX-License-Identifier: MIT

//! Workflow graph persistence: snapshot types and the reconciler that
//! converges the stored node/edge set to an authoritative snapshot.

pub mod reconciler;
pub mod types;

pub use reconciler::{GraphReconciler, ReconcilePlan};
pub use types::{
    EdgeSnapshot, NodeSnapshot, ReconcileSummary, WORKFLOWS, WORKFLOW_EDGES, WORKFLOW_FIELD,
    WORKFLOW_NODES,
};
