// SPDX-License-Identifier: MIT

//! Workflow graph snapshot types
//!
//! A snapshot is the complete, authoritative node/edge state for one
//! workflow as sent by the canvas client — not a delta. Field names follow
//! the client's camelCase wire format.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// Collection holding workflow documents.
pub const WORKFLOWS: &str = "workflows";
/// Collection holding node documents, each carrying a workflow reference.
pub const WORKFLOW_NODES: &str = "workflow_nodes";
/// Collection holding edge documents, each carrying a workflow reference.
pub const WORKFLOW_EDGES: &str = "workflow_edges";

/// Field on node/edge documents referencing the owning workflow.
pub const WORKFLOW_FIELD: &str = "workflow";

/// A node in an incoming snapshot. Items without an id are skipped during
/// reconciliation rather than rejected.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct NodeSnapshot {
    #[serde(default)]
    pub id: Option<String>,
    /// Node kind as rendered by the canvas ("input", "default", ...).
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub position: Option<JsonValue>,
    #[serde(default)]
    pub data: Option<JsonValue>,
    #[serde(default)]
    pub width: Option<JsonValue>,
    #[serde(default)]
    pub height: Option<JsonValue>,
    #[serde(default)]
    pub selected: Option<bool>,
    #[serde(default)]
    pub position_absolute: Option<JsonValue>,
    #[serde(default)]
    pub dragging: Option<bool>,
}

/// An edge in an incoming snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct EdgeSnapshot {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub source_handle: Option<String>,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub target_handle: Option<String>,
}

fn empty_map() -> JsonValue {
    JsonValue::Object(Map::new())
}

impl NodeSnapshot {
    /// Stored document body (without the workflow reference, which the
    /// reconciler attaches). Position-like fields default to empty mappings,
    /// flags to false.
    pub fn body(&self) -> JsonValue {
        serde_json::json!({
            "type": self.kind.clone().unwrap_or_default(),
            "position": self.position.clone().unwrap_or_else(empty_map),
            "data": self.data.clone().unwrap_or_else(empty_map),
            "width": self.width.clone().unwrap_or(JsonValue::Null),
            "height": self.height.clone().unwrap_or(JsonValue::Null),
            "selected": self.selected.unwrap_or(false),
            "positionAbsolute": self.position_absolute.clone().unwrap_or_else(empty_map),
            "dragging": self.dragging.unwrap_or(false),
        })
    }
}

impl EdgeSnapshot {
    pub fn body(&self) -> JsonValue {
        serde_json::json!({
            "source": self.source.clone().unwrap_or_default(),
            "sourceHandle": self.source_handle.clone().unwrap_or_default(),
            "target": self.target.clone().unwrap_or_default(),
            "targetHandle": self.target_handle.clone().unwrap_or_default(),
        })
    }
}

/// Counts reported back after a reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReconcileSummary {
    pub nodes_upserted: usize,
    pub nodes_deleted: usize,
    pub edges_upserted: usize,
    pub edges_deleted: usize,
    /// Incoming items dropped for missing an id.
    pub skipped: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_node_snapshot_deserializes_camel_case() {
        let node: NodeSnapshot = serde_json::from_value(json!({
            "id": "n1",
            "type": "input",
            "position": {"x": 10, "y": 20},
            "positionAbsolute": {"x": 10, "y": 20},
            "dragging": true,
        }))
        .unwrap();

        assert_eq!(node.id.as_deref(), Some("n1"));
        assert_eq!(node.kind.as_deref(), Some("input"));
        assert_eq!(node.dragging, Some(true));
        assert_eq!(node.position_absolute, Some(json!({"x": 10, "y": 20})));
    }

    #[test]
    fn test_node_body_defaults() {
        let node = NodeSnapshot {
            id: Some("n1".to_string()),
            ..Default::default()
        };
        let body = node.body();
        assert_eq!(body["position"], json!({}));
        assert_eq!(body["data"], json!({}));
        assert_eq!(body["selected"], json!(false));
        assert_eq!(body["dragging"], json!(false));
    }

    #[test]
    fn test_edge_body_wire_names() {
        let edge: EdgeSnapshot = serde_json::from_value(json!({
            "id": "e1",
            "source": "n1",
            "sourceHandle": "out",
            "target": "n2",
            "targetHandle": "in",
        }))
        .unwrap();

        let body = edge.body();
        assert_eq!(body["source"], "n1");
        assert_eq!(body["sourceHandle"], "out");
        assert_eq!(body["targetHandle"], "in");
    }
}
