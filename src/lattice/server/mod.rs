// SPDX-License-Identifier: MIT

use axum::extract::{Path, Query, State};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use futures::future::join_all;
use serde::Deserialize;
use serde_json::{json, Map, Value as JsonValue};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::docstore::{fields_from_json, Document, DocumentStore};
use crate::lattice::chat::{ChatProxy, ChatRequest};
use crate::lattice::error::LatticeError;
use crate::lattice::reports::Reports;
use crate::lattice::resolver::Resolver;
use crate::lattice::workflow::{
    EdgeSnapshot, GraphReconciler, NodeSnapshot, WORKFLOWS, WORKFLOW_EDGES, WORKFLOW_FIELD,
    WORKFLOW_NODES,
};

/// Organizational collections served by the generic data endpoints.
const DATA_COLLECTIONS: [&str; 4] = ["organizations", "users", "roles", "tasks"];

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub chat: Option<Arc<ChatProxy>>,
}

impl AppState {
    /// Build state over a store; the chat proxy is attached only when its
    /// credentials are configured.
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        let chat = match ChatProxy::new(store.clone()) {
            Ok(proxy) => Some(Arc::new(proxy)),
            Err(err) => {
                log::warn!("chat proxy disabled: {}", err);
                None
            }
        };
        Self { store, chat }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/data/{collection}", get(list_documents))
        .route("/api/data/{collection}", post(create_document))
        .route("/api/data/{collection}/{id}", get(get_document))
        .route("/api/data/{collection}/{id}", axum::routing::patch(update_document))
        .route("/api/data/{collection}/{id}", delete(delete_document))
        .route("/api/workflows", get(list_workflows))
        .route("/api/workflows", post(create_workflow))
        .route("/api/workflows/{id}", get(get_workflow))
        .route("/api/workflows/{id}", delete(delete_workflow))
        .route("/api/workflows/{id}/graph", put(save_workflow_graph))
        .route("/api/reports/maps-data", get(report_maps_data))
        .route("/api/reports/distributors", get(report_distributors))
        .route("/api/reports/countries", get(report_countries))
        .route("/api/reports/routes", get(report_routes))
        .route("/api/reports/distribution-zones", get(report_zones))
        .route("/api/chat", post(chat_completion))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn serve(port: u16, state: AppState) -> Result<(), LatticeError> {
    let app = router(state);
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    log::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health_check() -> Json<JsonValue> {
    Json(json!({ "status": "ok" }))
}

fn known_collection(collection: &str) -> Result<(), LatticeError> {
    if DATA_COLLECTIONS.contains(&collection) {
        Ok(())
    } else {
        Err(LatticeError::not_found(collection))
    }
}

// --- organizational data ---

async fn list_documents(
    State(state): State<AppState>,
    Path(collection): Path<String>,
) -> Result<Json<JsonValue>, LatticeError> {
    known_collection(&collection)?;
    let docs = state.store.query(&collection, &[]).await?;

    let resolver = Resolver::new(state.store.clone());
    let rows = join_all(docs.iter().map(|doc| resolver.resolve_document(doc))).await;
    Ok(Json(JsonValue::Array(rows)))
}

async fn get_document(
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, String)>,
) -> Result<Json<JsonValue>, LatticeError> {
    known_collection(&collection)?;
    let doc = state
        .store
        .get(&collection, &id)
        .await?
        .ok_or_else(|| LatticeError::not_found(format!("{}/{}", collection, id)))?;

    let resolver = Resolver::new(state.store.clone());
    Ok(Json(resolver.resolve_document(&doc).await))
}

async fn create_document(
    State(state): State<AppState>,
    Path(collection): Path<String>,
    Json(body): Json<JsonValue>,
) -> Result<Json<JsonValue>, LatticeError> {
    known_collection(&collection)?;
    if !body.is_object() {
        return Err(LatticeError::validation("document body must be an object"));
    }
    let id = state.store.add(&collection, fields_from_json(&body)?).await?;
    Ok(Json(json!({ "id": id })))
}

async fn update_document(
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, String)>,
    Json(body): Json<JsonValue>,
) -> Result<Json<JsonValue>, LatticeError> {
    known_collection(&collection)?;
    if !body.is_object() {
        return Err(LatticeError::validation("document body must be an object"));
    }
    if state.store.get(&collection, &id).await?.is_none() {
        return Err(LatticeError::not_found(format!("{}/{}", collection, id)));
    }
    state
        .store
        .set(&collection, &id, fields_from_json(&body)?, true)
        .await?;
    Ok(Json(json!({ "id": id })))
}

async fn delete_document(
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, String)>,
) -> Result<Json<JsonValue>, LatticeError> {
    known_collection(&collection)?;
    if state.store.get(&collection, &id).await?.is_none() {
        return Err(LatticeError::not_found(format!("{}/{}", collection, id)));
    }
    state.store.delete(&collection, &id).await?;
    Ok(Json(json!({ "deleted": true })))
}

// --- workflow graphs ---

#[derive(Debug, Deserialize)]
struct CreateWorkflowRequest {
    name: String,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct GraphSnapshotRequest {
    #[serde(default)]
    nodes: Vec<NodeSnapshot>,
    #[serde(default)]
    edges: Vec<EdgeSnapshot>,
}

async fn list_workflows(State(state): State<AppState>) -> Result<Json<JsonValue>, LatticeError> {
    let docs = state.store.query(WORKFLOWS, &[]).await?;
    Ok(Json(JsonValue::Array(
        docs.iter().map(Document::to_json).collect(),
    )))
}

async fn create_workflow(
    State(state): State<AppState>,
    Json(request): Json<CreateWorkflowRequest>,
) -> Result<Json<JsonValue>, LatticeError> {
    if request.name.trim().is_empty() {
        return Err(LatticeError::validation("workflow name is required"));
    }
    let body = json!({
        "name": request.name,
        "description": request.description.unwrap_or_default(),
        "created_at": chrono::Utc::now().to_rfc3339(),
    });
    let id = state.store.add(WORKFLOWS, fields_from_json(&body)?).await?;
    Ok(Json(json!({ "id": id })))
}

/// Stored node/edge rows carry a workflow reference; strip it when nesting
/// the rows under their workflow.
fn graph_row(doc: &Document) -> JsonValue {
    let mut row = doc.to_json();
    if let Some(map) = row.as_object_mut() {
        map.remove(WORKFLOW_FIELD);
    }
    row
}

async fn get_workflow(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<JsonValue>, LatticeError> {
    let doc = state
        .store
        .get(WORKFLOWS, &id)
        .await?
        .ok_or_else(|| LatticeError::not_found(format!("{}/{}", WORKFLOWS, id)))?;

    let workflow_ref = state.store.doc_ref(WORKFLOWS, &id);
    let filter = [crate::docstore::FieldFilter::eq(
        WORKFLOW_FIELD,
        crate::docstore::Value::Reference(workflow_ref),
    )];
    let nodes = state.store.query(WORKFLOW_NODES, &filter).await?;
    let edges = state.store.query(WORKFLOW_EDGES, &filter).await?;

    let mut out = Map::new();
    if let JsonValue::Object(map) = doc.to_json() {
        out.extend(map);
    }
    out.insert(
        "nodes".to_string(),
        JsonValue::Array(nodes.iter().map(graph_row).collect()),
    );
    out.insert(
        "edges".to_string(),
        JsonValue::Array(edges.iter().map(graph_row).collect()),
    );
    Ok(Json(JsonValue::Object(out)))
}

async fn save_workflow_graph(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(snapshot): Json<GraphSnapshotRequest>,
) -> Result<Json<JsonValue>, LatticeError> {
    let reconciler = GraphReconciler::new(state.store.clone());
    let summary = reconciler
        .reconcile(&id, &snapshot.nodes, &snapshot.edges)
        .await?;
    Ok(Json(serde_json::to_value(summary)?))
}

async fn delete_workflow(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<JsonValue>, LatticeError> {
    let reconciler = GraphReconciler::new(state.store.clone());
    reconciler.delete_workflow(&id).await?;
    Ok(Json(json!({ "deleted": true })))
}

// --- reports ---

#[derive(Debug, Deserialize)]
struct CountryQuery {
    country: String,
}

#[derive(Debug, Deserialize)]
struct DistributorQuery {
    country: String,
    distributor_type: String,
}

async fn report_maps_data(
    State(state): State<AppState>,
    Query(query): Query<CountryQuery>,
) -> Result<Json<JsonValue>, LatticeError> {
    let rows = Reports::new(state.store.clone())
        .maps_data(&query.country)
        .await?;
    Ok(Json(json!({ "maps_data": rows })))
}

async fn report_distributors(
    State(state): State<AppState>,
    Query(query): Query<DistributorQuery>,
) -> Result<Json<JsonValue>, LatticeError> {
    let rows = Reports::new(state.store.clone())
        .distributor_data(&query.country, &query.distributor_type)
        .await?;
    Ok(Json(json!({ "distributors": rows })))
}

async fn report_countries(State(state): State<AppState>) -> Result<Json<JsonValue>, LatticeError> {
    let countries = Reports::new(state.store.clone()).countries().await?;
    Ok(Json(json!({ "countries": countries })))
}

async fn report_routes(
    State(state): State<AppState>,
    Query(query): Query<CountryQuery>,
) -> Result<Json<JsonValue>, LatticeError> {
    let routes = Reports::new(state.store.clone())
        .routes_by_country(&query.country)
        .await?;
    Ok(Json(json!({ "routes": routes })))
}

async fn report_zones(
    State(state): State<AppState>,
    Query(query): Query<CountryQuery>,
) -> Result<Json<JsonValue>, LatticeError> {
    let zones = Reports::new(state.store.clone())
        .distribution_zones(&query.country)
        .await?;
    Ok(Json(json!({ "zones": zones })))
}

// --- chat ---

async fn chat_completion(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<JsonValue>, LatticeError> {
    let proxy = state
        .chat
        .as_ref()
        .ok_or_else(|| LatticeError::from("chat proxy is not configured"))?;
    Ok(Json(proxy.complete(&request).await?))
}
