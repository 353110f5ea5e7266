//! REST API handlers for session operations

use crate::api::websocket::WsBroadcaster;
use crate::artifact::{ArtifactRegistry, CompiledArtifact, FunctionAbi};
use crate::session::{DeployedInstance, SessionError, SessionManager, TransactionRecord};
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Shared application state for API handlers
#[derive(Clone)]
pub struct ApiState {
    pub manager: Arc<SessionManager>,
    pub registry: Arc<ArtifactRegistry>,
    pub ws_broadcaster: Arc<WsBroadcaster>,
}

// ============================================================================
// Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Serialize)]
pub struct SessionInfo {
    pub account: String,
    pub artifacts: usize,
    pub instances: usize,
    pub transactions: usize,
}

#[derive(Serialize)]
pub struct ArtifactInfo {
    pub id: String,
    pub name: String,
    pub contract_name: String,
    pub source: String,
    pub bytecode_size: usize,
    pub abi: Vec<FunctionAbi>,
}

impl From<&CompiledArtifact> for ArtifactInfo {
    fn from(artifact: &CompiledArtifact) -> Self {
        Self {
            id: artifact.id.clone(),
            name: artifact.name.clone(),
            contract_name: artifact.contract_name.clone(),
            source: artifact.source.clone(),
            bytecode_size: artifact.bytecode.len(),
            abi: artifact.abi.clone(),
        }
    }
}

#[derive(Serialize)]
pub struct InstanceInfo {
    pub id: String,
    pub name: String,
    pub address: String,
    pub state: HashMap<String, Vec<Value>>,
}

impl From<&DeployedInstance> for InstanceInfo {
    fn from(instance: &DeployedInstance) -> Self {
        Self {
            id: instance.id().to_string(),
            name: instance.artifact.name.clone(),
            address: instance.address.clone(),
            state: instance.state.clone(),
        }
    }
}

#[derive(Serialize)]
pub struct DeployResponse {
    pub id: String,
    pub address: String,
    pub cost: u64,
    pub hash: String,
}

#[derive(Serialize)]
pub struct InvokeResponse {
    pub cost: u64,
    pub hash: String,
    pub outputs: Vec<Value>,
}

#[derive(Serialize)]
pub struct LoadArtifactResponse {
    pub id: String,
    pub name: String,
}

#[derive(Serialize)]
pub struct AccountResponse {
    pub account: String,
}

#[derive(Serialize)]
pub struct ApiError {
    pub error: String,
}

// ============================================================================
// Request Types
// ============================================================================

#[derive(Deserialize)]
pub struct DeployRequest {
    pub id: String,
    #[serde(default)]
    pub params: Vec<Value>,
}

#[derive(Deserialize)]
pub struct InvokeRequest {
    #[serde(rename = "fn")]
    pub fn_name: String,
    #[serde(default)]
    pub params: Vec<Value>,
}

#[derive(Deserialize)]
pub struct AccountRequest {
    pub account: String,
}

// ============================================================================
// Error mapping
// ============================================================================

/// Surface a session failure: log line + HTTP status for the boundary
fn surface(err: SessionError) -> (StatusCode, Json<ApiError>) {
    log::error!("{}", err);
    let status = match err {
        SessionError::UnknownArtifact(_)
        | SessionError::UnknownInstance(_)
        | SessionError::UnknownFunction { .. } => StatusCode::NOT_FOUND,
        SessionError::Chain(_) => StatusCode::BAD_GATEWAY,
    };
    (
        status,
        Json(ApiError {
            error: err.to_string(),
        }),
    )
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /health - Liveness check
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// GET /api/session - Session overview
pub async fn get_session(State(state): State<ApiState>) -> Json<SessionInfo> {
    let store = state.manager.store();
    Json(SessionInfo {
        account: store.account(),
        artifacts: store.artifacts().len(),
        instances: store.instances().len(),
        transactions: store.history().len(),
    })
}

/// GET /api/account - Active account
pub async fn get_account(State(state): State<ApiState>) -> Json<AccountResponse> {
    Json(AccountResponse {
        account: state.manager.store().account(),
    })
}

/// PUT /api/account - Replace the active account
pub async fn set_account(
    State(state): State<ApiState>,
    Json(req): Json<AccountRequest>,
) -> Json<AccountResponse> {
    state.manager.store().set_account(&req.account);
    Json(AccountResponse {
        account: req.account,
    })
}

/// GET /api/artifacts - List loaded artifacts
pub async fn list_artifacts(State(state): State<ApiState>) -> Json<Vec<ArtifactInfo>> {
    let artifacts = state.manager.store().artifacts();
    let mut list: Vec<ArtifactInfo> = artifacts.values().map(ArtifactInfo::from).collect();
    list.sort_by(|a, b| a.name.cmp(&b.name));
    Json(list)
}

/// POST /api/artifacts/:source_id - Ingest an artifact-loaded notification
pub async fn load_artifact(
    State(state): State<ApiState>,
    Path(source_id): Path<String>,
    body: Bytes,
) -> Result<Json<LoadArtifactResponse>, (StatusCode, Json<ApiError>)> {
    match state.registry.on_artifact_loaded(&source_id, &body) {
        Ok(artifact) => Ok(Json(LoadArtifactResponse {
            id: artifact.id,
            name: artifact.name,
        })),
        Err(e) => {
            log::error!("Artifact {} rejected: {}", source_id, e);
            Err((
                StatusCode::BAD_REQUEST,
                Json(ApiError {
                    error: e.to_string(),
                }),
            ))
        }
    }
}

/// POST /api/deploy - Deploy an artifact
pub async fn deploy(
    State(state): State<ApiState>,
    Json(req): Json<DeployRequest>,
) -> Result<Json<DeployResponse>, (StatusCode, Json<ApiError>)> {
    match state.manager.deploy(&req.id, &req.params).await {
        Ok(outcome) => Ok(Json(DeployResponse {
            id: outcome.id,
            address: outcome.address,
            cost: outcome.cost,
            hash: outcome.hash,
        })),
        Err(e) => Err(surface(e)),
    }
}

/// GET /api/instances - List deployed instances
pub async fn list_instances(State(state): State<ApiState>) -> Json<Vec<InstanceInfo>> {
    let instances = state.manager.store().instances();
    let mut list: Vec<InstanceInfo> = instances.values().map(InstanceInfo::from).collect();
    list.sort_by(|a, b| a.name.cmp(&b.name));
    Json(list)
}

/// GET /api/instances/:id - Get one deployed instance
pub async fn get_instance(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<InstanceInfo>, (StatusCode, Json<ApiError>)> {
    match state.manager.store().instance(&id) {
        Some(instance) => Ok(Json(InstanceInfo::from(&instance))),
        None => Err((
            StatusCode::NOT_FOUND,
            Json(ApiError {
                error: format!("No deployed instance with id {}", id),
            }),
        )),
    }
}

/// POST /api/instances/:id/call - Read-only invocation
pub async fn call_instance(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Json(req): Json<InvokeRequest>,
) -> Result<Json<InvokeResponse>, (StatusCode, Json<ApiError>)> {
    match state.manager.call(&id, &req.fn_name, &req.params).await {
        Ok(outcome) => Ok(Json(InvokeResponse {
            cost: outcome.cost,
            hash: outcome.hash,
            outputs: outcome.outputs,
        })),
        Err(e) => Err(surface(e)),
    }
}

/// POST /api/instances/:id/tx - State-changing invocation
pub async fn tx_instance(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Json(req): Json<InvokeRequest>,
) -> Result<Json<InvokeResponse>, (StatusCode, Json<ApiError>)> {
    match state.manager.tx(&id, &req.fn_name, &req.params).await {
        Ok(outcome) => Ok(Json(InvokeResponse {
            cost: outcome.cost,
            hash: outcome.hash,
            outputs: outcome.outputs,
        })),
        Err(e) => Err(surface(e)),
    }
}

/// DELETE /api/instances/:id - Dispose an instance
pub async fn dispose_instance(State(state): State<ApiState>, Path(id): Path<String>) -> StatusCode {
    state.manager.dispose(&id);
    StatusCode::NO_CONTENT
}

/// DELETE /api/instances/:id/state/:fn - Clear one function's cached outputs
pub async fn dispose_state(
    State(state): State<ApiState>,
    Path((id, fn_name)): Path<(String, String)>,
) -> StatusCode {
    state.manager.dispose_state(&id, &fn_name);
    StatusCode::NO_CONTENT
}

/// GET /api/history - Full transaction history, oldest first
pub async fn get_history(State(state): State<ApiState>) -> Json<Vec<TransactionRecord>> {
    Json(state.manager.store().history().as_ref().clone())
}
