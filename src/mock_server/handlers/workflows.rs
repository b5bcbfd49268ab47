//! Workflow endpoint handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use tokio::sync::RwLock;

use super::{error_response, unknown_org};
use crate::mock_server::state::MockState;
use crate::{Workflow, WorkflowConfig};

/// Body of a workflow POST.
#[derive(Debug, Deserialize)]
pub struct CreateWorkflowBody {
    pub name: String,
    #[serde(rename = "type")]
    pub workflow_type: String,
    pub status: Option<String>,
    pub config: Option<WorkflowConfig>,
}

/// Body of a workflow PATCH.
#[derive(Debug, Default, Deserialize)]
pub struct PatchWorkflowBody {
    pub name: Option<String>,
    pub status: Option<String>,
    pub config: Option<WorkflowConfig>,
}

/// GET /v1/organizations/{org}/workflows
pub async fn list_workflows(
    State(state): State<Arc<RwLock<MockState>>>,
    Path(org): Path<String>,
) -> Response {
    let state = state.read().await;
    if let Some(response) = unknown_org(&state, &org) {
        return response;
    }

    let workflows: Vec<Workflow> = state.workflows.values().cloned().collect();
    (StatusCode::OK, Json(workflows)).into_response()
}

/// POST /v1/organizations/{org}/workflows
pub async fn create_workflow(
    State(state): State<Arc<RwLock<MockState>>>,
    Path(org): Path<String>,
    Json(body): Json<CreateWorkflowBody>,
) -> Response {
    let mut state = state.write().await;
    if let Some(response) = unknown_org(&state, &org) {
        return response;
    }

    if body.name.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "name is required".to_string());
    }

    let workflow = state.create_workflow(body.name, body.workflow_type, body.status, body.config);
    (StatusCode::CREATED, Json(workflow)).into_response()
}

/// GET /v1/organizations/{org}/workflows/{id}
pub async fn get_workflow(
    State(state): State<Arc<RwLock<MockState>>>,
    Path((org, id)): Path<(String, String)>,
) -> Response {
    let state = state.read().await;
    if let Some(response) = unknown_org(&state, &org) {
        return response;
    }

    match state.workflows.get(&id) {
        Some(workflow) => (StatusCode::OK, Json(workflow.clone())).into_response(),
        None => workflow_not_found(&id),
    }
}

/// PATCH /v1/organizations/{org}/workflows/{id}
pub async fn update_workflow(
    State(state): State<Arc<RwLock<MockState>>>,
    Path((org, id)): Path<(String, String)>,
    Json(body): Json<PatchWorkflowBody>,
) -> Response {
    let mut state = state.write().await;
    if let Some(response) = unknown_org(&state, &org) {
        return response;
    }

    match state.update_workflow(&id, body.name, body.status, body.config) {
        Some(workflow) => (StatusCode::OK, Json(workflow.clone())).into_response(),
        None => workflow_not_found(&id),
    }
}

/// DELETE /v1/organizations/{org}/workflows/{id}
pub async fn delete_workflow(
    State(state): State<Arc<RwLock<MockState>>>,
    Path((org, id)): Path<(String, String)>,
) -> Response {
    let mut state = state.write().await;
    if let Some(response) = unknown_org(&state, &org) {
        return response;
    }

    if state.delete_workflow(&id) {
        StatusCode::NO_CONTENT.into_response()
    } else {
        workflow_not_found(&id)
    }
}

fn workflow_not_found(id: &str) -> Response {
    error_response(
        StatusCode::NOT_FOUND,
        format!("No workflow found with ID: {id}"),
    )
}
