//! Threat event and detection endpoint handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use tokio::sync::RwLock;

use super::{error_response, unknown_org};
use crate::mock_server::state::MockState;
use crate::ThreatDetection;

const DEFAULT_PER_PAGE: usize = 100;

/// Query parameters for listing threat events.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ListEventsQuery {
    pub page: Option<usize>,
    pub per_page: Option<usize>,
}

/// Query parameters for listing threat detections.
#[derive(Debug, Default, Deserialize)]
pub struct ListDetectionsQuery {
    pub severity: Option<String>,
    pub category: Option<String>,
}

/// Body of a detection PATCH.
#[derive(Debug, Default, Deserialize)]
pub struct PatchDetectionBody {
    pub status: Option<String>,
    pub severity: Option<String>,
}

/// GET /v1/organizations/{org}/threat-events
///
/// Offset paginated with 1-indexed `page`; an empty array past the end.
pub async fn list_threat_events(
    State(state): State<Arc<RwLock<MockState>>>,
    Path(org): Path<String>,
    Query(query): Query<ListEventsQuery>,
) -> Response {
    let state = state.read().await;
    if let Some(response) = unknown_org(&state, &org) {
        return response;
    }

    let page = query.page.unwrap_or(1);
    let per_page = query.per_page.unwrap_or(DEFAULT_PER_PAGE);
    (StatusCode::OK, Json(state.threat_event_page(page, per_page))).into_response()
}

/// GET /v1/organizations/{org}/threat-detections
pub async fn list_threat_detections(
    State(state): State<Arc<RwLock<MockState>>>,
    Path(org): Path<String>,
    Query(query): Query<ListDetectionsQuery>,
) -> Response {
    let state = state.read().await;
    if let Some(response) = unknown_org(&state, &org) {
        return response;
    }

    let matches = |value: &str, filter: &Option<String>| {
        filter
            .as_deref()
            .map(|f| f.eq_ignore_ascii_case(value))
            .unwrap_or(true)
    };

    let detections: Vec<ThreatDetection> = state
        .threat_detections
        .values()
        .filter(|d| matches(&d.severity, &query.severity) && matches(&d.category, &query.category))
        .cloned()
        .collect();

    (StatusCode::OK, Json(detections)).into_response()
}

/// GET /v1/organizations/{org}/threat-detections/{id}
pub async fn get_threat_detection(
    State(state): State<Arc<RwLock<MockState>>>,
    Path((org, id)): Path<(String, String)>,
) -> Response {
    let state = state.read().await;
    if let Some(response) = unknown_org(&state, &org) {
        return response;
    }

    match state.threat_detections.get(&id) {
        Some(detection) => (StatusCode::OK, Json(detection.clone())).into_response(),
        None => detection_not_found(&id),
    }
}

/// PATCH /v1/organizations/{org}/threat-detections/{id}
pub async fn update_threat_detection(
    State(state): State<Arc<RwLock<MockState>>>,
    Path((org, id)): Path<(String, String)>,
    Json(body): Json<PatchDetectionBody>,
) -> Response {
    let mut state = state.write().await;
    if let Some(response) = unknown_org(&state, &org) {
        return response;
    }

    match state.update_threat_detection(&id, body.status, body.severity) {
        Some(detection) => (StatusCode::OK, Json(detection.clone())).into_response(),
        None => detection_not_found(&id),
    }
}

fn detection_not_found(id: &str) -> Response {
    error_response(
        StatusCode::NOT_FOUND,
        format!("No threat detection found with ID: {id}"),
    )
}
