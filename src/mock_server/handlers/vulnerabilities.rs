//! Vulnerability finding endpoint handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header::LINK, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use tokio::sync::RwLock;

use super::{error_response, unknown_org};
use crate::mock_server::state::MockState;

const DEFAULT_PER_PAGE: usize = 100;

/// Query parameters for listing vulnerability findings.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ListFindingsQuery {
    pub page_token: Option<String>,
    pub per_page: Option<usize>,
    /// Comma-separated severities.
    pub severity: Option<String>,
}

/// GET /v1/organizations/{org}/vulnerability-findings
///
/// Cursor paginated: the next page is advertised in a `Link` header.
pub async fn list_vulnerability_findings(
    State(state): State<Arc<RwLock<MockState>>>,
    Path(org): Path<String>,
    Query(query): Query<ListFindingsQuery>,
    uri: Uri,
) -> Response {
    let state = state.read().await;
    if let Some(response) = unknown_org(&state, &org) {
        return response;
    }

    let per_page = query.per_page.unwrap_or(DEFAULT_PER_PAGE);
    let severities: Vec<String> = query
        .severity
        .as_deref()
        .map(|s| s.split(',').map(str::to_string).collect())
        .unwrap_or_default();

    let Some((findings, next)) =
        state.vulnerability_page(&severities, query.page_token.as_deref(), per_page)
    else {
        return error_response(
            StatusCode::BAD_REQUEST,
            "invalid page-token".to_string(),
        );
    };

    match next {
        Some(token) => {
            let link = format!(
                "<{}?page-token={}&per-page={}>; rel=\"next\"",
                uri.path(),
                token,
                per_page
            );
            (StatusCode::OK, [(LINK, link)], Json(findings)).into_response()
        }
        None => (StatusCode::OK, Json(findings)).into_response(),
    }
}

/// GET /v1/organizations/{org}/vulnerability-findings/{id}
pub async fn get_vulnerability_finding(
    State(state): State<Arc<RwLock<MockState>>>,
    Path((org, id)): Path<(String, String)>,
) -> Response {
    let state = state.read().await;
    if let Some(response) = unknown_org(&state, &org) {
        return response;
    }

    match state.get_vulnerability_finding(&id) {
        Some(finding) => (StatusCode::OK, Json(finding.clone())).into_response(),
        None => error_response(
            StatusCode::NOT_FOUND,
            format!("No vulnerability finding found with ID: {id}"),
        ),
    }
}
