//! HTTP request handlers for the mock server.

pub mod auth;
pub mod threats;
pub mod vulnerabilities;
pub mod workflows;

pub use auth::*;
pub use threats::*;
pub use vulnerabilities::*;
pub use workflows::*;

use axum::{http::StatusCode, response::IntoResponse, response::Response, Json};

/// JSON error body with the given status.
pub(crate) fn error_response(status: StatusCode, message: String) -> Response {
    (
        status,
        Json(serde_json::json!({
            "error": status.canonical_reason().unwrap_or("error"),
            "message": message
        })),
    )
        .into_response()
}

/// 404 unless `org` is the organization the mock serves.
pub(crate) fn unknown_org(state: &crate::mock_server::MockState, org: &str) -> Option<Response> {
    (org != state.organization_id).then(|| {
        error_response(
            StatusCode::NOT_FOUND,
            format!("No organization found with ID: {org}"),
        )
    })
}
