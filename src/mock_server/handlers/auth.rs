//! OAuth2 token endpoint and bearer checks.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Form, Json,
};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::error_response;
use crate::mock_server::state::{MockState, MOCK_ACCESS_TOKEN};

/// Form fields of a client-credentials request.
#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub grant_type: String,
    pub client_id: String,
    pub client_secret: String,
    #[allow(dead_code)] // accepted but not checked by the mock
    pub audience: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: u64,
}

/// POST /oauth/token
pub async fn issue_token(
    State(state): State<Arc<RwLock<MockState>>>,
    Form(request): Form<TokenRequest>,
) -> Response {
    let mut state = state.write().await;

    if request.grant_type != "client_credentials" {
        return error_response(
            StatusCode::BAD_REQUEST,
            format!("unsupported grant_type: {}", request.grant_type),
        );
    }

    if !state.accepts_credentials(&request.client_id, &request.client_secret) {
        return error_response(StatusCode::UNAUTHORIZED, "invalid client".to_string());
    }

    state.tokens_issued += 1;
    (
        StatusCode::OK,
        Json(TokenResponse {
            access_token: MOCK_ACCESS_TOKEN.to_string(),
            token_type: "Bearer",
            expires_in: state.token_lifetime_secs,
        }),
    )
        .into_response()
}

/// Middleware for organization routes: counts requests, replays injected
/// failures and rejects requests without the issued bearer token.
pub async fn require_token(
    State(state): State<Arc<RwLock<MockState>>>,
    request: Request,
    next: Next,
) -> Response {
    {
        let mut state = state.write().await;
        state.requests += 1;
        if state.pending_failures > 0 {
            state.pending_failures -= 1;
            return error_response(
                StatusCode::SERVICE_UNAVAILABLE,
                "injected failure".to_string(),
            );
        }
    }

    let expected = format!("Bearer {MOCK_ACCESS_TOKEN}");
    let authorized = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == expected);

    if !authorized {
        return error_response(
            StatusCode::UNAUTHORIZED,
            "missing or invalid bearer token".to_string(),
        );
    }

    next.run(request).await
}
