//! Shared helpers for wiremock-based integration tests.

#![allow(dead_code)]

use upwind::{Config, UpwindClient};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const ORG: &str = "org-123";
pub const TOKEN: &str = "test-token";

/// Organization-scoped path on the mock server.
pub fn org_path(resource: &str) -> String {
    format!("/v1/organizations/{ORG}/{resource}")
}

/// Mount a token endpoint issuing [`TOKEN`] valid for an hour.
pub async fn mount_token(server: &MockServer) {
    mount_token_with_lifetime(server, 3600).await;
}

pub async fn mount_token_with_lifetime(server: &MockServer, expires_in: u64) {
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": TOKEN,
            "token_type": "Bearer",
            "expires_in": expires_in
        })))
        .mount(server)
        .await;
}

/// Configuration pointing both the API and the token endpoint at `server`.
pub fn test_config(server: &MockServer) -> Config {
    Config {
        client_id: "test-client".to_string(),
        client_secret: "test-secret".to_string(),
        organization_id: ORG.to_string(),
        base_url: Some(format!("{}/v1", server.uri())),
        token_url: Some(format!("{}/oauth/token", server.uri())),
        rate_limit_per_second: 0,
        disable_http2: true,
        ..Default::default()
    }
}

pub fn test_client(server: &MockServer) -> UpwindClient {
    UpwindClient::new(test_config(server)).expect("valid test config")
}

/// `count` minimal JSON entities with IDs `{prefix}-{offset + i}`.
pub fn items(prefix: &str, offset: usize, count: usize) -> serde_json::Value {
    (offset..offset + count)
        .map(|i| serde_json::json!({ "id": format!("{prefix}-{i}") }))
        .collect()
}
