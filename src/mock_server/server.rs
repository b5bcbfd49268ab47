//! Mock Upwind API server.
//!
//! Provides an axum-based HTTP server that simulates the Upwind API.

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use super::fixtures::Fixtures;
use super::handlers;
use super::state::MockState;
use crate::Config;

/// A mock Upwind API server for testing.
///
/// The server runs in the background and can be used to test the Upwind
/// client against a realistic API implementation.
pub struct MockServer {
    /// `http://127.0.0.1:{port}`.
    url: String,
    /// Background axum task.
    handle: JoinHandle<()>,
    /// Data and counters, shared with the handlers.
    state: Arc<RwLock<MockState>>,
}

impl MockServer {
    /// Serve [`Fixtures::default_scenario`] on an ephemeral port.
    pub async fn start() -> Self {
        Self::with_state(Fixtures::default_scenario().into_state()).await
    }

    /// Serve an organization with no data.
    pub async fn start_empty() -> Self {
        Self::with_state(MockState::new()).await
    }

    /// Serve `state` on an ephemeral port.
    pub async fn with_state(state: MockState) -> Self {
        let shared_state = state.shared();
        let app = Self::create_router(shared_state.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to address");
        let addr = listener.local_addr().expect("Failed to get local address");

        let handle = tokio::spawn(async move {
            axum::serve(listener, app)
                .await
                .expect("Server error");
        });

        Self {
            url: format!("http://{}", addr),
            handle,
            state: shared_state,
        }
    }

    /// Server root, without the `/v1` prefix.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Client configuration pointing at this server.
    ///
    /// Uses the server's credentials and organization, HTTP/1.1, no client
    /// side rate limit and a short retry budget.
    pub async fn config(&self) -> Config {
        let state = self.state.read().await;
        Config {
            client_id: state.client_id.clone(),
            client_secret: state.client_secret.clone(),
            organization_id: state.organization_id.clone(),
            base_url: Some(format!("{}/v1", self.url)),
            token_url: Some(format!("{}/oauth/token", self.url)),
            max_retries: 2,
            rate_limit_per_second: 0,
            disable_http2: true,
            ..Default::default()
        }
    }

    /// Live state, for seeding data or asserting on counters mid-test.
    pub fn state(&self) -> Arc<RwLock<MockState>> {
        self.state.clone()
    }

    /// Shutdown the server.
    ///
    /// Aborts the serving task and waits for it to finish.
    pub async fn shutdown(self) {
        self.handle.abort();
        let _ = self.handle.await;
    }

    fn create_router(state: Arc<RwLock<MockState>>) -> Router {
        let org_routes = Router::new()
            // Vulnerability finding routes
            .route(
                "/v1/organizations/:org/vulnerability-findings",
                get(handlers::list_vulnerability_findings),
            )
            .route(
                "/v1/organizations/:org/vulnerability-findings/:id",
                get(handlers::get_vulnerability_finding),
            )
            // Threat routes
            .route(
                "/v1/organizations/:org/threat-events",
                get(handlers::list_threat_events),
            )
            .route(
                "/v1/organizations/:org/threat-detections",
                get(handlers::list_threat_detections),
            )
            .route(
                "/v1/organizations/:org/threat-detections/:id",
                get(handlers::get_threat_detection).patch(handlers::update_threat_detection),
            )
            // Workflow routes
            .route(
                "/v1/organizations/:org/workflows",
                get(handlers::list_workflows).post(handlers::create_workflow),
            )
            .route(
                "/v1/organizations/:org/workflows/:id",
                get(handlers::get_workflow)
                    .patch(handlers::update_workflow)
                    .delete(handlers::delete_workflow),
            )
            .route_layer(middleware::from_fn_with_state(
                state.clone(),
                handlers::require_token,
            ));

        Router::new()
            .merge(org_routes)
            .route("/oauth/token", post(handlers::issue_token))
            // Health check
            .route("/health", get(health_check))
            .with_state(state)
    }
}

/// GET /health, outside the authenticated routes.
async fn health_check() -> &'static str {
    "ok"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Get, List, UpwindClient, UpwindError, Workflow};
    use tokio_util::sync::CancellationToken;

    #[tokio::test]
    async fn test_health_needs_no_token() {
        let server = MockServer::start().await;

        let body = reqwest::get(format!("{}/health", server.url()))
            .await
            .and_then(|r| r.error_for_status())
            .expect("health check failed")
            .text()
            .await
            .unwrap();

        assert_eq!(body, "ok");
        assert_eq!(server.state().read().await.requests, 0);

        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_org_routes_require_token() {
        let server = MockServer::start().await;

        let response = reqwest::Client::new()
            .get(format!("{}/v1/organizations/org-test/workflows", server.url()))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), reqwest::StatusCode::UNAUTHORIZED);

        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_get_workflow_with_upwind_client() {
        let server = MockServer::start().await;
        let client = UpwindClient::new(server.config().await).unwrap();
        let cancel = CancellationToken::new();

        let workflow = Workflow::get(&client, "wf-seed".to_string(), &cancel)
            .await
            .expect("Failed to get workflow");

        assert_eq!(workflow.name, "Critical findings to Slack");

        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_list_workflows_with_upwind_client() {
        let server = MockServer::start().await;
        let client = UpwindClient::new(server.config().await).unwrap();
        let cancel = CancellationToken::new();

        let workflows = Workflow::list_all(&client, &(), &cancel)
            .await
            .expect("Failed to list workflows");

        assert_eq!(workflows.len(), 1);
        assert_eq!(workflows[0].id, "wf-seed");

        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_empty_server_has_no_workflows() {
        let server = MockServer::start_empty().await;
        let client = UpwindClient::new(server.config().await).unwrap();
        let cancel = CancellationToken::new();

        let result = Workflow::get(&client, "nonexistent".to_string(), &cancel).await;

        assert!(matches!(result, Err(UpwindError::NotFound { .. })));

        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_seeded_workflow_is_served() {
        let state = MockState::new().with_workflow(Fixtures::workflow("wf-custom", "Custom"));

        let server = MockServer::with_state(state).await;
        let client = UpwindClient::new(server.config().await).unwrap();
        let cancel = CancellationToken::new();

        let workflow = Workflow::get(&client, "wf-custom".to_string(), &cancel)
            .await
            .expect("Failed to get workflow");

        assert_eq!(workflow.name, "Custom");

        server.shutdown().await;
    }
}
