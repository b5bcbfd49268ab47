//! Mock Upwind API server for E2E testing.
//!
//! An axum server holding Upwind resources in memory, with its own
//! client-credentials token endpoint. Writes are visible to later reads, and
//! request counters plus injected 503s let tests check retry and token
//! behaviour against real HTTP.
//!
//! # Example
//!
//! ```ignore
//! use tokio_util::sync::CancellationToken;
//! use upwind::mock_server::MockServer;
//! use upwind::{Get, UpwindClient, Workflow};
//!
//! #[tokio::test]
//! async fn test_workflow() {
//!     let server = MockServer::start().await;
//!     let client = UpwindClient::new(server.config().await).unwrap();
//!
//!     let cancel = CancellationToken::new();
//!     let workflow = Workflow::get(&client, "wf-seed".to_string(), &cancel).await.unwrap();
//!     assert_eq!(workflow.name, "Critical findings to Slack");
//!
//!     server.shutdown().await;
//! }
//! ```

mod fixtures;
mod handlers;
mod server;
mod state;

pub use fixtures::{DefaultScenario, Fixtures};
pub use server::MockServer;
pub use state::{MockState, MOCK_ACCESS_TOKEN};
