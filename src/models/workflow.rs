//! Automation workflows.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::client::UpwindClient;
use crate::error::Result;
use crate::pagination::{Endpoint, PageCursor};
use crate::traits::{Create, Delete, Get, List, Update};

const ENTITY: &str = "workflow";
const PATH: &str = "workflows";

/// Selector or action definition; the key set depends on its `type`.
pub type WorkflowRule = serde_json::Map<String, serde_json::Value>;

/// An automation that reacts to findings or detections.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(rename = "type", default)]
    pub workflow_type: String,

    #[serde(default)]
    pub status: String,

    #[serde(default)]
    pub last_execution_time: Option<DateTime<Utc>>,

    #[serde(default)]
    pub config: Option<WorkflowConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowConfig {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub selectors: Vec<WorkflowRule>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<WorkflowRule>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger: Option<WorkflowTrigger>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowTrigger {
    #[serde(rename = "type")]
    pub trigger_type: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub severities: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<String>,
}

/// Body of a workflow create request.
#[derive(Debug, Clone, Default, Serialize)]
pub struct WorkflowCreate {
    pub name: String,

    #[serde(rename = "type")]
    pub workflow_type: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<WorkflowConfig>,

    /// Additional fields sent as-is.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Fields to change on a workflow.
#[derive(Debug, Clone, Default, Serialize)]
pub struct WorkflowUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<WorkflowConfig>,

    /// Additional fields sent as-is.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

fn item_path(id: &str) -> String {
    format!("{PATH}/{}", urlencoding::encode(id))
}

#[async_trait]
impl Get for Workflow {
    type Id = String;

    #[tracing::instrument(skip(client, cancel))]
    async fn get(client: &UpwindClient, id: String, cancel: &CancellationToken) -> Result<Self> {
        client.get_json(ENTITY, &item_path(&id), &(), cancel).await
    }
}

#[async_trait]
impl List for Workflow {
    type Query = ();

    fn endpoint(_client: &UpwindClient, _query: &()) -> Result<(Endpoint, PageCursor)> {
        Ok((Endpoint::new(PATH, ENTITY), PageCursor::Unpaged))
    }
}

#[async_trait]
impl Create for Workflow {
    type Params = WorkflowCreate;

    #[tracing::instrument(skip(client, cancel))]
    async fn create(
        client: &UpwindClient,
        params: Self::Params,
        cancel: &CancellationToken,
    ) -> Result<Self> {
        client
            .send_json(Method::POST, ENTITY, PATH, &params, StatusCode::CREATED, cancel)
            .await
    }
}

#[async_trait]
impl Update for Workflow {
    type Id = String;
    type Params = WorkflowUpdate;

    #[tracing::instrument(skip(client, cancel))]
    async fn update(
        client: &UpwindClient,
        id: String,
        params: Self::Params,
        cancel: &CancellationToken,
    ) -> Result<Self> {
        client
            .send_json(
                Method::PATCH,
                ENTITY,
                &item_path(&id),
                &params,
                StatusCode::OK,
                cancel,
            )
            .await
    }
}

#[async_trait]
impl Delete for Workflow {
    type Id = String;

    #[tracing::instrument(skip(client, cancel))]
    async fn delete(client: &UpwindClient, id: String, cancel: &CancellationToken) -> Result<()> {
        client.delete(ENTITY, &item_path(&id), cancel).await
    }
}
