//! Integration webhooks.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::client::UpwindClient;
use crate::error::Result;
use crate::pagination::{Endpoint, PageCursor};
use crate::traits::{Create, Delete, List, Update};

const ENTITY: &str = "integration webhook";
const PATH: &str = "integration-webhooks";

/// A webhook delivering events to a third-party vendor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrationWebhook {
    pub id: String,

    #[serde(default)]
    pub name: String,

    /// e.g. "SLACK", "PAGERDUTY", "JIRA".
    #[serde(default)]
    pub vendor: String,

    #[serde(default)]
    pub status: String,

    /// Vendor-specific settings.
    #[serde(default)]
    pub config: serde_json::Map<String, serde_json::Value>,

    #[serde(default)]
    pub create_time: Option<DateTime<Utc>>,

    #[serde(default)]
    pub update_time: Option<DateTime<Utc>>,
}

/// Filters for listing webhooks.
#[derive(Debug, Clone, Default, Serialize)]
pub struct WebhookQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
}

/// Body of a webhook create request.
#[derive(Debug, Clone, Default, Serialize)]
pub struct WebhookCreate {
    pub name: String,

    pub vendor: String,

    #[serde(skip_serializing_if = "serde_json::Map::is_empty")]
    pub config: serde_json::Map<String, serde_json::Value>,

    /// Additional fields sent as-is.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Fields to change on a webhook.
#[derive(Debug, Clone, Default, Serialize)]
pub struct WebhookUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<serde_json::Map<String, serde_json::Value>>,

    /// Additional fields sent as-is.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

fn item_path(id: &str) -> String {
    format!("{PATH}/{}", urlencoding::encode(id))
}

#[async_trait]
impl List for IntegrationWebhook {
    type Query = WebhookQuery;

    fn endpoint(_client: &UpwindClient, query: &Self::Query) -> Result<(Endpoint, PageCursor)> {
        let endpoint = Endpoint::new(PATH, ENTITY).with_query(query)?;
        Ok((endpoint, PageCursor::Unpaged))
    }
}

#[async_trait]
impl Create for IntegrationWebhook {
    type Params = WebhookCreate;

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
impl Update for IntegrationWebhook {
    type Id = String;
    type Params = WebhookUpdate;

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
impl Delete for IntegrationWebhook {
    type Id = String;

    #[tracing::instrument(skip(client, cancel))]
    async fn delete(client: &UpwindClient, id: String, cancel: &CancellationToken) -> Result<()> {
        client.delete(ENTITY, &item_path(&id), cancel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_create_body_omits_empty_config() {
        let body = WebhookCreate {
            name: "sec-alerts".to_string(),
            vendor: "SLACK".to_string(),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({"name": "sec-alerts", "vendor": "SLACK"})
        );
    }

    #[test]
    fn test_deserialize_webhook() {
        let webhook: IntegrationWebhook = serde_json::from_str(
            r#"{"id": "wh-1", "name": "alerts", "vendor": "SLACK", "status": "ENABLED",
                "config": {"url": "https://hooks.slack.com/x"}}"#,
        )
        .unwrap();
        assert_eq!(webhook.config["url"], "https://hooks.slack.com/x");
        assert!(webhook.create_time.is_none());
    }
}
