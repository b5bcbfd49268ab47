//! API security endpoints discovered from traffic.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::client::UpwindClient;
use crate::error::Result;
use crate::pagination::{Endpoint, PageCursor};
use crate::traits::List;

const ENTITY: &str = "API endpoint";
const PATH: &str = "apisecurity-endpoints";

/// An HTTP endpoint observed on a resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEndpoint {
    pub id: String,

    #[serde(default)]
    pub method: String,

    #[serde(default)]
    pub uri: String,

    #[serde(default)]
    pub resource_id: String,

    #[serde(default)]
    pub first_seen_time: Option<DateTime<Utc>>,

    #[serde(default)]
    pub last_seen_time: Option<DateTime<Utc>>,

    #[serde(default)]
    pub domains: Vec<String>,

    #[serde(default)]
    pub status_codes: Vec<String>,

    #[serde(default)]
    pub risk_overview: Option<RiskOverview>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RiskOverview {
    #[serde(default)]
    pub authentication: Option<Authentication>,
    #[serde(default)]
    pub internet_exposure: Option<EndpointExposure>,
    #[serde(default)]
    pub sensitive_data_findings: Vec<SensitiveDataFinding>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Authentication {
    /// e.g. "AUTHENTICATED", "UNAUTHENTICATED".
    #[serde(default)]
    pub state: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EndpointExposure {
    #[serde(default)]
    pub ingress: Option<ExposureDetails>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExposureDetails {
    #[serde(default)]
    pub last_seen_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SensitiveDataFinding {
    #[serde(rename = "type", default)]
    pub data_type: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub last_seen_time: Option<DateTime<Utc>>,
}

impl ApiEndpoint {
    /// Authentication state, if the endpoint has been classified.
    pub fn auth_state(&self) -> Option<&str> {
        self.risk_overview
            .as_ref()?
            .authentication
            .as_ref()
            .map(|a| a.state.as_str())
    }

    /// Whether the endpoint receives traffic from the internet.
    pub fn is_internet_facing(&self) -> bool {
        self.risk_overview
            .as_ref()
            .and_then(|r| r.internet_exposure.as_ref())
            .and_then(|e| e.ingress.as_ref())
            .is_some()
    }
}

/// Filters for listing API endpoints.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ApiEndpointQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub authentication_state: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_internet_ingress: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_vulnerability: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_sensitive_data: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cloud_account_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cloud_provider: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cloud_organization_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cloud_organization_unit_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    /// Page size (defaults to the client's page size).
    #[serde(skip)]
    pub per_page: Option<u32>,

    /// Resume from a previously returned page token.
    #[serde(skip)]
    pub page_token: Option<String>,
}

#[async_trait]
impl List for ApiEndpoint {
    type Query = ApiEndpointQuery;

    fn endpoint(client: &UpwindClient, query: &Self::Query) -> Result<(Endpoint, PageCursor)> {
        let endpoint = Endpoint::new(PATH, ENTITY).with_query(query)?;
        let cursor = PageCursor::Cursor {
            token: query.page_token.clone(),
            per_page: Some(query.per_page.unwrap_or_else(|| client.page_size())),
        };
        Ok((endpoint, cursor))
    }
}
