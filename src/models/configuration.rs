//! Configuration (posture) findings.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::client::UpwindClient;
use crate::error::Result;
use crate::models::common::Resource;
use crate::pagination::{Endpoint, PageCursor};
use crate::traits::{Get, List};

const ENTITY: &str = "configuration finding";
const PATH: &str = "configuration-findings";

/// A failed (or passed) compliance check on a resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigurationFinding {
    pub id: String,

    #[serde(default)]
    pub status: String,

    #[serde(default)]
    pub severity: String,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub first_seen_time: Option<DateTime<Utc>>,

    #[serde(default)]
    pub last_seen_time: Option<DateTime<Utc>>,

    #[serde(default)]
    pub last_sync_time: Option<DateTime<Utc>>,

    #[serde(default)]
    pub framework: Option<ConfigurationFramework>,

    #[serde(default)]
    pub check: Option<ConfigurationCheck>,

    #[serde(default)]
    pub resource: Option<Resource>,
}

/// A compliance framework (e.g., CIS, SOC 2).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigurationFramework {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub revision: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub cloud_provider: Option<String>,
    #[serde(default)]
    pub create_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub update_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_scan_time: Option<DateTime<Utc>>,
    #[serde(rename = "type", default)]
    pub framework_type: Option<String>,
    #[serde(default)]
    pub compliance_status: Option<ComplianceStatus>,
    #[serde(default)]
    pub rollout_state: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComplianceStatus {
    #[serde(default)]
    pub score: u32,
}

/// The check that produced a finding.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigurationCheck {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub remediation: Option<String>,
}

impl ConfigurationFinding {
    pub fn framework_title(&self) -> Option<&str> {
        self.framework.as_ref().map(|f| f.title.as_str())
    }

    pub fn resource_name(&self) -> Option<&str> {
        self.resource.as_ref().map(|r| r.name.as_str())
    }
}

/// Filters for listing configuration findings.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ConfigurationFindingQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_last_seen_time: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_last_seen_time: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub framework_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub framework_title: Option<String>,

    /// `key:value` tag filters.
    pub cloud_account_tags: Vec<String>,

    /// Return each resource's cloud account tags.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub include_cloud_account_tags: bool,
}

/// Fetch a configuration finding, optionally with cloud account tags.
///
/// # Errors
///
/// Returns [`UpwindError::NotFound`](crate::UpwindError::NotFound) if the
/// finding doesn't exist.
#[tracing::instrument(skip(client, cancel))]
pub async fn get_configuration_finding(
    client: &UpwindClient,
    id: &str,
    include_cloud_account_tags: bool,
    cancel: &CancellationToken,
) -> Result<ConfigurationFinding> {
    #[derive(Serialize)]
    struct Params {
        #[serde(
            rename = "include-cloud-account-tags",
            skip_serializing_if = "std::ops::Not::not"
        )]
        include_cloud_account_tags: bool,
    }

    let path = format!("{PATH}/{}", urlencoding::encode(id));
    let params = Params {
        include_cloud_account_tags,
    };
    client.get_json(ENTITY, &path, &params, cancel).await
}

#[async_trait]
impl Get for ConfigurationFinding {
    type Id = String;

    async fn get(client: &UpwindClient, id: String, cancel: &CancellationToken) -> Result<Self> {
        get_configuration_finding(client, &id, false, cancel).await
    }
}

#[async_trait]
impl List for ConfigurationFinding {
    type Query = ConfigurationFindingQuery;

    fn endpoint(_client: &UpwindClient, query: &Self::Query) -> Result<(Endpoint, PageCursor)> {
        let endpoint = Endpoint::new(PATH, ENTITY).with_query(query)?;
        Ok((endpoint, PageCursor::first_cursor(None)))
    }
}
