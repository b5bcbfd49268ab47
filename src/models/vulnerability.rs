//! Vulnerability findings.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::client::UpwindClient;
use crate::error::Result;
use crate::models::common::{Image, Package, Resource};
use crate::pagination::{Endpoint, PageCursor};
use crate::traits::{Get, List};

const ENTITY: &str = "vulnerability finding";
const PATH: &str = "vulnerability-findings";

/// A vulnerable package found in an image running on a resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VulnerabilityFinding {
    pub id: String,

    /// Finding status (e.g., "OPEN", "ARCHIVED").
    #[serde(default)]
    pub status: String,

    #[serde(default)]
    pub source: Option<String>,

    #[serde(default)]
    pub first_seen_time: Option<DateTime<Utc>>,

    #[serde(default)]
    pub last_scan_time: Option<DateTime<Utc>>,

    #[serde(default)]
    pub vulnerability: Option<Vulnerability>,

    #[serde(default)]
    pub image: Option<Image>,

    #[serde(default)]
    pub package: Option<Package>,

    #[serde(default)]
    pub resource: Option<Resource>,

    #[serde(default)]
    pub remediation: Vec<Remediation>,
}

/// CVE details of a finding.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Vulnerability {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    /// Whether a known exploit exists.
    #[serde(default)]
    pub exploitable: bool,

    #[serde(default)]
    pub nvd_cve_id: Option<String>,

    #[serde(default)]
    pub nvd_description: Option<String>,

    #[serde(default)]
    pub nvd_publish_time: Option<DateTime<Utc>>,

    #[serde(default)]
    pub cve_first_seen_time: Option<DateTime<Utc>>,

    #[serde(default)]
    pub nvd_cvss_v2_severity: Option<String>,

    #[serde(default)]
    pub nvd_cvss_v2_score: Option<String>,

    #[serde(default)]
    pub nvd_cvss_v3_severity: Option<String>,

    #[serde(default)]
    pub nvd_cvss_v3_score: Option<String>,

    #[serde(default)]
    pub nvd_cvss_v4_severity: Option<String>,

    #[serde(default)]
    pub nvd_cvss_v4_score: Option<String>,

    #[serde(default)]
    pub impact_metrics: Option<ImpactMetrics>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImpactMetrics {
    #[serde(default)]
    pub affected_resource_count: u64,
    #[serde(default)]
    pub affected_image_count: u64,
}

/// A remediation hint. The shape of `data` depends on `remediation_type`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Remediation {
    #[serde(rename = "type")]
    pub remediation_type: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl VulnerabilityFinding {
    /// CVE identifier, falling back to the vulnerability name.
    pub fn cve(&self) -> Option<&str> {
        let vuln = self.vulnerability.as_ref()?;
        vuln.nvd_cve_id.as_deref().or(vuln.name.as_deref())
    }

    /// Most specific CVSS severity available (v4, then v3, then v2).
    pub fn severity(&self) -> Option<&str> {
        let vuln = self.vulnerability.as_ref()?;
        vuln.nvd_cvss_v4_severity
            .as_deref()
            .or(vuln.nvd_cvss_v3_severity.as_deref())
            .or(vuln.nvd_cvss_v2_severity.as_deref())
    }

    pub fn is_exploitable(&self) -> bool {
        self.vulnerability
            .as_ref()
            .map(|v| v.exploitable)
            .unwrap_or(false)
    }
}

/// Filters for listing vulnerability findings.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct VulnerabilityFindingQuery {
    /// Filter by severity; several values are OR-ed.
    pub severity: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_use: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ingress_active_communication: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub internet_exposure: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub exploitable: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub fix_available: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cloud_account_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub framework: Option<String>,

    /// Page size; the server default applies when unset.
    #[serde(skip)]
    pub per_page: Option<u32>,
}

#[async_trait]
impl Get for VulnerabilityFinding {
    type Id = String;

    #[tracing::instrument(skip(client, cancel))]
    async fn get(client: &UpwindClient, id: String, cancel: &CancellationToken) -> Result<Self> {
        let path = format!("{PATH}/{}", urlencoding::encode(&id));
        client.get_json(ENTITY, &path, &(), cancel).await
    }
}

#[async_trait]
impl List for VulnerabilityFinding {
    type Query = VulnerabilityFindingQuery;

    fn endpoint(_client: &UpwindClient, query: &Self::Query) -> Result<(Endpoint, PageCursor)> {
        let endpoint = Endpoint::new(PATH, ENTITY).with_query(query)?;
        Ok((endpoint, PageCursor::first_cursor(query.per_page)))
    }
}
