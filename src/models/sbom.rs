//! SBOM packages.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::client::UpwindClient;
use crate::error::Result;
use crate::pagination::{Endpoint, PageCursor};
use crate::traits::{Get, List};

const ENTITY: &str = "SBOM package";
const PATH: &str = "sbom-packages";

/// A package seen across the organization's images.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SbomPackage {
    pub name: String,

    #[serde(default)]
    pub version: String,

    #[serde(default)]
    pub package_manager: Option<String>,

    #[serde(default)]
    pub framework: Option<String>,

    #[serde(default)]
    pub licenses: Vec<String>,

    #[serde(default)]
    pub vulnerabilities_summary: Option<VulnerabilitiesSummary>,

    #[serde(default)]
    pub resources_summary: Option<ResourcesSummary>,

    #[serde(default)]
    pub images_summary: Option<ImagesSummary>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VulnerabilitiesSummary {
    #[serde(default)]
    pub critical_count: u64,
    #[serde(default)]
    pub high_count: u64,
    #[serde(default)]
    pub medium_count: u64,
    #[serde(default)]
    pub low_count: u64,
    #[serde(default)]
    pub unclassified_count: u64,
    #[serde(default)]
    pub total_count: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourcesSummary {
    #[serde(default)]
    pub in_use_count: u64,
    #[serde(default)]
    pub total_count: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImagesSummary {
    #[serde(default)]
    pub affected_count: u64,
}

impl SbomPackage {
    /// Total known vulnerabilities (0 if no summary was returned).
    pub fn vulnerability_count(&self) -> u64 {
        self.vulnerabilities_summary
            .as_ref()
            .map(|s| s.total_count)
            .unwrap_or(0)
    }
}

/// Filters for listing SBOM packages.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct SbomPackageQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cloud_account_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub framework: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub package_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub package_manager: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub package_license: Option<String>,
}

#[async_trait]
impl Get for SbomPackage {
    /// Package name and version.
    type Id = (String, String);

    #[tracing::instrument(skip(client, cancel))]
    async fn get(
        client: &UpwindClient,
        id: (String, String),
        cancel: &CancellationToken,
    ) -> Result<Self> {
        let (name, version) = id;
        let path = format!(
            "{PATH}/{}/{}",
            urlencoding::encode(&name),
            urlencoding::encode(&version)
        );
        client.get_json(ENTITY, &path, &(), cancel).await
    }
}

#[async_trait]
impl List for SbomPackage {
    type Query = SbomPackageQuery;

    fn endpoint(_client: &UpwindClient, query: &Self::Query) -> Result<(Endpoint, PageCursor)> {
        let endpoint = Endpoint::new(PATH, ENTITY).with_query(query)?;
        Ok((endpoint, PageCursor::Unpaged))
    }
}
