//! Types shared by several resources.

use serde::{Deserialize, Serialize};

/// Severity levels for findings, detections and events.
pub mod severity {
    pub const LOW: &str = "LOW";
    pub const MEDIUM: &str = "MEDIUM";
    pub const HIGH: &str = "HIGH";
    pub const CRITICAL: &str = "CRITICAL";
}

/// Status values used across resources.
pub mod status {
    pub const OPEN: &str = "OPEN";
    pub const PENDING: &str = "PENDING";
    pub const ARCHIVED: &str = "ARCHIVED";
    pub const PASS: &str = "PASS";
    pub const FAIL: &str = "FAIL";
    pub const ENABLED: &str = "ENABLED";
    pub const DISABLED: &str = "DISABLED";
}

/// Cloud provider identifiers.
pub mod cloud_provider {
    pub const AWS: &str = "AWS";
    pub const GCP: &str = "GCP";
    pub const AZURE: &str = "AZURE";
    pub const BYOC: &str = "BYOC";
}

/// A key-value tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

/// A cloud resource a finding or detection is attached to.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Resource {
    pub id: String,

    #[serde(default)]
    pub external_id: Option<String>,

    #[serde(default)]
    pub name: String,

    /// Resource type (e.g., "KUBERNETES_DEPLOYMENT").
    #[serde(rename = "type", default)]
    pub resource_type: String,

    #[serde(default)]
    pub path: Option<String>,

    #[serde(default)]
    pub cloud_provider: String,

    #[serde(default)]
    pub cloud_account_id: String,

    #[serde(default)]
    pub cloud_account_name: Option<String>,

    /// Only returned when explicitly requested.
    #[serde(default)]
    pub cloud_account_tags: Vec<Tag>,

    #[serde(default)]
    pub region: Option<String>,

    #[serde(default)]
    pub cluster_id: Option<String>,

    #[serde(default)]
    pub namespace: Option<String>,

    #[serde(default)]
    pub internet_exposure: Option<InternetExposure>,

    #[serde(default)]
    pub risk_categories: Vec<String>,
}

/// Internet exposure of a resource.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InternetExposure {
    #[serde(default)]
    pub ingress: Option<InternetExposureDetails>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InternetExposureDetails {
    #[serde(default)]
    pub active_communication: bool,
}

/// Container image information.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Image {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub digest: String,
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub registry: Option<String>,
    #[serde(default)]
    pub repository: Option<String>,
    #[serde(default)]
    pub os_version: Option<String>,
    #[serde(default)]
    pub os_name: Option<String>,
    #[serde(default)]
    pub tag: Option<String>,
}

/// A software package.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Package {
    pub name: String,

    #[serde(default)]
    pub framework: Option<String>,

    #[serde(rename = "type", default)]
    pub package_type: Option<String>,

    #[serde(default)]
    pub version: String,

    /// Whether the package is loaded at runtime.
    #[serde(default)]
    pub in_use: bool,
}

impl Package {
    /// `name@version` form used in output.
    pub fn coordinates(&self) -> String {
        format!("{}@{}", self.name, self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_deserialize_minimal() {
        let resource: Resource = serde_json::from_str(r#"{"id": "r-1"}"#).unwrap();
        assert_eq!(resource.id, "r-1");
        assert!(resource.cloud_account_tags.is_empty());
        assert!(resource.internet_exposure.is_none());
    }

    #[test]
    fn test_resource_deserialize_full() {
        let json = r#"{
            "id": "r-1",
            "name": "api-server",
            "type": "KUBERNETES_DEPLOYMENT",
            "cloud_provider": "AWS",
            "cloud_account_id": "123456789012",
            "cloud_account_tags": [{"key": "env", "value": "prod"}],
            "internet_exposure": {"ingress": {"active_communication": true}}
        }"#;
        let resource: Resource = serde_json::from_str(json).unwrap();
        assert_eq!(resource.resource_type, "KUBERNETES_DEPLOYMENT");
        assert_eq!(resource.cloud_provider, cloud_provider::AWS);
        assert_eq!(
            resource.cloud_account_tags,
            vec![Tag {
                key: "env".to_string(),
                value: "prod".to_string()
            }]
        );
        assert!(
            resource
                .internet_exposure
                .and_then(|e| e.ingress)
                .map(|i| i.active_communication)
                .unwrap_or(false)
        );
    }

    #[test]
    fn test_package_coordinates() {
        let pkg = Package {
            name: "openssl".to_string(),
            version: "3.0.2".to_string(),
            ..Default::default()
        };
        assert_eq!(pkg.coordinates(), "openssl@3.0.2");
    }
}
