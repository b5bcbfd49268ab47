//! Threat detections, threat events and threat policies.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::client::UpwindClient;
use crate::error::Result;
use crate::models::common::{status, Resource};
use crate::pagination::{Endpoint, PageCursor};
use crate::traits::{Get, List, Update};

const DETECTION: &str = "threat detection";
const DETECTIONS_PATH: &str = "threat-detections";
const EVENT: &str = "threat event";
const EVENTS_PATH: &str = "threat-events";
const POLICY: &str = "threat policy";
const POLICIES_PATH: &str = "threat-policies";

/// A runtime threat raised by one or more policies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreatDetection {
    pub id: String,

    #[serde(rename = "type", default)]
    pub detection_type: String,

    #[serde(default)]
    pub category: String,

    #[serde(default)]
    pub severity: String,

    #[serde(default)]
    pub status: String,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub first_seen_time: Option<DateTime<Utc>>,

    #[serde(default)]
    pub last_seen_time: Option<DateTime<Utc>>,

    #[serde(default)]
    pub occurrence_count: u64,

    #[serde(default)]
    pub resource: Option<Resource>,

    #[serde(default)]
    pub mitre_attacks: Vec<MitreAttack>,

    #[serde(default)]
    pub triggers: Vec<ThreatTrigger>,
}

/// A policy that fired for a detection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ThreatTrigger {
    #[serde(default)]
    pub policy_id: String,
    #[serde(default)]
    pub policy_name: String,
    #[serde(default)]
    pub events: Vec<TriggerEvent>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TriggerEvent {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub event_type: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub event_time: Option<DateTime<Utc>>,
    /// Event-type specific payload.
    #[serde(default)]
    pub data: serde_json::Map<String, serde_json::Value>,
}

/// MITRE ATT&CK tactic and technique.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MitreAttack {
    #[serde(default)]
    pub tactic_id: String,
    #[serde(default)]
    pub tactic_name: String,
    #[serde(default)]
    pub technique_id: String,
    #[serde(default)]
    pub technique_name: String,
}

/// A single threat event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreatEvent {
    pub id: String,

    #[serde(rename = "type", default)]
    pub event_type: String,

    #[serde(default)]
    pub severity: String,

    #[serde(default)]
    pub category: String,

    #[serde(default)]
    pub status: String,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub first_seen_time: Option<DateTime<Utc>>,

    #[serde(default)]
    pub last_seen_time: Option<DateTime<Utc>>,

    #[serde(default)]
    pub resource: Option<Resource>,
}

/// A detection policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreatPolicy {
    pub id: String,

    #[serde(default)]
    pub display_name: String,

    #[serde(default)]
    pub category: String,

    #[serde(default)]
    pub severity: String,

    #[serde(default)]
    pub scope: String,

    #[serde(default)]
    pub open_issues: u64,

    /// "UPWIND" for built-in policies, "CUSTOMER" for custom ones.
    #[serde(default)]
    pub managed_by: String,

    #[serde(default)]
    pub enabled: bool,
}

/// Time-window and classification filters shared by detections and events.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ThreatDetectionQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,

    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub detection_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_first_seen_time: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_first_seen_time: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_last_seen_time: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_last_seen_time: Option<String>,
}

/// Filters for listing threat events.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ThreatEventQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cloud_account_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_first_seen_time: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_first_seen_time: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_last_seen_time: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_last_seen_time: Option<String>,

    /// First page to fetch (1-indexed, default 1).
    #[serde(skip)]
    pub page: Option<u32>,

    /// Page size (defaults to the client's page size).
    #[serde(skip)]
    pub per_page: Option<u32>,
}

/// Filters for listing threat policies.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ThreatPolicyQuery {
    /// "UPWIND" or "CUSTOMER".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub managed_by: Option<String>,
}

/// Fields to change on a threat detection.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ThreatDetectionUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,

    /// Additional fields sent as-is.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Fields to change on a threat policy.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ThreatPolicyUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,

    /// Additional fields sent as-is.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Archive a threat detection (set its status to `ARCHIVED`).
///
/// # Errors
///
/// Returns [`UpwindError::NotFound`](crate::UpwindError::NotFound) if the
/// detection doesn't exist.
pub async fn archive_threat_detection(
    client: &UpwindClient,
    id: &str,
    cancel: &CancellationToken,
) -> Result<ThreatDetection> {
    let params = ThreatDetectionUpdate {
        status: Some(status::ARCHIVED.to_string()),
        ..Default::default()
    };
    ThreatDetection::update(client, id.to_string(), params, cancel).await
}

#[async_trait]
impl Get for ThreatDetection {
    type Id = String;

    #[tracing::instrument(skip(client, cancel))]
    async fn get(client: &UpwindClient, id: String, cancel: &CancellationToken) -> Result<Self> {
        let path = format!("{DETECTIONS_PATH}/{}", urlencoding::encode(&id));
        client.get_json(DETECTION, &path, &(), cancel).await
    }
}

#[async_trait]
impl List for ThreatDetection {
    type Query = ThreatDetectionQuery;

    fn endpoint(_client: &UpwindClient, query: &Self::Query) -> Result<(Endpoint, PageCursor)> {
        let endpoint = Endpoint::new(DETECTIONS_PATH, DETECTION).with_query(query)?;
        Ok((endpoint, PageCursor::Unpaged))
    }
}

#[async_trait]
impl Update for ThreatDetection {
    type Id = String;
    type Params = ThreatDetectionUpdate;

    #[tracing::instrument(skip(client, cancel))]
    async fn update(
        client: &UpwindClient,
        id: String,
        params: Self::Params,
        cancel: &CancellationToken,
    ) -> Result<Self> {
        let path = format!("{DETECTIONS_PATH}/{}", urlencoding::encode(&id));
        client
            .send_json(Method::PATCH, DETECTION, &path, &params, StatusCode::OK, cancel)
            .await
    }
}

#[async_trait]
impl List for ThreatEvent {
    type Query = ThreatEventQuery;

    fn endpoint(client: &UpwindClient, query: &Self::Query) -> Result<(Endpoint, PageCursor)> {
        let endpoint = Endpoint::new(EVENTS_PATH, EVENT).with_query(query)?;
        let cursor = PageCursor::Offset {
            page: query.page.unwrap_or(1).max(1),
            per_page: query.per_page.unwrap_or_else(|| client.page_size()).max(1),
        };
        Ok((endpoint, cursor))
    }
}

#[async_trait]
impl List for ThreatPolicy {
    type Query = ThreatPolicyQuery;

    fn endpoint(_client: &UpwindClient, query: &Self::Query) -> Result<(Endpoint, PageCursor)> {
        let endpoint = Endpoint::new(POLICIES_PATH, POLICY).with_query(query)?;
        Ok((endpoint, PageCursor::Unpaged))
    }
}

#[async_trait]
impl Update for ThreatPolicy {
    type Id = String;
    type Params = ThreatPolicyUpdate;

    #[tracing::instrument(skip(client, cancel))]
    async fn update(
        client: &UpwindClient,
        id: String,
        params: Self::Params,
        cancel: &CancellationToken,
    ) -> Result<Self> {
        let path = format!("{POLICIES_PATH}/{}", urlencoding::encode(&id));
        client
            .send_json(Method::PATCH, POLICY, &path, &params, StatusCode::OK, cancel)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pagination::query_pairs;
    use serde_json::json;

    #[test]
    fn test_deserialize_detection() {
        let json = r#"{
            "id": "td-1",
            "type": "RUNTIME",
            "category": "CRYPTO_MINING",
            "severity": "CRITICAL",
            "status": "OPEN",
            "title": "Crypto miner detected",
            "occurrence_count": 4,
            "mitre_attacks": [{"tactic_id": "TA0040", "tactic_name": "Impact",
                               "technique_id": "T1496", "technique_name": "Resource Hijacking"}],
            "triggers": [{"policy_id": "p-1", "policy_name": "Miner",
                          "events": [{"id": "e-1", "event_type": "PROCESS",
                                      "data": {"pid": 4242}}]}]
        }"#;
        let detection: ThreatDetection = serde_json::from_str(json).unwrap();
        assert_eq!(detection.detection_type, "RUNTIME");
        assert_eq!(detection.occurrence_count, 4);
        assert_eq!(detection.mitre_attacks[0].technique_id, "T1496");
        assert_eq!(detection.triggers[0].events[0].data["pid"], 4242);
    }

    #[test]
    fn test_update_body_flattens_extra() {
        let mut extra = serde_json::Map::new();
        extra.insert("assignee".to_string(), json!("alice@example.com"));
        let update = ThreatDetectionUpdate {
            status: Some("ARCHIVED".to_string()),
            extra,
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&update).unwrap(),
            json!({"status": "ARCHIVED", "assignee": "alice@example.com"})
        );
    }

    #[test]
    fn test_detection_query_type_param() {
        let query = ThreatDetectionQuery {
            detection_type: Some("RUNTIME".to_string()),
            ..Default::default()
        };
        assert_eq!(
            query_pairs(&query).unwrap(),
            vec![("type".to_string(), "RUNTIME".to_string())]
        );
    }

    #[test]
    fn test_event_query_excludes_paging() {
        let query = ThreatEventQuery {
            severity: Some("HIGH".to_string()),
            page: Some(3),
            per_page: Some(20),
            ..Default::default()
        };
        assert_eq!(
            query_pairs(&query).unwrap(),
            vec![("severity".to_string(), "HIGH".to_string())]
        );
    }

    #[test]
    fn test_policy_update_body() {
        let update = ThreatPolicyUpdate {
            enabled: Some(false),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&update).unwrap(),
            json!({"enabled": false})
        );
    }
}
