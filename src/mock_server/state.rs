//! Mock server state management.
//!
//! Provides the in-memory data store for the mock Upwind API server.

use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::{ThreatDetection, ThreatEvent, VulnerabilityFinding, Workflow, WorkflowConfig};

/// Access token handed out by the mock token endpoint.
pub const MOCK_ACCESS_TOKEN: &str = "mock-access-token";

/// Shared state for the mock server.
///
/// This struct holds all the mock data that the server will serve.
/// It's wrapped in `Arc<RwLock<_>>` for concurrent access.
#[derive(Debug)]
pub struct MockState {
    /// Organization the client must address.
    pub organization_id: String,

    /// Accepted client-credentials pair.
    pub client_id: String,
    pub client_secret: String,

    /// Lifetime reported for issued tokens, in seconds.
    pub token_lifetime_secs: u64,

    /// Number of successful token exchanges so far.
    pub tokens_issued: u32,

    /// Vulnerability findings in listing order (cursor paginated).
    pub vulnerability_findings: Vec<VulnerabilityFinding>,

    /// Threat events in listing order (offset paginated).
    pub threat_events: Vec<ThreatEvent>,

    /// Threat detections indexed by ID.
    pub threat_detections: BTreeMap<String, ThreatDetection>,

    /// Workflows indexed by ID.
    pub workflows: BTreeMap<String, Workflow>,

    /// Organization-scoped requests that will fail with 503 before the
    /// server starts answering normally.
    pub pending_failures: u32,

    /// Organization-scoped requests received, including failed ones.
    pub requests: u32,

    next_workflow_id: u64,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            organization_id: "org-test".to_string(),
            client_id: "mock-client".to_string(),
            client_secret: "mock-secret".to_string(),
            token_lifetime_secs: 3600,
            tokens_issued: 0,
            vulnerability_findings: Vec::new(),
            threat_events: Vec::new(),
            threat_detections: BTreeMap::new(),
            workflows: BTreeMap::new(),
            pending_failures: 0,
            requests: 0,
            next_workflow_id: 1,
        }
    }
}

impl MockState {
    /// Create a new empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create state wrapped in Arc<RwLock> for sharing.
    pub fn shared(self) -> Arc<RwLock<Self>> {
        Arc::new(RwLock::new(self))
    }

    pub fn with_vulnerability_finding(mut self, finding: VulnerabilityFinding) -> Self {
        self.vulnerability_findings.push(finding);
        self
    }

    pub fn with_threat_event(mut self, event: ThreatEvent) -> Self {
        self.threat_events.push(event);
        self
    }

    pub fn with_threat_detection(mut self, detection: ThreatDetection) -> Self {
        self.threat_detections
            .insert(detection.id.clone(), detection);
        self
    }

    pub fn with_workflow(mut self, workflow: Workflow) -> Self {
        self.workflows.insert(workflow.id.clone(), workflow);
        self
    }

    /// Make the next `count` organization-scoped requests fail with 503.
    pub fn with_failures(mut self, count: u32) -> Self {
        self.pending_failures = count;
        self
    }

    /// Whether the client-credentials pair is accepted.
    pub fn accepts_credentials(&self, client_id: &str, client_secret: &str) -> bool {
        self.client_id == client_id && self.client_secret == client_secret
    }

    /// One page of vulnerability findings starting at the cursor `token`.
    ///
    /// Tokens are stringified start offsets into the filtered list. An
    /// empty `severities` matches every finding. Returns the page and the
    /// token of the following page, if any.
    pub fn vulnerability_page(
        &self,
        severities: &[String],
        token: Option<&str>,
        per_page: usize,
    ) -> Option<(Vec<VulnerabilityFinding>, Option<String>)> {
        let start = match token {
            Some(t) => t.parse::<usize>().ok()?,
            None => 0,
        };
        let per_page = per_page.max(1);
        let all: Vec<&VulnerabilityFinding> = self
            .vulnerability_findings
            .iter()
            .filter(|f| {
                severities.is_empty()
                    || f.severity()
                        .is_some_and(|s| severities.iter().any(|want| want.eq_ignore_ascii_case(s)))
            })
            .collect();
        let start = start.min(all.len());
        let end = (start + per_page).min(all.len());
        let next = (end < all.len()).then(|| end.to_string());
        let page = all[start..end].iter().map(|f| (*f).clone()).collect();
        Some((page, next))
    }

    /// Threat events on 1-indexed `page`.
    pub fn threat_event_page(&self, page: usize, per_page: usize) -> Vec<ThreatEvent> {
        let per_page = per_page.max(1);
        let start = page.saturating_sub(1).saturating_mul(per_page);
        self.threat_events
            .iter()
            .skip(start)
            .take(per_page)
            .cloned()
            .collect()
    }

    pub fn get_vulnerability_finding(&self, id: &str) -> Option<&VulnerabilityFinding> {
        self.vulnerability_findings.iter().find(|f| f.id == id)
    }

    /// Apply a status and/or severity change to a detection.
    pub fn update_threat_detection(
        &mut self,
        id: &str,
        status: Option<String>,
        severity: Option<String>,
    ) -> Option<&ThreatDetection> {
        let detection = self.threat_detections.get_mut(id)?;
        if let Some(s) = status {
            detection.status = s;
        }
        if let Some(s) = severity {
            detection.severity = s;
        }
        Some(detection)
    }

    /// Store a new workflow under a generated ID.
    pub fn create_workflow(
        &mut self,
        name: String,
        workflow_type: String,
        status: Option<String>,
        config: Option<WorkflowConfig>,
    ) -> Workflow {
        let id = format!("wf-{}", self.next_workflow_id);
        self.next_workflow_id += 1;

        let workflow = Workflow {
            id: id.clone(),
            name,
            workflow_type,
            status: status.unwrap_or_else(|| "ENABLED".to_string()),
            last_execution_time: None,
            config,
        };
        self.workflows.insert(id, workflow.clone());
        workflow
    }

    pub fn update_workflow(
        &mut self,
        id: &str,
        name: Option<String>,
        status: Option<String>,
        config: Option<WorkflowConfig>,
    ) -> Option<&Workflow> {
        let workflow = self.workflows.get_mut(id)?;
        if let Some(n) = name {
            workflow.name = n;
        }
        if let Some(s) = status {
            workflow.status = s;
        }
        if config.is_some() {
            workflow.config = config;
        }
        Some(workflow)
    }

    /// Remove a workflow, reporting whether it existed.
    pub fn delete_workflow(&mut self, id: &str) -> bool {
        self.workflows.remove(id).is_some()
    }
}
