//! Test data fixtures for the mock server.
//!
//! Provides factory functions for creating realistic test data.

use chrono::{TimeZone, Utc};

use crate::{
    Image, MitreAttack, Package, Resource, ThreatDetection, ThreatEvent, Vulnerability,
    VulnerabilityFinding, Workflow, WorkflowConfig, WorkflowTrigger,
};

use super::state::MockState;

/// Collection of fixture factories for test data.
pub struct Fixtures;

/// A pre-populated set of entities.
pub struct DefaultScenario {
    pub vulnerability_findings: Vec<VulnerabilityFinding>,
    pub threat_events: Vec<ThreatEvent>,
    pub threat_detections: Vec<ThreatDetection>,
    pub workflows: Vec<Workflow>,
}

impl DefaultScenario {
    /// Load the scenario into a fresh state.
    pub fn into_state(self) -> MockState {
        let mut state = MockState::new();
        state.vulnerability_findings = self.vulnerability_findings;
        state.threat_events = self.threat_events;
        for detection in self.threat_detections {
            state = state.with_threat_detection(detection);
        }
        for workflow in self.workflows {
            state = state.with_workflow(workflow);
        }
        state
    }
}

impl Fixtures {
    /// A Kubernetes workload resource.
    pub fn workload(name: &str) -> Resource {
        Resource {
            id: format!("res-{name}"),
            name: name.to_string(),
            resource_type: "Deployment".to_string(),
            cloud_provider: "AWS".to_string(),
            cloud_account_id: "123456789012".to_string(),
            region: Some("us-east-1".to_string()),
            cluster_id: Some("cluster-1".to_string()),
            namespace: Some("default".to_string()),
            ..Default::default()
        }
    }

    /// A finding for `cve` in an in-use OpenSSL package.
    pub fn vulnerability_finding(id: &str, cve: &str, severity: &str) -> VulnerabilityFinding {
        VulnerabilityFinding {
            id: id.to_string(),
            status: "OPEN".to_string(),
            source: Some("UPWIND".to_string()),
            first_seen_time: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).single(),
            last_scan_time: None,
            vulnerability: Some(Vulnerability {
                name: Some(cve.to_string()),
                nvd_cve_id: Some(cve.to_string()),
                nvd_cvss_v3_severity: Some(severity.to_string()),
                exploitable: severity == "CRITICAL",
                ..Default::default()
            }),
            image: Some(Image {
                name: "nginx:1.25".to_string(),
                digest: "sha256:0123abcd".to_string(),
                uri: "docker.io/library/nginx:1.25".to_string(),
                ..Default::default()
            }),
            package: Some(Package {
                name: "openssl".to_string(),
                framework: Some("OS".to_string()),
                package_type: Some("deb".to_string()),
                version: "3.0.11".to_string(),
                in_use: true,
            }),
            resource: Some(Self::workload("web")),
            remediation: vec![],
        }
    }

    /// An open runtime threat event.
    pub fn threat_event(id: &str, severity: &str) -> ThreatEvent {
        ThreatEvent {
            id: id.to_string(),
            event_type: "PROCESS_EXECUTION".to_string(),
            severity: severity.to_string(),
            category: "EXECUTION".to_string(),
            status: "OPEN".to_string(),
            title: format!("Suspicious process {id}"),
            first_seen_time: Utc.with_ymd_and_hms(2024, 3, 2, 8, 30, 0).single(),
            last_seen_time: Utc.with_ymd_and_hms(2024, 3, 2, 9, 0, 0).single(),
            resource: Some(Self::workload("worker")),
        }
    }

    /// An open detection with one MITRE technique.
    pub fn threat_detection(id: &str, severity: &str) -> ThreatDetection {
        ThreatDetection {
            id: id.to_string(),
            detection_type: "CRYPTOMINER".to_string(),
            category: "IMPACT".to_string(),
            severity: severity.to_string(),
            status: "OPEN".to_string(),
            title: "Crypto miner detected".to_string(),
            description: Some("Known mining binary executed".to_string()),
            first_seen_time: Utc.with_ymd_and_hms(2024, 3, 3, 10, 0, 0).single(),
            last_seen_time: Utc.with_ymd_and_hms(2024, 3, 3, 11, 0, 0).single(),
            occurrence_count: 3,
            resource: Some(Self::workload("miner")),
            mitre_attacks: vec![MitreAttack {
                tactic_id: "TA0040".to_string(),
                tactic_name: "Impact".to_string(),
                technique_id: "T1496".to_string(),
                technique_name: "Resource Hijacking".to_string(),
            }],
            triggers: vec![],
        }
    }

    /// An enabled notification workflow.
    pub fn workflow(id: &str, name: &str) -> Workflow {
        Workflow {
            id: id.to_string(),
            name: name.to_string(),
            workflow_type: "NOTIFICATION".to_string(),
            status: "ENABLED".to_string(),
            last_execution_time: None,
            config: Some(WorkflowConfig {
                trigger: Some(WorkflowTrigger {
                    trigger_type: "VULNERABILITY_FINDING".to_string(),
                    severities: vec!["CRITICAL".to_string()],
                    categories: vec![],
                }),
                ..Default::default()
            }),
        }
    }

    /// Five findings, three events, two detections and one workflow.
    pub fn default_scenario() -> DefaultScenario {
        let severities = ["CRITICAL", "HIGH", "HIGH", "MEDIUM", "LOW"];
        DefaultScenario {
            vulnerability_findings: severities
                .iter()
                .enumerate()
                .map(|(i, severity)| {
                    Self::vulnerability_finding(
                        &format!("vf-{}", i + 1),
                        &format!("CVE-2024-{:04}", i + 1),
                        severity,
                    )
                })
                .collect(),
            threat_events: (1..=3)
                .map(|i| Self::threat_event(&format!("ev-{i}"), "HIGH"))
                .collect(),
            threat_detections: vec![
                Self::threat_detection("td-1", "CRITICAL"),
                Self::threat_detection("td-2", "MEDIUM"),
            ],
            workflows: vec![Self::workflow("wf-seed", "Critical findings to Slack")],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vulnerability_finding_helpers() {
        let finding = Fixtures::vulnerability_finding("vf-1", "CVE-2024-1234", "CRITICAL");
        assert_eq!(finding.cve(), Some("CVE-2024-1234"));
        assert_eq!(finding.severity(), Some("CRITICAL"));
        assert!(finding.is_exploitable());
    }

    #[test]
    fn test_default_scenario_into_state() {
        let state = Fixtures::default_scenario().into_state();
        assert_eq!(state.vulnerability_findings.len(), 5);
        assert_eq!(state.threat_events.len(), 3);
        assert!(state.threat_detections.contains_key("td-2"));
        assert!(state.workflows.contains_key("wf-seed"));
    }
}
