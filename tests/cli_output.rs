//! CLI output formatting tests.
//!
//! - JSON output with --json
//! - Pretty-print output as default for single entities
//! - Tables for listings

use serde_json::json;
use upwind::{
    render_table, ConfigurationFinding, JsonArrayWriter, PrettyPrint, SbomPackage,
    ThreatDetection, ThreatPolicy, VulnerabilityFinding,
};

fn make_finding() -> VulnerabilityFinding {
    serde_json::from_value(json!({
        "id": "vf-1",
        "status": "OPEN",
        "first_seen_time": "2024-03-01T12:00:00Z",
        "vulnerability": {
            "nvd_cve_id": "CVE-2024-3094",
            "nvd_cvss_v3_severity": "CRITICAL",
            "exploitable": true
        },
        "package": {"name": "xz-utils", "version": "5.6.0", "in_use": true},
        "image": {"name": "debian:sid"}
    }))
    .unwrap()
}

fn make_detection() -> ThreatDetection {
    serde_json::from_value(json!({
        "id": "td-1",
        "type": "CRYPTOMINER",
        "category": "IMPACT",
        "severity": "HIGH",
        "status": "OPEN",
        "title": "Crypto miner detected",
        "occurrence_count": 7,
        "mitre_attacks": [{"tactic_id": "TA0040", "tactic_name": "Impact",
                           "technique_id": "T1496", "technique_name": "Resource Hijacking"}]
    }))
    .unwrap()
}

// ============================================================================
// JSON Output Tests
// ============================================================================

#[test]
fn test_json_output_is_valid_and_keeps_wire_names() {
    let output = serde_json::to_string_pretty(&make_detection()).unwrap();

    let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
    assert_eq!(parsed["id"], "td-1");
    // renamed fields go back out under their API names
    assert_eq!(parsed["type"], "CRYPTOMINER");
    assert!(parsed.get("detection_type").is_none());
}

#[test]
fn test_json_list_output_is_an_array() {
    let mut writer = JsonArrayWriter::new(Vec::new());
    writer.push(&make_finding()).unwrap();
    writer.push(&make_finding()).unwrap();

    let bytes = writer.finish().unwrap();
    let parsed: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    let items = parsed.as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["vulnerability"]["nvd_cve_id"], "CVE-2024-3094");
}

#[test]
fn test_json_list_output_without_items_is_empty_array() {
    let bytes = JsonArrayWriter::new(Vec::new()).finish().unwrap();

    let parsed: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(parsed, json!([]));
}

// ============================================================================
// Pretty-Print Tests
// ============================================================================

#[test]
fn test_default_output_is_not_json() {
    let output = make_finding().pretty_print();

    let parse_result: Result<serde_json::Value, _> = serde_json::from_str(&output);
    assert!(parse_result.is_err(), "Default output should not be JSON");
}

#[test]
fn test_pretty_print_finding_fields() {
    let output = make_finding().pretty_print();

    assert!(output.starts_with("Vulnerability Finding: vf-1"));
    assert!(output.contains("CVE:            CVE-2024-3094"));
    assert!(output.contains("Severity:       CRITICAL"));
    assert!(output.contains("Exploitable:    yes"));
    assert!(output.contains("Package:        xz-utils@5.6.0"));
    assert!(output.contains("First Seen:     2024-03-01 12:00:00 UTC"));
}

#[test]
fn test_pretty_print_detection_fields() {
    let output = make_detection().pretty_print();

    assert!(output.starts_with("Threat Detection: td-1"));
    assert!(output.contains("Crypto miner detected"));
    assert!(output.contains("Occurrences:    7"));
    assert!(output.contains("T1496"));
}

#[test]
fn test_pretty_print_configuration_finding() {
    let finding: ConfigurationFinding = serde_json::from_value(json!({
        "id": "cf-1",
        "title": "S3 bucket is public",
        "status": "FAIL",
        "severity": "HIGH"
    }))
    .unwrap();

    let output = finding.pretty_print();
    let mut lines = output.lines();
    assert_eq!(lines.next(), Some("Configuration Finding: cf-1"));
    assert!(lines.next().unwrap().starts_with('─'));
    assert!(output.contains("Title:          S3 bucket is public"));
}

#[test]
fn test_pretty_print_package_header() {
    let package: SbomPackage = serde_json::from_value(json!({
        "name": "lodash",
        "version": "4.17.20",
        "licenses": ["MIT"]
    }))
    .unwrap();

    let output = package.pretty_print();
    assert!(output.starts_with("Package: lodash@4.17.20"));
    assert!(output.contains("MIT"));
}

// ============================================================================
// Table Tests
// ============================================================================

#[test]
fn test_table_lists_every_item() {
    let mut second = make_finding();
    second.id = "vf-2".to_string();

    let table = render_table(&[make_finding(), second]);

    assert!(table.contains("cve"));
    assert!(table.contains("vf-1"));
    assert!(table.contains("vf-2"));
    assert!(table.contains("xz-utils@5.6.0"));
}

#[test]
fn test_table_for_policies() {
    let policy: ThreatPolicy = serde_json::from_value(json!({
        "id": "p-1",
        "display_name": "Reverse shell",
        "severity": "CRITICAL",
        "managed_by": "UPWIND",
        "enabled": true
    }))
    .unwrap();

    let table = render_table(&[policy]);
    assert!(table.contains("Reverse shell"));
    assert!(table.contains("UPWIND"));
}
