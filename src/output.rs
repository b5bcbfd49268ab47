//! Output formatting for CLI display.
//!
//! Provides the [`PrettyPrint`] trait for human-readable single entities,
//! [`TableRow`] for tabular listings, and [`JsonArrayWriter`] for emitting
//! a JSON array while items are still streaming in.

use std::io::Write;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tabled::{Table, Tabled};

use crate::error::Result;
use crate::models::{
    ApiEndpoint, ConfigurationFinding, IntegrationWebhook, SbomPackage, ThreatDetection,
    ThreatEvent, ThreatPolicy, VulnerabilityFinding, Workflow,
};

/// Trait for human-readable key-value output.
///
/// Implemented by entity types to provide formatted output
/// suitable for terminal display when `--json` is not specified.
pub trait PrettyPrint {
    /// Returns a formatted string for terminal display.
    fn pretty_print(&self) -> String;
}

/// Conversion of an entity into one table row.
pub trait TableRow {
    type Row: Tabled;

    fn table_row(&self) -> Self::Row;
}

/// Render `items` as a table.
pub fn render_table<T: TableRow>(items: &[T]) -> String {
    Table::new(items.iter().map(T::table_row)).to_string()
}

fn header(title: String) -> Vec<String> {
    let divider = "─".repeat(title.chars().count().max(30));
    vec![title, divider]
}

fn timestamp(time: &DateTime<Utc>) -> String {
    time.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

fn opt_time(time: Option<&DateTime<Utc>>) -> String {
    time.map(timestamp).unwrap_or_default()
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

impl PrettyPrint for VulnerabilityFinding {
    fn pretty_print(&self) -> String {
        let mut lines = header(format!("Vulnerability Finding: {}", self.id));
        lines.push(format!("Status:         {}", self.status));

        if let Some(cve) = self.cve() {
            lines.push(format!("CVE:            {}", cve));
        }

        if let Some(severity) = self.severity() {
            lines.push(format!("Severity:       {}", severity));
        }

        lines.push(format!("Exploitable:    {}", yes_no(self.is_exploitable())));

        if let Some(ref package) = self.package {
            lines.push(format!("Package:        {}", package.coordinates()));
            lines.push(format!("In Use:         {}", yes_no(package.in_use)));
        }

        if let Some(ref image) = self.image {
            lines.push(format!("Image:          {}", image.name));
        }

        if let Some(ref resource) = self.resource {
            lines.push(format!(
                "Resource:       {} ({})",
                resource.name, resource.resource_type
            ));
        }

        if let Some(ref seen) = self.first_seen_time {
            lines.push(format!("First Seen:     {}", timestamp(seen)));
        }

        lines.join("\n")
    }
}

impl PrettyPrint for ConfigurationFinding {
    fn pretty_print(&self) -> String {
        let mut lines = header(format!("Configuration Finding: {}", self.id));
        lines.push(format!("Title:          {}", self.title));
        lines.push(format!("Status:         {}", self.status));
        lines.push(format!("Severity:       {}", self.severity));

        if let Some(framework) = self.framework_title() {
            lines.push(format!("Framework:      {}", framework));
        }

        if let Some(ref check) = self.check {
            lines.push(format!("Check:          {} ({})", check.title, check.id));
            if let Some(ref remediation) = check.remediation {
                lines.push(format!("Remediation:    {}", remediation));
            }
        }

        if let Some(ref resource) = self.resource {
            lines.push(format!(
                "Resource:       {} ({})",
                resource.name, resource.resource_type
            ));
            for tag in &resource.cloud_account_tags {
                lines.push(format!("Account Tag:    {}={}", tag.key, tag.value));
            }
        }

        if let Some(ref seen) = self.last_seen_time {
            lines.push(format!("Last Seen:      {}", timestamp(seen)));
        }

        lines.join("\n")
    }
}

impl PrettyPrint for ThreatDetection {
    fn pretty_print(&self) -> String {
        let mut lines = header(format!("Threat Detection: {}", self.id));
        lines.push(format!("Title:          {}", self.title));
        lines.push(format!("Type:           {}", self.detection_type));
        lines.push(format!("Category:       {}", self.category));
        lines.push(format!("Severity:       {}", self.severity));
        lines.push(format!("Status:         {}", self.status));
        lines.push(format!("Occurrences:    {}", self.occurrence_count));

        for attack in &self.mitre_attacks {
            lines.push(format!(
                "MITRE:          {} {} / {} {}",
                attack.tactic_id, attack.tactic_name, attack.technique_id, attack.technique_name
            ));
        }

        if let Some(ref resource) = self.resource {
            lines.push(format!(
                "Resource:       {} ({})",
                resource.name, resource.resource_type
            ));
        }

        if let Some(ref seen) = self.last_seen_time {
            lines.push(format!("Last Seen:      {}", timestamp(seen)));
        }

        lines.join("\n")
    }
}

impl PrettyPrint for SbomPackage {
    fn pretty_print(&self) -> String {
        let mut lines = header(format!("Package: {}@{}", self.name, self.version));

        if let Some(ref manager) = self.package_manager {
            lines.push(format!("Manager:        {}", manager));
        }

        if !self.licenses.is_empty() {
            lines.push(format!("Licenses:       {}", self.licenses.join(", ")));
        }

        if let Some(ref vulns) = self.vulnerabilities_summary {
            lines.push(format!(
                "Vulns:          {} ({} critical, {} high, {} medium, {} low)",
                vulns.total_count,
                vulns.critical_count,
                vulns.high_count,
                vulns.medium_count,
                vulns.low_count
            ));
        }

        if let Some(ref resources) = self.resources_summary {
            lines.push(format!(
                "Resources:      {} ({} in use)",
                resources.total_count, resources.in_use_count
            ));
        }

        lines.join("\n")
    }
}

impl PrettyPrint for Workflow {
    fn pretty_print(&self) -> String {
        let mut lines = header(format!("Workflow: {}", self.id));
        lines.push(format!("Name:           {}", self.name));
        lines.push(format!("Type:           {}", self.workflow_type));
        lines.push(format!("Status:         {}", self.status));

        if let Some(trigger) = self.config.as_ref().and_then(|c| c.trigger.as_ref()) {
            lines.push(format!("Trigger:        {}", trigger.trigger_type));
        }

        if let Some(ref executed) = self.last_execution_time {
            lines.push(format!("Last Run:       {}", timestamp(executed)));
        }

        lines.join("\n")
    }
}

// Table rows

#[derive(Tabled)]
pub struct VulnerabilityRow {
    id: String,
    cve: String,
    severity: String,
    package: String,
    image: String,
}

impl TableRow for VulnerabilityFinding {
    type Row = VulnerabilityRow;

    fn table_row(&self) -> VulnerabilityRow {
        VulnerabilityRow {
            id: self.id.clone(),
            cve: self.cve().unwrap_or_default().to_string(),
            severity: self.severity().unwrap_or_default().to_string(),
            package: self
                .package
                .as_ref()
                .map(|p| p.coordinates())
                .unwrap_or_default(),
            image: self
                .image
                .as_ref()
                .map(|i| i.name.clone())
                .unwrap_or_default(),
        }
    }
}

#[derive(Tabled)]
pub struct ConfigurationRow {
    id: String,
    severity: String,
    status: String,
    title: String,
    resource: String,
}

impl TableRow for ConfigurationFinding {
    type Row = ConfigurationRow;

    fn table_row(&self) -> ConfigurationRow {
        ConfigurationRow {
            id: self.id.clone(),
            severity: self.severity.clone(),
            status: self.status.clone(),
            title: self.title.clone(),
            resource: self.resource_name().unwrap_or_default().to_string(),
        }
    }
}

#[derive(Tabled)]
pub struct ThreatDetectionRow {
    id: String,
    severity: String,
    category: String,
    status: String,
    title: String,
}

impl TableRow for ThreatDetection {
    type Row = ThreatDetectionRow;

    fn table_row(&self) -> ThreatDetectionRow {
        ThreatDetectionRow {
            id: self.id.clone(),
            severity: self.severity.clone(),
            category: self.category.clone(),
            status: self.status.clone(),
            title: self.title.clone(),
        }
    }
}

#[derive(Tabled)]
pub struct ThreatEventRow {
    id: String,
    #[tabled(rename = "type")]
    event_type: String,
    severity: String,
    title: String,
    last_seen: String,
}

impl TableRow for ThreatEvent {
    type Row = ThreatEventRow;

    fn table_row(&self) -> ThreatEventRow {
        ThreatEventRow {
            id: self.id.clone(),
            event_type: self.event_type.clone(),
            severity: self.severity.clone(),
            title: self.title.clone(),
            last_seen: opt_time(self.last_seen_time.as_ref()),
        }
    }
}

#[derive(Tabled)]
pub struct ThreatPolicyRow {
    id: String,
    name: String,
    severity: String,
    managed_by: String,
    enabled: String,
}

impl TableRow for ThreatPolicy {
    type Row = ThreatPolicyRow;

    fn table_row(&self) -> ThreatPolicyRow {
        ThreatPolicyRow {
            id: self.id.clone(),
            name: self.display_name.clone(),
            severity: self.severity.clone(),
            managed_by: self.managed_by.clone(),
            enabled: yes_no(self.enabled).to_string(),
        }
    }
}

#[derive(Tabled)]
pub struct ApiEndpointRow {
    method: String,
    uri: String,
    auth: String,
    internet: String,
}

impl TableRow for ApiEndpoint {
    type Row = ApiEndpointRow;

    fn table_row(&self) -> ApiEndpointRow {
        ApiEndpointRow {
            method: self.method.clone(),
            uri: self.uri.clone(),
            auth: self.auth_state().unwrap_or_default().to_string(),
            internet: yes_no(self.is_internet_facing()).to_string(),
        }
    }
}

#[derive(Tabled)]
pub struct SbomPackageRow {
    name: String,
    version: String,
    manager: String,
    vulnerabilities: u64,
}

impl TableRow for SbomPackage {
    type Row = SbomPackageRow;

    fn table_row(&self) -> SbomPackageRow {
        SbomPackageRow {
            name: self.name.clone(),
            version: self.version.clone(),
            manager: self.package_manager.clone().unwrap_or_default(),
            vulnerabilities: self.vulnerability_count(),
        }
    }
}

#[derive(Tabled)]
pub struct WorkflowRow {
    id: String,
    name: String,
    #[tabled(rename = "type")]
    workflow_type: String,
    status: String,
}

impl TableRow for Workflow {
    type Row = WorkflowRow;

    fn table_row(&self) -> WorkflowRow {
        WorkflowRow {
            id: self.id.clone(),
            name: self.name.clone(),
            workflow_type: self.workflow_type.clone(),
            status: self.status.clone(),
        }
    }
}

#[derive(Tabled)]
pub struct WebhookRow {
    id: String,
    name: String,
    vendor: String,
    status: String,
}

impl TableRow for IntegrationWebhook {
    type Row = WebhookRow;

    fn table_row(&self) -> WebhookRow {
        WebhookRow {
            id: self.id.clone(),
            name: self.name.clone(),
            vendor: self.vendor.clone(),
            status: self.status.clone(),
        }
    }
}

/// Writes a JSON array one element at a time.
///
/// Call [`finish`](Self::finish) to close the array; an empty array is
/// written as `[]`.
pub struct JsonArrayWriter<W: Write> {
    out: W,
    count: usize,
}

impl<W: Write> JsonArrayWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out, count: 0 }
    }

    /// Append one element.
    ///
    /// # Errors
    ///
    /// Returns an error if the item can't be serialized or written.
    pub fn push<T: Serialize>(&mut self, item: &T) -> Result<()> {
        let separator = if self.count == 0 { "[\n  " } else { ",\n  " };
        self.out.write_all(separator.as_bytes())?;
        serde_json::to_writer(&mut self.out, item)?;
        self.count += 1;
        Ok(())
    }

    /// Number of elements written so far.
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Close the array and flush, returning the writer.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn finish(mut self) -> Result<W> {
        let closing = if self.count == 0 { "[]\n" } else { "\n]\n" };
        self.out.write_all(closing.as_bytes())?;
        self.out.flush()?;
        Ok(self.out)
    }
}
