//! CLI argument parsing types.
//!
//! This module provides the command-line interface structure for the upwind binary.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::models::{
    ApiEndpointQuery, ConfigurationFindingQuery, SbomPackageQuery, ThreatDetectionQuery,
    ThreatEventQuery, ThreatPolicyQuery, VulnerabilityFindingQuery, WebhookQuery,
};

/// Upwind API command-line interface.
#[derive(Parser, Debug)]
#[command(name = "upwind", about = "Upwind API CLI", version)]
pub struct Cli {
    /// JSON configuration file; `UPWIND_*` environment variables are used otherwise.
    #[arg(long, global = true, env = "UPWIND_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug logging on stderr.
    #[arg(short, long, global = true, default_value = "false")]
    pub verbose: bool,

    /// Output results as JSON instead of a table.
    #[arg(long, global = true, default_value = "false")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
///
/// Without an action, resource commands list (stream) every matching entity.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Vulnerability findings on images and workloads.
    #[command(visible_alias = "vulns")]
    VulnerabilityFindings {
        #[command(subcommand)]
        action: Option<GetAction>,

        #[command(flatten)]
        filters: VulnerabilityFilters,
    },

    /// Cloud configuration (posture) findings.
    #[command(visible_alias = "config-findings")]
    ConfigurationFindings {
        #[command(subcommand)]
        action: Option<ConfigurationAction>,

        #[command(flatten)]
        filters: ConfigurationFilters,
    },

    /// Runtime threat detections.
    #[command(visible_alias = "threats")]
    ThreatDetections {
        #[command(subcommand)]
        action: Option<ThreatAction>,

        #[command(flatten)]
        filters: ThreatDetectionFilters,
    },

    /// Raw threat events.
    ThreatEvents {
        #[command(flatten)]
        filters: ThreatEventFilters,
    },

    /// Threat detection policies.
    ThreatPolicies {
        /// Only policies managed by this party (e.g. UPWIND, CUSTOMER).
        #[arg(long)]
        managed_by: Option<String>,
    },

    /// Discovered API endpoints.
    ApiEndpoints {
        #[command(flatten)]
        filters: ApiEndpointFilters,
    },

    /// Packages in the software bill of materials.
    #[command(visible_alias = "packages")]
    SbomPackages {
        #[command(subcommand)]
        action: Option<PackageAction>,

        #[command(flatten)]
        filters: SbomPackageFilters,
    },

    /// Automation workflows.
    Workflows {
        #[command(subcommand)]
        action: Option<GetAction>,
    },

    /// Outbound integration webhooks.
    #[command(visible_alias = "webhooks")]
    IntegrationWebhooks {
        /// Only webhooks for this vendor.
        #[arg(long)]
        vendor: Option<String>,
    },

    /// Print the client version.
    Version,
}

/// Fetch a single entity by ID.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum GetAction {
    /// Get a single entity by ID.
    Get { id: String },
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationAction {
    /// Get a single finding by ID.
    Get {
        id: String,

        /// Include cloud account tags on the resource.
        #[arg(long)]
        include_tags: bool,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ThreatAction {
    /// Get a single detection by ID.
    Get { id: String },

    /// Archive a detection.
    Archive { id: String },
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum PackageAction {
    /// Get package details by name and version.
    Get { name: String, version: String },
}

#[derive(Args, Debug, Clone, Default)]
pub struct VulnerabilityFilters {
    /// Severity filter; repeat or comma-separate for several.
    #[arg(long, value_delimiter = ',')]
    pub severity: Vec<String>,

    #[arg(long)]
    pub image_name: Option<String>,

    /// Only packages loaded at runtime.
    #[arg(long)]
    pub in_use: bool,

    /// Only vulnerabilities with a known exploit.
    #[arg(long)]
    pub exploitable: bool,
}

impl VulnerabilityFilters {
    pub fn to_query(&self) -> VulnerabilityFindingQuery {
        VulnerabilityFindingQuery {
            severity: self.severity.clone(),
            image_name: self.image_name.clone(),
            in_use: self.in_use.then_some(true),
            exploitable: self.exploitable.then_some(true),
            ..Default::default()
        }
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct ConfigurationFilters {
    #[arg(long)]
    pub status: Option<String>,

    #[arg(long)]
    pub severity: Option<String>,

    #[arg(long)]
    pub framework_id: Option<String>,
}

impl ConfigurationFilters {
    pub fn to_query(&self) -> ConfigurationFindingQuery {
        ConfigurationFindingQuery {
            status: self.status.clone(),
            severity: self.severity.clone(),
            framework_id: self.framework_id.clone(),
            ..Default::default()
        }
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct ThreatDetectionFilters {
    #[arg(long)]
    pub severity: Option<String>,

    #[arg(long)]
    pub category: Option<String>,

    /// Detection type.
    #[arg(long = "type")]
    pub detection_type: Option<String>,
}

impl ThreatDetectionFilters {
    pub fn to_query(&self) -> ThreatDetectionQuery {
        ThreatDetectionQuery {
            severity: self.severity.clone(),
            category: self.category.clone(),
            detection_type: self.detection_type.clone(),
            ..Default::default()
        }
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct ThreatEventFilters {
    #[arg(long)]
    pub severity: Option<String>,

    #[arg(long)]
    pub category: Option<String>,

    /// Items per page; defaults to the configured page size.
    #[arg(long)]
    pub per_page: Option<u32>,
}

impl ThreatEventFilters {
    pub fn to_query(&self) -> ThreatEventQuery {
        ThreatEventQuery {
            severity: self.severity.clone(),
            category: self.category.clone(),
            per_page: self.per_page,
            ..Default::default()
        }
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct ApiEndpointFilters {
    /// HTTP method, e.g. GET.
    #[arg(long)]
    pub method: Option<String>,

    #[arg(long)]
    pub domain: Option<String>,

    /// Authentication state, e.g. UNAUTHENTICATED.
    #[arg(long)]
    pub auth_state: Option<String>,
}

impl ApiEndpointFilters {
    pub fn to_query(&self) -> ApiEndpointQuery {
        ApiEndpointQuery {
            method: self.method.clone(),
            domain: self.domain.clone(),
            authentication_state: self.auth_state.clone(),
            ..Default::default()
        }
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct SbomPackageFilters {
    #[arg(long)]
    pub package_name: Option<String>,

    #[arg(long)]
    pub framework: Option<String>,
}

impl SbomPackageFilters {
    pub fn to_query(&self) -> SbomPackageQuery {
        SbomPackageQuery {
            package_name: self.package_name.clone(),
            framework: self.framework.clone(),
            ..Default::default()
        }
    }
}

pub fn threat_policy_query(managed_by: Option<&str>) -> ThreatPolicyQuery {
    ThreatPolicyQuery {
        managed_by: managed_by.map(str::to_string),
    }
}

pub fn webhook_query(vendor: Option<&str>) -> WebhookQuery {
    WebhookQuery {
        vendor: vendor.map(str::to_string),
    }
}
