//! Upwind API CLI binary.
//!
//! A command-line interface for browsing and managing Upwind findings.

use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use futures::StreamExt;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use upwind::cli::{
    threat_policy_query, webhook_query, Cli, Command, ConfigurationAction, GetAction,
    PackageAction, ThreatAction,
};
use upwind::output::render_table;
use upwind::{
    archive_threat_detection, get_configuration_finding, ApiEndpoint, ConfigurationFinding, Get,
    IntegrationWebhook, JsonArrayWriter, List, PrettyPrint, SbomPackage, TableRow,
    ThreatDetection, ThreatEvent, ThreatPolicy, UpwindClient, VulnerabilityFinding, Workflow,
};

/// Items per printed table.
const TABLE_CHUNK: usize = 100;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if matches!(cli.command, Command::Version) {
        println!("upwind {}", env!("CARGO_PKG_VERSION"));
        return ExitCode::SUCCESS;
    }

    let client = match load_client(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!(
                "Hint: Pass --config <FILE> or set UPWIND_CLIENT_ID, UPWIND_CLIENT_SECRET and UPWIND_ORGANIZATION_ID"
            );
            return ExitCode::FAILURE;
        }
    };

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Interrupted, cancelling...");
            on_interrupt.cancel();
        }
    });

    match run(&client, cli, &cancel).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.is_cancelled() => ExitCode::from(130),
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn load_client(config: Option<&Path>) -> upwind::Result<UpwindClient> {
    match config {
        Some(path) => UpwindClient::from_file(path),
        None => UpwindClient::from_env(),
    }
}

async fn run(client: &UpwindClient, cli: Cli, cancel: &CancellationToken) -> upwind::Result<()> {
    let json = cli.json;

    match cli.command {
        Command::VulnerabilityFindings { action, filters } => match action {
            Some(GetAction::Get { id }) => {
                let finding = VulnerabilityFinding::get(client, id, cancel).await?;
                output_single(&finding, json)
            }
            None => output_list::<VulnerabilityFinding>(client, &filters.to_query(), json, cancel)
                .await,
        },
        Command::ConfigurationFindings { action, filters } => match action {
            Some(ConfigurationAction::Get { id, include_tags }) => {
                let finding = get_configuration_finding(client, &id, include_tags, cancel).await?;
                output_single(&finding, json)
            }
            None => output_list::<ConfigurationFinding>(client, &filters.to_query(), json, cancel)
                .await,
        },
        Command::ThreatDetections { action, filters } => match action {
            Some(ThreatAction::Get { id }) => {
                let detection = ThreatDetection::get(client, id, cancel).await?;
                output_single(&detection, json)
            }
            Some(ThreatAction::Archive { id }) => {
                let detection = archive_threat_detection(client, &id, cancel).await?;
                output_single(&detection, json)
            }
            None => {
                output_list::<ThreatDetection>(client, &filters.to_query(), json, cancel).await
            }
        },
        Command::ThreatEvents { filters } => {
            output_list::<ThreatEvent>(client, &filters.to_query(), json, cancel).await
        }
        Command::ThreatPolicies { managed_by } => {
            let query = threat_policy_query(managed_by.as_deref());
            output_list::<ThreatPolicy>(client, &query, json, cancel).await
        }
        Command::ApiEndpoints { filters } => {
            output_list::<ApiEndpoint>(client, &filters.to_query(), json, cancel).await
        }
        Command::SbomPackages { action, filters } => match action {
            Some(PackageAction::Get { name, version }) => {
                let package = SbomPackage::get(client, (name, version), cancel).await?;
                output_single(&package, json)
            }
            None => output_list::<SbomPackage>(client, &filters.to_query(), json, cancel).await,
        },
        Command::Workflows { action } => match action {
            Some(GetAction::Get { id }) => {
                let workflow = Workflow::get(client, id, cancel).await?;
                output_single(&workflow, json)
            }
            None => output_list::<Workflow>(client, &(), json, cancel).await,
        },
        Command::IntegrationWebhooks { vendor } => {
            let query = webhook_query(vendor.as_deref());
            output_list::<IntegrationWebhook>(client, &query, json, cancel).await
        }
        Command::Version => Ok(()),
    }
}

fn output_single<T: Serialize + PrettyPrint>(item: &T, json: bool) -> upwind::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(item)?);
    } else {
        println!("{}", item.pretty_print());
    }
    Ok(())
}

/// Stream a listing to stdout.
///
/// JSON output is written element by element. Table output is printed in
/// chunks of [`TABLE_CHUNK`] so large listings show up progressively.
async fn output_list<T>(
    client: &UpwindClient,
    query: &T::Query,
    json: bool,
    cancel: &CancellationToken,
) -> upwind::Result<()>
where
    T: List + Serialize + TableRow,
{
    let mut stream = T::list(client, query, cancel)?;

    if json {
        let mut writer = JsonArrayWriter::new(std::io::stdout());
        let mut failure = None;
        while let Some(next) = stream.next().await {
            match next {
                Ok(item) => writer.push(&item)?,
                Err(err) => {
                    failure = Some(err);
                    break;
                }
            }
        }
        // keep stdout a valid array even when the listing failed midway
        writer.finish()?;
        return failure.map_or(Ok(()), Err);
    }

    let mut chunks = stream.into_chunks(TABLE_CHUNK);
    let mut total = 0usize;
    while let Some(chunk) = chunks.next().await {
        let chunk = chunk?;
        total += chunk.len();
        println!("{}", render_table(&chunk));
    }

    if total == 0 {
        println!("No results");
    } else {
        println!("\n{total} items");
    }
    Ok(())
}
