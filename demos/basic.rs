//! Basic example demonstrating the Upwind API client.
//!
//! Run with:
//! ```
//! UPWIND_CLIENT_ID=... UPWIND_CLIENT_SECRET=... UPWIND_ORGANIZATION_ID=... \
//!     cargo run --example basic
//! ```

use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use upwind::{
    List, ThreatDetection, ThreatDetectionQuery, UpwindClient, VulnerabilityFinding,
    VulnerabilityFindingQuery,
};

#[tokio::main]
async fn main() -> upwind::Result<()> {
    tracing_subscriber::fmt::init();

    let client = UpwindClient::from_env()?;
    println!("Organization: {}", client.organization_id());
    println!("API: {}", client.base_url());

    let cancel = CancellationToken::new();

    // Stream critical findings; pages are fetched in the background.
    println!("\n--- Critical vulnerability findings ---");
    let query = VulnerabilityFindingQuery {
        severity: vec!["CRITICAL".to_string()],
        ..Default::default()
    };
    let mut findings = VulnerabilityFinding::list(&client, &query, &cancel)?;
    let mut shown = 0;
    while let Some(finding) = findings.next().await {
        let finding = finding?;
        println!(
            "  {} {} {}",
            finding.id,
            finding.cve().unwrap_or("-"),
            finding
                .package
                .as_ref()
                .map(|p| p.coordinates())
                .unwrap_or_default()
        );
        shown += 1;
        if shown == 10 {
            // dropping the stream would do too; cancel stops the producer now
            findings.cancel();
            break;
        }
    }

    // Process detections in batches.
    println!("\n--- Open threat detections ---");
    let detections = ThreatDetection::list(&client, &ThreatDetectionQuery::default(), &cancel)?;
    let mut chunks = detections.into_chunks(25);
    while let Some(chunk) = chunks.next().await {
        let chunk = chunk?;
        let open = chunk.iter().filter(|d| d.status == "OPEN").count();
        println!("  batch of {}: {} open", chunk.len(), open);
    }

    println!("\nDone!");
    Ok(())
}
