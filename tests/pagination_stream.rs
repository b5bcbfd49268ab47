//! Pagination styles and the streaming pipeline, end to end.

mod common;

use std::time::Duration;

use common::{items, mount_token, org_path, test_client, test_config};
use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use upwind::{
    List, PageCursor, ThreatEvent, ThreatEventQuery, UpwindClient, UpwindError,
    VulnerabilityFinding, VulnerabilityFindingQuery, Workflow,
};
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn findings_path() -> String {
    org_path("vulnerability-findings")
}

fn next_link(server: &MockServer, token: &str) -> String {
    format!(
        "<{}{}?page-token={}>; rel=\"next\"",
        server.uri(),
        findings_path(),
        token
    )
}

async fn mount_first_finding_page(server: &MockServer, count: usize, token: &str) {
    Mock::given(method("GET"))
        .and(path(findings_path()))
        .and(query_param_is_missing("page-token"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Link", next_link(server, token).as_str())
                .set_body_json(items("vf", 0, count)),
        )
        .expect(1)
        .mount(server)
        .await;
}

fn ids(findings: &[VulnerabilityFinding]) -> Vec<&str> {
    findings.iter().map(|f| f.id.as_str()).collect()
}

#[tokio::test]
async fn test_cursor_pagination_follows_link_header() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_first_finding_page(&server, 2, "abc").await;
    Mock::given(method("GET"))
        .and(path(findings_path()))
        .and(query_param("page-token", "abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(items("vf", 2, 2)))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server);
    let findings = VulnerabilityFinding::list_all(
        &client,
        &VulnerabilityFindingQuery::default(),
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(ids(&findings), ["vf-0", "vf-1", "vf-2", "vf-3"]);
}

#[tokio::test]
async fn test_cursor_pagination_keeps_filters_on_every_page() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    Mock::given(method("GET"))
        .and(path(findings_path()))
        .and(query_param("severity", "CRITICAL,HIGH"))
        .and(query_param("per-page", "2"))
        .and(query_param_is_missing("page-token"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Link", next_link(&server, "p2").as_str())
                .set_body_json(items("vf", 0, 2)),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(findings_path()))
        .and(query_param("severity", "CRITICAL,HIGH"))
        .and(query_param("per-page", "2"))
        .and(query_param("page-token", "p2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(items("vf", 2, 1)))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server);
    let query = VulnerabilityFindingQuery {
        severity: vec!["CRITICAL".to_string(), "HIGH".to_string()],
        per_page: Some(2),
        ..Default::default()
    };
    let findings = VulnerabilityFinding::list_all(&client, &query, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(findings.len(), 3);
}

#[tokio::test]
async fn test_cursor_empty_token_ends_listing() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_first_finding_page(&server, 2, "").await;

    let client = test_client(&server);
    let findings = VulnerabilityFinding::list_all(
        &client,
        &VulnerabilityFindingQuery::default(),
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(findings.len(), 2);
}

#[tokio::test]
async fn test_cursor_link_without_token_is_followed() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    Mock::given(method("GET"))
        .and(path(findings_path()))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header(
                    "Link",
                    format!("<{}/cursor/2>; rel=\"next\"", server.uri()).as_str(),
                )
                .set_body_json(items("vf", 0, 1)),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/cursor/2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(items("vf", 1, 1)))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server);
    let findings = VulnerabilityFinding::list_all(
        &client,
        &VulnerabilityFindingQuery::default(),
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(ids(&findings), ["vf-0", "vf-1"]);
}

#[tokio::test]
async fn test_list_page_exposes_cursor() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_first_finding_page(&server, 2, "abc").await;

    let client = test_client(&server);
    let page = VulnerabilityFinding::list_page(
        &client,
        &VulnerabilityFindingQuery::default(),
        None,
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(page.len(), 2);
    assert!(page.has_more());
    assert_eq!(
        page.next,
        Some(PageCursor::Cursor {
            token: Some("abc".to_string()),
            per_page: None
        })
    );
}

#[tokio::test]
async fn test_offset_pagination_stops_on_short_page() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    for (page, count) in [("1", 2), ("2", 2), ("3", 1)] {
        Mock::given(method("GET"))
            .and(path(org_path("threat-events")))
            .and(query_param("page", page))
            .and(query_param("per-page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(items("ev", 0, count)))
            .expect(1)
            .mount(&server)
            .await;
    }

    let client = test_client(&server);
    let query = ThreatEventQuery {
        per_page: Some(2),
        ..Default::default()
    };
    let events = ThreatEvent::list_all(&client, &query, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(events.len(), 5);
}

#[tokio::test]
async fn test_offset_pagination_stops_on_empty_page() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    Mock::given(method("GET"))
        .and(path(org_path("threat-events")))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(items("ev", 0, 2)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(org_path("threat-events")))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server);
    let query = ThreatEventQuery {
        per_page: Some(2),
        ..Default::default()
    };
    let events = ThreatEvent::list_all(&client, &query, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(events.len(), 2);
}

#[tokio::test]
async fn test_offset_page_size_defaults_to_config() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    Mock::given(method("GET"))
        .and(path(org_path("threat-events")))
        .and(query_param("page", "1"))
        .and(query_param("per-page", "25"))
        .respond_with(ResponseTemplate::new(200).set_body_json(items("ev", 0, 3)))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = test_config(&server);
    config.page_size = 25;
    let client = UpwindClient::new(config).unwrap();
    let events = ThreatEvent::list_all(
        &client,
        &ThreatEventQuery::default(),
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(events.len(), 3);
}

#[tokio::test]
async fn test_unpaged_listing_makes_one_request() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    Mock::given(method("GET"))
        .and(path(org_path("workflows")))
        .respond_with(
            ResponseTemplate::new(200)
                // a stray Link header must not be followed
                .insert_header("Link", "</elsewhere?page-token=x>; rel=\"next\"")
                .set_body_json(items("wf", 0, 3)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server);
    let workflows = Workflow::list_all(&client, &(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(workflows.len(), 3);
}

#[tokio::test]
async fn test_partial_content_is_accepted() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    Mock::given(method("GET"))
        .and(path(org_path("workflows")))
        .respond_with(ResponseTemplate::new(206).set_body_json(items("wf", 0, 2)))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let workflows = Workflow::list_all(&client, &(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(workflows.len(), 2);
}

#[tokio::test]
async fn test_error_mid_stream_follows_delivered_items() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_first_finding_page(&server, 2, "next").await;
    Mock::given(method("GET"))
        .and(path(findings_path()))
        .and(query_param("page-token", "next"))
        .respond_with(ResponseTemplate::new(400).set_body_string("expired token"))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server);
    let collected = VulnerabilityFinding::list(
        &client,
        &VulnerabilityFindingQuery::default(),
        &CancellationToken::new(),
    )
    .unwrap()
    .collect_all()
    .await;

    assert_eq!(collected.items.len(), 2);
    assert!(matches!(
        collected.error,
        Some(UpwindError::Api { status: 400, .. })
    ));
}

#[tokio::test]
async fn test_slow_consumer_applies_backpressure() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_first_finding_page(&server, 150, "p2").await;
    Mock::given(method("GET"))
        .and(path(findings_path()))
        .and(query_param("page-token", "p2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(items("vf", 150, 1)))
        .expect(0)
        .mount(&server)
        .await;

    let client = test_client(&server);
    let mut stream = VulnerabilityFinding::list(
        &client,
        &VulnerabilityFindingQuery::default(),
        &CancellationToken::new(),
    )
    .unwrap();

    let first = stream.next().await.unwrap().unwrap();
    assert_eq!(first.id, "vf-0");

    // the producer is parked on the full queue and never asks for page 2
    tokio::time::sleep(Duration::from_millis(300)).await;
    drop(stream);
    tokio::time::sleep(Duration::from_millis(50)).await;
}

#[tokio::test]
async fn test_cancel_stops_producer() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_first_finding_page(&server, 150, "p2").await;
    Mock::given(method("GET"))
        .and(path(findings_path()))
        .and(query_param("page-token", "p2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(items("vf", 150, 1)))
        .expect(0)
        .mount(&server)
        .await;

    let client = test_client(&server);
    let mut stream = VulnerabilityFinding::list(
        &client,
        &VulnerabilityFindingQuery::default(),
        &CancellationToken::new(),
    )
    .unwrap();

    stream.next().await.unwrap().unwrap();
    stream.cancel();
    assert!(stream.is_cancelled());

    let collected = stream.collect_all().await;
    assert!(collected.items.len() < 150);
    assert!(matches!(collected.error, Some(UpwindError::Cancelled)));
}

#[tokio::test]
async fn test_parent_cancellation_reaches_stream() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    Mock::given(method("GET"))
        .and(path(org_path("workflows")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_secs(10))
                .set_body_json(items("wf", 0, 1)),
        )
        .mount(&server)
        .await;

    let client = test_client(&server);
    let cancel = CancellationToken::new();
    let stream = Workflow::list(&client, &(), &cancel).unwrap();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let result = tokio::time::timeout(Duration::from_secs(5), stream.collect_all())
        .await
        .expect("stream should stop promptly");
    assert!(result.items.is_empty());
    assert!(matches!(result.error, Some(UpwindError::Cancelled)));
}

#[tokio::test]
async fn test_cancelling_stream_leaves_caller_token_alone() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    Mock::given(method("GET"))
        .and(path(org_path("workflows")))
        .respond_with(ResponseTemplate::new(200).set_body_json(items("wf", 0, 1)))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let cancel = CancellationToken::new();
    let stream = Workflow::list(&client, &(), &cancel).unwrap();
    stream.cancel();

    assert!(!cancel.is_cancelled());
}

#[tokio::test]
async fn test_transport_refreshed_every_n_pages() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    mount_first_finding_page(&server, 1, "p2").await;
    Mock::given(method("GET"))
        .and(path(findings_path()))
        .and(query_param("page-token", "p2"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Link", next_link(&server, "p3").as_str())
                .set_body_json(items("vf", 1, 1)),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(findings_path()))
        .and(query_param("page-token", "p3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(items("vf", 2, 1)))
        .mount(&server)
        .await;

    let mut config = test_config(&server);
    config.connection_refresh_pages = 1;
    let client = UpwindClient::new(config).unwrap();
    assert_eq!(client.transport_generation(), 0);

    let findings = VulnerabilityFinding::list_all(
        &client,
        &VulnerabilityFindingQuery::default(),
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(findings.len(), 3);
    // refreshed between pages, not after the last one
    assert_eq!(client.transport_generation(), 2);
}

#[tokio::test]
async fn test_for_each_chunk_flushes_partial_chunk() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    Mock::given(method("GET"))
        .and(path(org_path("workflows")))
        .respond_with(ResponseTemplate::new(200).set_body_json(items("wf", 0, 5)))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let stream = Workflow::list(&client, &(), &CancellationToken::new()).unwrap();

    let mut sizes = Vec::new();
    stream
        .for_each_chunk(2, |chunk| {
            sizes.push(chunk.len());
            async { Ok::<(), UpwindError>(()) }
        })
        .await
        .unwrap();

    assert_eq!(sizes, [2, 2, 1]);
}

#[tokio::test]
async fn test_into_chunks_batches_items() {
    let server = MockServer::start().await;
    mount_token(&server).await;
    Mock::given(method("GET"))
        .and(path(org_path("workflows")))
        .respond_with(ResponseTemplate::new(200).set_body_json(items("wf", 0, 7)))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let chunks: Vec<_> = Workflow::list(&client, &(), &CancellationToken::new())
        .unwrap()
        .into_chunks(3)
        .collect()
        .await;

    let sizes: Vec<usize> = chunks
        .into_iter()
        .map(|chunk| chunk.unwrap().len())
        .collect();
    assert_eq!(sizes, [3, 3, 1]);
}
