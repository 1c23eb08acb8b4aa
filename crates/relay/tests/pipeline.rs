//! End-to-end pipeline tests against a mock collection endpoint.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::time::Duration;

use console_relay::{ConsoleRelay, RelayConfig};
use tracing_subscriber::layer::SubscriberExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config(endpoint: String, batch_interval: Duration) -> RelayConfig {
    RelayConfig {
        endpoint,
        source_url: "http://localhost:5173/".to_string(),
        batch_interval,
        max_batch_size: 5,
        history_limit: 200,
    }
}

async fn mock_endpoint(status: u16) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/console-logs"))
        .respond_with(ResponseTemplate::new(status))
        .mount(&server)
        .await;
    server
}

fn endpoint_of(server: &MockServer) -> String {
    format!("{}/api/console-logs", server.uri())
}

async fn received_bodies(server: &MockServer) -> Vec<serde_json::Value> {
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|request| serde_json::from_slice(&request.body).unwrap())
        .collect()
}

#[tokio::test]
async fn batches_reach_the_collection_endpoint() {
    let server = mock_endpoint(200).await;
    let config = test_config(endpoint_of(&server), Duration::from_millis(100));
    let (relay, layer) = ConsoleRelay::new(&config).unwrap();

    let subscriber = tracing_subscriber::registry().with(layer);
    tracing::subscriber::with_default(subscriber, || {
        tracing::info!("first");
        tracing::warn!("second");
    });

    tokio::time::sleep(Duration::from_millis(500)).await;

    let bodies = received_bodies(&server).await;
    assert_eq!(bodies.len(), 1);
    let logs = bodies[0]["logs"].as_array().unwrap();
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0]["message"], "first");
    assert_eq!(logs[0]["level"], "info");
    assert_eq!(logs[0]["url"], "http://localhost:5173/");
    assert_eq!(logs[1]["message"], "second");
    assert_eq!(logs[1]["level"], "warn");

    let snapshot = relay.snapshot();
    assert_eq!(snapshot.logs.len(), 2);
    assert_eq!(snapshot.warn_count(), 1);
}

#[tokio::test]
async fn full_batch_flushes_without_waiting_for_the_timer() {
    let server = mock_endpoint(200).await;
    // An interval far beyond the test's lifetime: only the size threshold
    // can trigger delivery here.
    let config = test_config(endpoint_of(&server), Duration::from_secs(600));
    let (_relay, layer) = ConsoleRelay::new(&config).unwrap();

    let subscriber = tracing_subscriber::registry().with(layer);
    tracing::subscriber::with_default(subscriber, || {
        for i in 0..5 {
            tracing::info!("burst {i}");
        }
    });

    tokio::time::sleep(Duration::from_millis(500)).await;

    let bodies = received_bodies(&server).await;
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0]["logs"].as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn shutdown_submits_queued_payloads_detached() {
    let server = mock_endpoint(200).await;
    let config = test_config(endpoint_of(&server), Duration::from_secs(600));
    let (relay, layer) = ConsoleRelay::new(&config).unwrap();

    let subscriber = tracing_subscriber::registry().with(layer);
    tracing::subscriber::with_default(subscriber, || {
        tracing::info!("one");
        tracing::info!("two");
        tracing::info!("three");
    });

    relay.shutdown();
    tokio::time::sleep(Duration::from_millis(500)).await;

    let bodies = received_bodies(&server).await;
    assert_eq!(bodies.len(), 1);
    let logs = bodies[0]["logs"].as_array().unwrap();
    assert_eq!(logs.len(), 3);
    assert_eq!(logs[2]["message"], "three");
}

#[tokio::test]
async fn endpoint_failures_are_swallowed() {
    let server = mock_endpoint(500).await;
    let config = test_config(endpoint_of(&server), Duration::from_millis(100));
    let (relay, layer) = ConsoleRelay::new(&config).unwrap();

    let dispatch = tracing::Dispatch::new(tracing_subscriber::registry().with(layer));

    tracing::dispatcher::with_default(&dispatch, || tracing::info!("rejected once"));
    tokio::time::sleep(Duration::from_millis(300)).await;

    tracing::dispatcher::with_default(&dispatch, || tracing::info!("rejected twice"));
    tokio::time::sleep(Duration::from_millis(300)).await;

    // Both flushes were attempted; neither failure disturbed the pipeline
    // or the display store.
    let bodies = received_bodies(&server).await;
    assert_eq!(bodies.len(), 2);
    assert_eq!(relay.snapshot().logs.len(), 2);
}

#[tokio::test]
async fn internal_noise_is_kept_out_of_uploads() {
    let server = mock_endpoint(200).await;
    let config = test_config(endpoint_of(&server), Duration::from_millis(100));
    let (relay, layer) = ConsoleRelay::new(&config).unwrap();

    let subscriber = tracing_subscriber::registry().with(layer);
    tracing::subscriber::with_default(subscriber, || {
        tracing::info!("[ConsoleListener] test");
        tracing::info!("kept");
    });

    tokio::time::sleep(Duration::from_millis(500)).await;

    let bodies = received_bodies(&server).await;
    assert_eq!(bodies.len(), 1);
    let logs = bodies[0]["logs"].as_array().unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0]["message"], "kept");

    // The display store still shows both entries; only transport is
    // filtered.
    assert_eq!(relay.snapshot().logs.len(), 2);
}
