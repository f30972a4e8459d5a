#![allow(clippy::unwrap_used)]
// Integration tests for the relay operations and sinks.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::json;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use sensilink_api::SessionClient;
use sensilink_core::{
    BatchSink, CoreError, CredentialCache, EventSink, FsRecordStore, InvocationContext,
    LifecyclePolicy, PasswordSource, ProjectionRecord, SinkError, StatusEvent, StatusPoller,
    WebhookSink, ingest_message, relay_status, stream_records,
};

// ── Helpers ─────────────────────────────────────────────────────────

#[derive(Default)]
struct RecordingBatchSink {
    batches: Mutex<Vec<Vec<ProjectionRecord>>>,
}

#[async_trait]
impl BatchSink for RecordingBatchSink {
    async fn deliver_batch(&self, records: &[ProjectionRecord]) -> Result<(), SinkError> {
        self.batches.lock().unwrap().push(records.to_vec());
        Ok(())
    }
}

struct FailingSink;

#[async_trait]
impl EventSink for FailingSink {
    async fn deliver(&self, _event: &StatusEvent) -> Result<(), SinkError> {
        Err(SinkError::Rejected { status: 503 })
    }
}

async fn mount_cycle(server: &MockServer, abort_status: u16) {
    Mock::given(method("POST"))
        .and(path("/api/authorize"))
        .respond_with(
            ResponseTemplate::new(200).insert_header("set-cookie", ".ASPXAUTH=abc; path=/"),
        )
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/realtime/negotiate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ConnectionToken": "t" })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/realtime/connect"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "C": "cur-1" })))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/realtime/send"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "I": "0" })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/realtime/poll"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "M": [{ "A": ["dev-1", { "OperationalStatus": {
                "Temperature": { "F": 70 }, "Humidity": 38, "Running": { "Mode": "Heat" }
            }}]}],
            "C": "cur-2"
        })))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/realtime/abort"))
        .respond_with(ResponseTemplate::new(abort_status))
        .mount(server)
        .await;
}

fn poller(server: &MockServer) -> StatusPoller {
    let client = SessionClient::with_client(reqwest::Client::new(), &server.uri()).unwrap();
    let credentials = Arc::new(CredentialCache::new(
        "me@example.com",
        PasswordSource::Plain(SecretString::from("pw".to_string())),
    ));
    StatusPoller::new(client, credentials, "dev-1", LifecyclePolicy::Ephemeral)
}

fn sample_event() -> StatusEvent {
    StatusEvent::new(
        "dev-1",
        json!({ "Temperature": 68, "Mode": "Cool" }),
        &InvocationContext::now(),
    )
}

// ── relay_status ────────────────────────────────────────────────────

#[tokio::test]
async fn test_relay_stores_fetched_event() {
    let server = MockServer::start().await;
    mount_cycle(&server, 200).await;
    let dir = tempfile::tempdir().unwrap();
    let store = FsRecordStore::new(dir.path());

    let event = relay_status(&poller(&server), &InvocationContext::now(), &store)
        .await
        .unwrap();

    let stored = store.get(event.id()).await.unwrap().unwrap();
    assert_eq!(stored.event, event);
}

#[tokio::test]
async fn test_relay_delivers_before_reporting_teardown_failure() {
    let server = MockServer::start().await;
    mount_cycle(&server, 500).await;
    let dir = tempfile::tempdir().unwrap();
    let store = FsRecordStore::new(dir.path());

    let err = relay_status(&poller(&server), &InvocationContext::now(), &store)
        .await
        .unwrap_err();

    let event = err.take_event().unwrap();
    assert!(store.get(event.id()).await.unwrap().is_some());
}

#[tokio::test]
async fn test_relay_passes_sink_errors_through() {
    let server = MockServer::start().await;
    mount_cycle(&server, 200).await;

    let err = relay_status(&poller(&server), &InvocationContext::now(), &FailingSink)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CoreError::Sink(SinkError::Rejected { status: 503 })
    ));
}

// ── ingest_message ──────────────────────────────────────────────────

#[tokio::test]
async fn test_ingest_round_trips_a_published_event() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsRecordStore::new(dir.path());
    let event = sample_event();
    let message = serde_json::to_string(&event).unwrap();

    let ingested = ingest_message(&message, &store).await.unwrap();

    assert_eq!(ingested, event);
    assert_eq!(store.records().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_ingest_rejects_empty_and_malformed_messages() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsRecordStore::new(dir.path());

    let err = ingest_message("  \n", &store).await.unwrap_err();
    assert!(matches!(err, CoreError::Sink(SinkError::InvalidMessage(_))));

    let err = ingest_message(r#"{"deviceId":"dev-1"}"#, &store)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Sink(SinkError::InvalidMessage(_))));

    assert!(store.records().await.unwrap().is_empty());
}

// ── stream_records ──────────────────────────────────────────────────

#[tokio::test]
async fn test_stream_projects_stored_records() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsRecordStore::new(dir.path());
    store.put(&sample_event()).await.unwrap();
    store.put(&sample_event()).await.unwrap();
    let records = store.records().await.unwrap();

    let sink = RecordingBatchSink::default();
    let count = stream_records(&records, &sink).await.unwrap();

    assert_eq!(count, 2);
    let batches = sink.batches.lock().unwrap();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0][0].temperature, Some(json!(68)));
    assert_eq!(batches[0][0].status.as_deref(), Some("Cool"));
}

#[tokio::test]
async fn test_stream_of_nothing_sends_nothing() {
    let sink = RecordingBatchSink::default();
    assert_eq!(stream_records(&[], &sink).await.unwrap(), 0);
    assert!(sink.batches.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_stream_to_webhook_posts_array() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/batch"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let store = FsRecordStore::new(dir.path());
    store.put(&sample_event()).await.unwrap();
    let records = store.records().await.unwrap();

    let url = Url::parse(&format!("{}/batch", server.uri())).unwrap();
    let sink = WebhookSink::with_client(reqwest::Client::new(), url);
    assert_eq!(stream_records(&records, &sink).await.unwrap(), 1);

    let received = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&received[0].body).unwrap();
    assert_eq!(body[0]["Temperature"], 68);
    assert_eq!(body[0]["Status"], "Cool");
}
