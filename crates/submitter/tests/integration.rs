use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::NaiveDate;
use clap::Parser;
use futures::future::join_all;
use gate::RateGate;
use mockito::{Matcher, Server};
use reqwest::{StatusCode, Url, header::HeaderMap};
use serde_json::json;
use submitter::{
    Document, DocumentSubmitter, HttpTransport, SubmitError, Transport, TransportError,
    TransportResponse, encode::encode,
};
use tokio::{sync::Semaphore, time::sleep};

/// Echoes the body back and tracks how many calls are inside `send` at once.
#[derive(Debug, Default)]
struct Echo {
    current: AtomicUsize,
    peak: AtomicUsize,
    delay: Duration,
}

#[async_trait]
impl Transport for Echo {
    async fn send(
        &self,
        _url: &Url,
        _headers: HeaderMap,
        body: Vec<u8>,
        _timeout: Duration,
    ) -> Result<TransportResponse, TransportError> {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }
        self.current.fetch_sub(1, Ordering::SeqCst);
        Ok(TransportResponse { status: StatusCode::OK, body })
    }
}

/// Holds every call until the test lets it through.
#[derive(Debug)]
struct Valve {
    arrived: AtomicUsize,
    open: Semaphore,
}

impl Valve {
    fn closed() -> Self {
        Self { arrived: AtomicUsize::new(0), open: Semaphore::new(0) }
    }

    fn arrived(&self) -> usize {
        self.arrived.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for Valve {
    async fn send(
        &self,
        _url: &Url,
        _headers: HeaderMap,
        _body: Vec<u8>,
        _timeout: Duration,
    ) -> Result<TransportResponse, TransportError> {
        self.arrived.fetch_add(1, Ordering::SeqCst);
        self.open.acquire().await.expect("valve closed").forget();
        Ok(TransportResponse { status: StatusCode::OK, body: b"ok".to_vec() })
    }
}

fn endpoint() -> Url {
    Url::parse("http://crpt.test/api/v3/lk/documents/create").unwrap()
}

fn sample() -> Document {
    Document::sample(NaiveDate::from_ymd_opt(2024, 11, 5).unwrap())
}

fn gated<T: Transport>(limit: u32, period: Duration, transport: T) -> Arc<DocumentSubmitter<T>> {
    let gate = RateGate::new(limit, period).unwrap();
    Arc::new(DocumentSubmitter::new(gate, transport, endpoint(), Duration::from_secs(10)))
}

fn spawn_submits<T: Transport + 'static>(
    submitter: &Arc<DocumentSubmitter<T>>,
    n: usize,
) -> Vec<tokio::task::JoinHandle<Result<Vec<u8>, SubmitError>>> {
    (0..n)
        .map(|_| {
            let submitter = Arc::clone(submitter);
            tokio::spawn(async move { submitter.submit(&sample()).await })
        })
        .collect()
}

#[tokio::test(start_paused = true)]
async fn echo_reproduces_encoded_bytes() {
    let submitter = gated(1, Duration::from_secs(1), Echo::default());
    let doc = sample();

    let echoed = submitter.submit(&doc).await.unwrap();
    assert_eq!(echoed, encode(&doc).unwrap());
    assert_eq!(serde_json::from_slice::<Document>(&echoed).unwrap(), doc);
}

#[tokio::test(start_paused = true)]
async fn quick_calls_with_limit_one_all_admitted_within_a_window() {
    let echo = Arc::new(Echo::default());
    let submitter = gated(1, Duration::from_secs(1), Arc::clone(&echo));
    let start = tokio::time::Instant::now();

    for result in join_all(spawn_submits(&submitter, 3)).await {
        result.unwrap().unwrap();
    }

    assert!(start.elapsed() < Duration::from_secs(1));
    assert_eq!(echo.peak.load(Ordering::SeqCst), 1);
    assert_eq!(submitter.gate().in_flight(), 0);
}

#[tokio::test(start_paused = true)]
async fn limit_one_waiters_are_admitted_by_window_reset() {
    let valve = Arc::new(Valve::closed());
    let submitter = gated(1, Duration::from_secs(1), Arc::clone(&valve));
    let handles = spawn_submits(&submitter, 3);

    sleep(Duration::from_millis(500)).await;
    assert_eq!(valve.arrived(), 1);

    // The first call is still in flight, but the new window admits one more.
    sleep(Duration::from_millis(600)).await;
    assert_eq!(valve.arrived(), 2);

    sleep(Duration::from_secs(1)).await;
    assert_eq!(valve.arrived(), 3);

    valve.open.add_permits(3);
    for result in join_all(handles).await {
        assert_eq!(result.unwrap().unwrap(), b"ok");
    }
}

#[tokio::test(start_paused = true)]
async fn sixth_call_waits_for_one_of_five_to_finish() {
    let valve = Arc::new(Valve::closed());
    let submitter = gated(5, Duration::from_secs(60), Arc::clone(&valve));
    let handles = spawn_submits(&submitter, 6);

    sleep(Duration::from_millis(10)).await;
    assert_eq!(valve.arrived(), 5);
    assert_eq!(submitter.gate().in_flight(), 5);

    valve.open.add_permits(1);
    sleep(Duration::from_millis(10)).await;
    assert_eq!(valve.arrived(), 6);
    assert_eq!(submitter.gate().in_flight(), 5);

    valve.open.add_permits(5);
    for result in join_all(handles).await {
        result.unwrap().unwrap();
    }
    assert_eq!(submitter.gate().in_flight(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_submits_never_exceed_limit() {
    let echo = Arc::new(Echo { delay: Duration::from_millis(3), ..Default::default() });
    let submitter = gated(4, Duration::from_secs(3600), Arc::clone(&echo));

    for result in join_all(spawn_submits(&submitter, 32)).await {
        result.unwrap().unwrap();
    }

    let peak = echo.peak.load(Ordering::SeqCst);
    assert!(peak > 0 && peak <= 4);
    assert_eq!(submitter.gate().in_flight(), 0);
}

#[tokio::test]
async fn posts_documents_over_http() {
    let mut server = Server::new_async().await;
    let expected = serde_json::to_value(sample()).unwrap();
    let mock = server
        .mock("POST", "/api/v3/lk/documents/create")
        .match_header("content-type", "application/json")
        .match_body(Matcher::Json(expected))
        .with_status(200)
        .with_body(r#"{"value":"doc-42"}"#)
        .expect(3)
        .create_async()
        .await;

    let url = format!("{}/api/v3/lk/documents/create", server.url());
    let opts = config::Opts::try_parse_from([
        "crpt-submit",
        "--api-url",
        url.as_str(),
        "--request-limit",
        "2",
    ])
    .unwrap();
    let submitter = Arc::new(DocumentSubmitter::from_opts(&opts).unwrap());

    for result in join_all(spawn_submits(&submitter, 3)).await {
        let body = result.unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value, json!({"value": "doc-42"}));
    }
    mock.assert_async().await;
    submitter.shutdown().await;
}

#[tokio::test]
async fn server_error_is_passed_through_and_slot_released() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/")
        .with_status(503)
        .with_body("maintenance")
        .expect(1)
        .create_async()
        .await;

    let gate = RateGate::new(1, Duration::from_secs(3600)).unwrap();
    let submitter = DocumentSubmitter::new(
        gate,
        HttpTransport::new().unwrap(),
        Url::parse(&server.url()).unwrap(),
        Duration::from_secs(5),
    );

    let err = submitter.submit(&sample()).await.unwrap_err();
    match err {
        SubmitError::Transport(TransportError::Status { status, body }) => {
            assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
            assert_eq!(body, "maintenance");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(submitter.gate().in_flight(), 0);
    mock.assert_async().await;
}
