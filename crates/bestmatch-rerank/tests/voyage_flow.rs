use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use bestmatch_rerank::{
    ExponentialJitter, ProviderError, RerankClient, RerankClientConfig, RerankProvider,
    RerankRequest, VoyageRerankConfig, VoyageRerankProvider,
};

struct StubServer {
    endpoint: String,
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
    handle: JoinHandle<()>,
}

#[derive(Debug, Clone)]
struct CapturedRequest {
    head: String,
    body: serde_json::Value,
}

/// Serves one scripted `(status, body)` per incoming connection, then exits.
fn serve(replies: Vec<(u16, &'static str)>) -> StubServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind stub");
    let addr = listener.local_addr().expect("local addr");
    let requests = Arc::new(Mutex::new(Vec::new()));
    let captured = requests.clone();

    let handle = std::thread::spawn(move || {
        for (status, body) in replies {
            let (stream, _) = listener.accept().expect("accept");
            let mut reader = BufReader::new(stream.try_clone().expect("clone stream"));

            let mut head = String::new();
            let mut content_length = 0usize;
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).expect("read header");
                if line == "\r\n" || line.is_empty() {
                    break;
                }
                if let Some((name, value)) = line.split_once(':') {
                    if name.eq_ignore_ascii_case("content-length") {
                        content_length = value.trim().parse().expect("content length");
                    }
                }
                head.push_str(&line);
            }
            let mut raw = vec![0u8; content_length];
            reader.read_exact(&mut raw).expect("read body");
            let body_json = serde_json::from_slice(&raw).unwrap_or(serde_json::Value::Null);
            captured.lock().expect("lock").push(CapturedRequest {
                head,
                body: body_json,
            });

            let reason = if status == 200 { "OK" } else { "Error" };
            let response = format!(
                "HTTP/1.1 {status} {reason}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            let mut stream = stream;
            stream.write_all(response.as_bytes()).expect("write response");
            stream.flush().expect("flush");
        }
    });

    StubServer {
        endpoint: format!("http://{addr}/v1/rerank"),
        requests,
        handle,
    }
}

/// Accepts `connections` connections and holds each open for `stall`
/// without answering. Returns the endpoint, an accept counter and the
/// accept-loop handle.
fn serve_stalled(connections: u32, stall: Duration) -> (String, Arc<AtomicU32>, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind stub");
    let addr = listener.local_addr().expect("local addr");
    let accepted = Arc::new(AtomicU32::new(0));
    let counter = accepted.clone();

    let handle = std::thread::spawn(move || {
        let mut held = Vec::new();
        for _ in 0..connections {
            let (stream, _) = listener.accept().expect("accept");
            counter.fetch_add(1, Ordering::SeqCst);
            held.push(std::thread::spawn(move || {
                std::thread::sleep(stall);
                drop(stream);
            }));
        }
        for h in held {
            h.join().expect("stalled connection");
        }
    });

    (format!("http://{addr}/v1/rerank"), accepted, handle)
}

fn fast_backoff() -> ExponentialJitter {
    ExponentialJitter::new(
        Duration::from_millis(1),
        Duration::from_millis(8),
        Duration::from_millis(1),
    )
}

fn docs() -> Vec<String> {
    vec![
        "The Mediterranean diet emphasizes fish and olive oil.".to_string(),
        "Photosynthesis converts light energy into chemical energy.".to_string(),
    ]
}

const OK_BODY: &str = r#"{"object":"list","data":[{"relevance_score":0.91,"index":1},{"relevance_score":0.12,"index":0}],"model":"rerank-2","usage":{"total_tokens":27}}"#;

#[tokio::test]
async fn provider_sends_voyage_payload_and_parses_response() {
    let server = serve(vec![(200, OK_BODY)]);
    let provider = VoyageRerankProvider::new(VoyageRerankConfig {
        api_key: Some("pa-test".to_string()),
        endpoint: server.endpoint.clone(),
        timeout: Some(Duration::from_secs(5)),
    })
    .expect("provider");

    let request = RerankRequest::new("how do plants make food", docs(), "rerank-2")
        .with_top_k(Some(2))
        .with_truncation(false);
    let response = provider.rerank(request).await.expect("rerank ok");
    server.handle.join().expect("server thread");

    assert_eq!(response.provider, "voyage");
    assert_eq!(response.model, "rerank-2");
    assert_eq!(response.total_tokens, Some(27));
    assert_eq!(response.items.len(), 2);
    assert_eq!(response.items[0].index, 1);

    let requests = server.requests.lock().expect("lock");
    let captured = &requests[0];
    assert!(captured.head.starts_with("POST /v1/rerank"));
    assert!(
        captured
            .head
            .to_ascii_lowercase()
            .contains("authorization: bearer pa-test")
    );
    assert_eq!(captured.body["query"], "how do plants make food");
    assert_eq!(captured.body["model"], "rerank-2");
    assert_eq!(captured.body["top_k"], 2);
    assert_eq!(captured.body["truncation"], false);
    assert_eq!(captured.body["return_documents"], false);
    assert_eq!(captured.body["documents"].as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn client_retries_rate_limit_and_unavailable() {
    let server = serve(vec![
        (429, r#"{"detail":"rate limited"}"#),
        (503, r#"{"detail":"overloaded"}"#),
        (200, OK_BODY),
    ]);
    let config = RerankClientConfig::new(Some("pa-test".to_string()), 3, None)
        .with_endpoint(server.endpoint.clone())
        .with_backoff(fast_backoff());
    let client = RerankClient::new(config).expect("client");

    let out = client
        .rerank("how do plants make food", &docs(), "rerank-2", Some(1), true)
        .await
        .expect("succeeds on third attempt");
    server.handle.join().expect("server thread");

    assert_eq!(server.requests.lock().expect("lock").len(), 3);
    let top = out.top().expect("top");
    assert_eq!(top.index, 1);
    assert_eq!(top.document, docs()[1]);
}

#[tokio::test]
async fn client_surfaces_original_error_when_budget_exhausted() {
    let server = serve(vec![
        (429, r#"{"detail":"first"}"#),
        (429, r#"{"detail":"second"}"#),
    ]);
    let config = RerankClientConfig::new(Some("pa-test".to_string()), 2, None)
        .with_endpoint(server.endpoint.clone())
        .with_backoff(fast_backoff());
    let client = RerankClient::new(config).expect("client");

    let err = client
        .rerank("q", &docs(), "rerank-2", None, true)
        .await
        .expect_err("budget exhausted");
    server.handle.join().expect("server thread");

    match err {
        ProviderError::RateLimited(body) => assert!(body.contains("second")),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn client_does_not_retry_bad_model() {
    let server = serve(vec![(400, r#"{"detail":"model rerank-x is not supported"}"#)]);
    let config = RerankClientConfig::new(Some("pa-test".to_string()), 4, None)
        .with_endpoint(server.endpoint.clone())
        .with_backoff(fast_backoff());
    let client = RerankClient::new(config).expect("client");

    let err = client
        .rerank("q", &docs(), "rerank-x", None, true)
        .await
        .expect_err("invalid model");
    server.handle.join().expect("server thread");

    assert!(matches!(err, ProviderError::InvalidRequest(_)));
    assert_eq!(server.requests.lock().expect("lock").len(), 1);
}

#[tokio::test]
async fn client_timeout_is_retried_then_surfaced_as_timeout() {
    let (endpoint, accepted, handle) = serve_stalled(3, Duration::from_millis(600));
    let config = RerankClientConfig::new(
        Some("pa-test".to_string()),
        3,
        Some(Duration::from_millis(100)),
    )
    .with_endpoint(endpoint)
    .with_backoff(fast_backoff());
    let client = RerankClient::new(config).expect("client");

    let err = client
        .rerank("q", &docs(), "rerank-2", None, true)
        .await
        .expect_err("every attempt times out");
    handle.join().expect("server thread");

    assert!(matches!(err, ProviderError::Timeout), "got {err:?}");
    assert_eq!(accepted.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn malformed_body_is_a_serde_error_and_not_retried() {
    let server = serve(vec![(200, "not json at all")]);
    let config = RerankClientConfig::new(Some("pa-test".to_string()), 3, None)
        .with_endpoint(server.endpoint.clone())
        .with_backoff(fast_backoff());
    let client = RerankClient::new(config).expect("client");

    let err = client
        .rerank("q", &docs(), "rerank-2", None, true)
        .await
        .expect_err("body is not json");
    server.handle.join().expect("server thread");

    assert!(matches!(err, ProviderError::Serde(_)), "got {err:?}");
    assert_eq!(server.requests.lock().expect("lock").len(), 1);
}
