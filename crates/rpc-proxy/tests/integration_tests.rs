//! Integration tests for the trace proxy

use octrace_proxy::{ProxyConfig, TraceProxy};
use reqwest::Client;
use serde_json::{json, Value};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use wiremock::{
    matchers::{body_partial_json, method},
    Mock, MockServer, ResponseTemplate,
};

const TXHASH: &str = "0x5e2bb3ce2ea4a9d2a1d3b5d6a2a7fbd6a0fbb0c4bf8f2e5bd1c0e8f1d2c3b4a5";

fn sample_trace() -> Value {
    json!({
        "entrypoint": {
            "type": "call",
            "path": "0",
            "variant": "call",
            "status": 1,
            "children": []
        },
        "preimages": {},
        "addresses": {}
    })
}

/// Start a proxy on a random local port and return its address
async fn start_proxy(config: ProxyConfig) -> SocketAddr {
    octrace_common::logging::ensure_test_logging(None);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let proxy = TraceProxy::new(config).unwrap();

    tokio::spawn(async move {
        proxy.serve_on(listener).await.unwrap();
    });
    addr
}

async fn proxy_for(upstream: &MockServer) -> SocketAddr {
    start_proxy(ProxyConfig::default().node_url(upstream.uri()).timeout_secs(5)).await
}

fn trace_url(addr: SocketAddr, chain: &str, txhash: &str) -> String {
    format!("http://{addr}/api/v1/trace/{chain}/{txhash}")
}

#[tokio::test]
async fn test_trace_is_wrapped_in_envelope() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "method": "debug_traceTransaction",
            "params": [TXHASH, {"tracer": "openchainTracer"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": sample_trace()
        })))
        .expect(1)
        .mount(&upstream)
        .await;

    let addr = proxy_for(&upstream).await;
    let response = Client::new().get(trace_url(addr, "ethereum", TXHASH)).send().await.unwrap();
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["ok"], json!(true));
    assert!(body.get("error").is_none());
    assert_eq!(body["result"]["chain"], json!("ethereum"));
    assert_eq!(body["result"]["txhash"], json!(TXHASH));
    assert_eq!(body["result"]["entrypoint"], sample_trace()["entrypoint"]);
    assert_eq!(body["result"]["preimages"], json!({}));
    assert_eq!(body["result"]["addresses"], json!({}));
}

#[tokio::test]
async fn test_custom_tracer_name_is_forwarded() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"params": [TXHASH, {"tracer": "myTracer"}]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": sample_trace()
        })))
        .expect(1)
        .mount(&upstream)
        .await;

    let config = ProxyConfig::default().node_url(upstream.uri()).tracer("myTracer");
    let addr = start_proxy(config).await;
    let body: Value = Client::new()
        .get(trace_url(addr, "ethereum", TXHASH))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["ok"], json!(true));
}

#[tokio::test]
async fn test_upstream_rpc_error_is_reported() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": {"code": -32000, "message": "transaction not found"}
        })))
        .mount(&upstream)
        .await;

    let addr = proxy_for(&upstream).await;
    let response = Client::new().get(trace_url(addr, "ethereum", TXHASH)).send().await.unwrap();
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["ok"], json!(false));
    assert!(body.get("result").is_none());
    assert!(body["error"].as_str().unwrap().contains("transaction not found"));
}

#[tokio::test]
async fn test_result_missing_fields_is_reported() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": {"entrypoint": {}}
        })))
        .mount(&upstream)
        .await;

    let addr = proxy_for(&upstream).await;
    let response = Client::new().get(trace_url(addr, "ethereum", TXHASH)).send().await.unwrap();
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["ok"], json!(false));
    assert!(body["error"].as_str().unwrap().contains("preimages"));
}

#[tokio::test]
async fn test_unreachable_upstream_is_bad_gateway() {
    // Grab a free port and release it so nothing listens there
    let closed = TcpListener::bind("127.0.0.1:0").await.unwrap().local_addr().unwrap();

    let config = ProxyConfig::default().node_url(format!("http://{closed}")).timeout_secs(2);
    let addr = start_proxy(config).await;
    let response = Client::new().get(trace_url(addr, "ethereum", TXHASH)).send().await.unwrap();
    assert_eq!(response.status(), 502);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["ok"], json!(false));
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_other_chain_is_not_found() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": sample_trace()})))
        .expect(0)
        .mount(&upstream)
        .await;

    let addr = proxy_for(&upstream).await;
    let response = Client::new().get(trace_url(addr, "polygon", TXHASH)).send().await.unwrap();
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_invalid_txhash_is_rejected() {
    let upstream = MockServer::start().await;
    let addr = proxy_for(&upstream).await;

    let response = Client::new().get(trace_url(addr, "ethereum", "0x1234")).send().await.unwrap();
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["ok"], json!(false));
}

#[tokio::test]
async fn test_cors_allows_any_origin() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": sample_trace()
        })))
        .mount(&upstream)
        .await;

    let addr = proxy_for(&upstream).await;
    let response = Client::new()
        .get(trace_url(addr, "ethereum", TXHASH))
        .header("Origin", "https://example.org")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let allow_origin = response.headers().get("access-control-allow-origin").unwrap();
    assert_eq!(allow_origin, "*");
}
