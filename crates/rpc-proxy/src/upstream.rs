//! JSON-RPC client for the node running the tracer

use alloy_primitives::B256;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

use crate::{ProxyConfig, ProxyError};

/// Client issuing `debug_traceTransaction` calls against one upstream node
#[derive(Debug)]
pub struct UpstreamClient {
    client: reqwest::Client,
    url: String,
    tracer: String,
    next_id: AtomicU64,
}

impl UpstreamClient {
    /// Build a client from the proxy configuration
    pub fn new(config: &ProxyConfig) -> Result<Self, ProxyError> {
        let client =
            reqwest::Client::builder().timeout(config.timeout).build().map_err(ProxyError::Client)?;

        Ok(Self {
            client,
            url: config.node_url.clone(),
            tracer: config.tracer.clone(),
            next_id: AtomicU64::new(1),
        })
    }

    /// Upstream node URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Ask the node to trace `txhash` and return the tracer's raw result
    pub async fn trace_transaction(&self, txhash: B256) -> Result<Value, ProxyError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = json!({
            "jsonrpc": "2.0",
            "method": "debug_traceTransaction",
            "params": [txhash, { "tracer": self.tracer }],
            "id": id,
        });
        debug!(%txhash, id, "Forwarding trace request upstream");

        let response = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        let body: Value = response.json().await?;
        rpc_result(body)
    }
}

/// Pull `result` out of a JSON-RPC response body
fn rpc_result(mut body: Value) -> Result<Value, ProxyError> {
    if let Some(error) = body.get("error") {
        let code = error.get("code").and_then(Value::as_i64).unwrap_or_default();
        let message =
            error.get("message").and_then(Value::as_str).unwrap_or("unknown error").to_string();
        warn!(code, %message, "Upstream returned a JSON-RPC error");
        return Err(ProxyError::Rpc { code, message });
    }

    match body.get_mut("result").map(Value::take) {
        Some(Value::Null) | None => {
            Err(ProxyError::MalformedResult("response carries no result".to_string()))
        }
        Some(result) => Ok(result),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rpc_result_extracts_result() {
        let body = json!({"jsonrpc": "2.0", "id": 1, "result": {"entrypoint": {}}});
        assert_eq!(rpc_result(body).unwrap(), json!({"entrypoint": {}}));
    }

    #[test]
    fn test_rpc_result_maps_error_object() {
        let body = json!({"jsonrpc": "2.0", "id": 1, "error": {"code": -32000, "message": "boom"}});
        let err = rpc_result(body).unwrap_err();
        assert!(matches!(err, ProxyError::Rpc { code: -32000, ref message } if message == "boom"));
    }

    #[test]
    fn test_rpc_result_rejects_missing_result() {
        let err = rpc_result(json!({"jsonrpc": "2.0", "id": 1})).unwrap_err();
        assert!(matches!(err, ProxyError::MalformedResult(_)));

        let err = rpc_result(json!({"jsonrpc": "2.0", "id": 1, "result": null})).unwrap_err();
        assert!(matches!(err, ProxyError::MalformedResult(_)));
    }
}
