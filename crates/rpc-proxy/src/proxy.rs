//! HTTP server exposing traces as browser-friendly envelopes

use alloy_primitives::B256;
use axum::{
    extract::{Path, State},
    http::Method,
    response::Json,
    routing::get,
    Router,
};
use eyre::Result;
use octrace_common::types::{TraceEnvelope, TraceEnvelopeResult};
use serde_json::Value;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{debug, info};

use crate::{ProxyConfig, ProxyError, UpstreamClient};

/// Route serving one trace
pub const TRACE_ROUTE: &str = "/api/v1/trace/{chain}/{txhash}";

/// Trace proxy: one upstream node, one chain
#[derive(Debug, Clone)]
pub struct TraceProxy {
    config: Arc<ProxyConfig>,
    upstream: Arc<UpstreamClient>,
}

impl TraceProxy {
    /// Create a proxy from its configuration
    pub fn new(config: ProxyConfig) -> Result<Self, ProxyError> {
        let upstream = UpstreamClient::new(&config)?;
        Ok(Self { config: Arc::new(config), upstream: Arc::new(upstream) })
    }

    /// The active configuration
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    /// Axum router with the trace route, CORS open to any origin, and request tracing
    pub fn router(self) -> Router {
        let cors = CorsLayer::new()
            .allow_methods([Method::GET, Method::OPTIONS])
            .allow_headers(Any)
            .allow_origin(Any);

        Router::new()
            .route(TRACE_ROUTE, get(handle_trace))
            .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(cors))
            .with_state(self)
    }

    /// Bind the configured address and serve until the task is dropped
    pub async fn serve(self) -> Result<()> {
        let listener = TcpListener::bind(self.config.listen).await?;
        self.serve_on(listener).await
    }

    /// Serve on an already bound listener
    pub async fn serve_on(self, listener: TcpListener) -> Result<()> {
        info!(
            "octrace proxy listening on {} (chain {}, upstream {})",
            listener.local_addr()?,
            self.config.chain,
            self.upstream.url()
        );
        axum::serve(listener, self.router()).await?;
        Ok(())
    }
}

async fn handle_trace(
    State(proxy): State<TraceProxy>,
    Path((chain, txhash)): Path<(String, String)>,
) -> Result<Json<TraceEnvelope>, ProxyError> {
    debug!(%chain, %txhash, "Received trace request");

    if chain != proxy.config.chain {
        return Err(ProxyError::UnknownChain(chain));
    }
    let txhash: B256 = txhash.parse().map_err(|_| ProxyError::InvalidTxHash(txhash))?;

    let result = proxy.upstream.trace_transaction(txhash).await?;
    let envelope = envelope_result(chain, txhash, result)?;
    Ok(Json(TraceEnvelope::success(envelope)))
}

/// Wrap a raw tracer result for `chain`/`txhash`
fn envelope_result(
    chain: String,
    txhash: B256,
    mut result: Value,
) -> Result<TraceEnvelopeResult, ProxyError> {
    let mut take = |field: &str| {
        result
            .get_mut(field)
            .map(Value::take)
            .ok_or_else(|| ProxyError::MalformedResult(format!("missing `{field}`")))
    };

    let entrypoint = take("entrypoint")?;
    let preimages = take("preimages")?;
    let addresses = take("addresses")?;
    Ok(TraceEnvelopeResult { chain, entrypoint, preimages, addresses, txhash })
}
