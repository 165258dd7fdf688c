//! Proxy errors and their HTTP mapping

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use octrace_common::types::TraceEnvelope;
use thiserror::Error;

/// Everything that can go wrong while serving a trace
#[derive(Debug, Error)]
pub enum ProxyError {
    /// The upstream node could not be reached or answered with garbage
    #[error("upstream request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The upstream node answered with a JSON-RPC error object
    #[error("upstream error {code}: {message}")]
    Rpc {
        /// JSON-RPC error code
        code: i64,
        /// JSON-RPC error message
        message: String,
    },

    /// The upstream answer lacks something the envelope needs
    #[error("malformed trace result: {0}")]
    MalformedResult(String),

    /// The requested chain is not the one this proxy serves
    #[error("unknown chain: {0}")]
    UnknownChain(String),

    /// The transaction hash in the URL does not parse
    #[error("invalid transaction hash: {0}")]
    InvalidTxHash(String),

    /// The HTTP client could not be built
    #[error("failed to build upstream client: {0}")]
    Client(#[source] reqwest::Error),
}

impl ProxyError {
    /// HTTP status used when this error is returned to a caller
    ///
    /// Upstream-reported failures still answer `200` since the request itself was served.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Transport(_) => StatusCode::BAD_GATEWAY,
            Self::Rpc { .. } | Self::MalformedResult(_) => StatusCode::OK,
            Self::UnknownChain(_) => StatusCode::NOT_FOUND,
            Self::InvalidTxHash(_) => StatusCode::BAD_REQUEST,
            Self::Client(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(TraceEnvelope::failure(self.to_string()))).into_response()
    }
}
