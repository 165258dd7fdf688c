//! Proxy configuration

use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    time::Duration,
};

/// Default port the proxy listens on
pub const DEFAULT_PORT: u16 = 2000;
/// Default upstream node
pub const DEFAULT_NODE_URL: &str = "http://127.0.0.1:8545";
/// Default chain name served under `/api/v1/trace/{chain}/...`
pub const DEFAULT_CHAIN: &str = "ethereum";
/// Default tracer name requested from the upstream node
pub const DEFAULT_TRACER: &str = "openchainTracer";
/// Default upstream request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Runtime configuration of a [`crate::TraceProxy`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    /// Address the HTTP server binds to
    pub listen: SocketAddr,
    /// JSON-RPC endpoint of the node running the tracer
    pub node_url: String,
    /// The only chain name this proxy answers for
    pub chain: String,
    /// Tracer name passed to `debug_traceTransaction`
    pub tracer: String,
    /// Timeout for each upstream request
    pub timeout: Duration,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from((IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_PORT)),
            node_url: DEFAULT_NODE_URL.to_string(),
            chain: DEFAULT_CHAIN.to_string(),
            tracer: DEFAULT_TRACER.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl ProxyConfig {
    /// Set the listen address
    pub fn listen(mut self, listen: SocketAddr) -> Self {
        self.listen = listen;
        self
    }

    /// Set the upstream node URL
    pub fn node_url(mut self, url: impl Into<String>) -> Self {
        self.node_url = url.into();
        self
    }

    /// Set the served chain name
    pub fn chain(mut self, chain: impl Into<String>) -> Self {
        self.chain = chain.into();
        self
    }

    /// Set the tracer name requested upstream
    pub fn tracer(mut self, tracer: impl Into<String>) -> Self {
        self.tracer = tracer.into();
        self
    }

    /// Set the upstream timeout in seconds
    pub fn timeout_secs(mut self, seconds: u64) -> Self {
        self.timeout = Duration::from_secs(seconds);
        self
    }
}
