// EDB - Ethereum Debugger
// Copyright (C) 2024 Zhuo Zhang and Wuqi Zhang
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! octrace Trace Proxy
//!
//! Serves `GET /api/v1/trace/{chain}/{txhash}` by asking an upstream node to run the
//! openchain tracer and wrapping its answer into a `{ok, result | error}` envelope.

use clap::Parser;
use eyre::Result;
use octrace_common::init_logging;
use octrace_proxy::{ProxyConfig, TraceProxy};
use std::{
    net::{IpAddr, SocketAddr},
    str::FromStr,
};
use tracing::info;

/// octrace Trace Proxy
#[derive(Parser, Debug)]
#[command(name = "octrace-proxy")]
#[command(about = "HTTP front-end serving openchain-style transaction traces")]
#[command(version)]
struct Args {
    /// Address to bind to
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(long, default_value = "2000")]
    port: u16,

    /// JSON-RPC endpoint of the node running the tracer
    /// Example: --node-url http://127.0.0.1:8545
    #[arg(long, default_value = "http://127.0.0.1:8545")]
    node_url: String,

    /// Chain name served by this proxy
    #[arg(long, default_value = "ethereum")]
    chain: String,

    /// Tracer requested from the node
    #[arg(long, default_value = "openchainTracer")]
    tracer: String,

    /// Upstream request timeout in seconds
    #[arg(long, default_value = "30")]
    timeout: u64,

    /// Disable the log file next to console output
    #[arg(long)]
    no_log_file: bool,

    /// Verbosity level (repeat for more: -v, -vv, -vvv)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Args {
    fn into_config(self) -> Result<ProxyConfig> {
        let ip = IpAddr::from_str(&self.host)?;
        Ok(ProxyConfig::default()
            .listen(SocketAddr::from((ip, self.port)))
            .node_url(self.node_url)
            .chain(self.chain)
            .tracer(self.tracer)
            .timeout_secs(self.timeout))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Set RUST_LOG based on verbosity
    if std::env::var("RUST_LOG").is_err() {
        let level = match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        };
        std::env::set_var("RUST_LOG", level);
    }

    init_logging("octrace-proxy", !args.no_log_file)?;

    let config = args.into_config()?;
    let proxy = TraceProxy::new(config)?;

    tokio::select! {
        result = proxy.serve() => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
    }

    Ok(())
}
