// Copyright (C) 2024 Zhuo Zhang and Wuqi Zhang
// SPDX-License-Identifier: AGPL-3.0
//! octrace Trace Proxy Library
//!
//! A small HTTP front-end that asks an upstream node to run the openchain tracer on a
//! transaction and hands the result to browsers as a `{ok, result | error}` envelope.

pub mod config;
pub mod error;
pub mod proxy;
pub mod upstream;

pub use config::ProxyConfig;
pub use error::ProxyError;
pub use proxy::TraceProxy;
pub use upstream::UpstreamClient;
