//! octrace engine - builds openchain-style transaction traces
//!
//! [`OpenchainTracer`] is the VM-agnostic engine: it consumes an ordered
//! stream of frame and step callbacks through the traits in [`host`] and
//! assembles a [`octrace_common::types::TraceResult`].
//! [`OpenchainInspector`] drives it from revm.
//!
//! ```ignore
//! use octrace_engine::{OpenchainInspector, TracerConfig};
//! use revm::{Context, InspectEvm, MainBuilder, MainContext};
//!
//! let mut inspector = OpenchainInspector::new(TracerConfig::default());
//! let mut evm = Context::mainnet().with_db(db).build_mainnet_with_inspector(&mut inspector);
//! evm.inspect_one_tx(tx)?;
//! let trace = inspector.into_result()?;
//! ```

pub mod config;
pub use config::*;

pub mod error;
pub use error::*;

pub mod host;

pub mod inspector;
pub use inspector::*;

pub mod replay;
pub use replay::*;

pub mod stack;
pub use stack::*;

pub mod tracer;
pub use tracer::*;
