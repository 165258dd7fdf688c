//! Inspectors bridging revm execution into the trace engine

mod openchain_inspector;

pub use openchain_inspector::*;
