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

//! octrace common - shared types and utilities for the octrace components
//!
//! Both the trace engine and the trace proxy depend on this crate for the
//! trace data model, opcode classification, logging setup and the
//! environment-gated assertion macros.

/// Trace tree, side tables and result types
pub mod types;

/// Logging setup shared by every octrace component
pub mod logging;
/// Assertion macros enabled through `OCTRACE_ASSERT`
pub mod macros;
/// Opcode classification for the trace engine
pub mod opcode;

pub use logging::*;
pub use opcode::*;
pub use types::*;
