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

use thiserror::Error;

/// Errors that can occur while assembling or configuring a trace.
///
/// Execution failures of the traced transaction are never errors here; they
/// are recorded as a failed status on the frame.
#[derive(Debug, Error)]
pub enum TraceError {
    /// The frame stack did not unwind back to the root frame
    #[error("malformed trace: frame stack depth is {depth}, expected 1")]
    UnbalancedFrames {
        /// Depth at the time the result was requested
        depth: usize,
    },
    /// Callbacks arrived while no frame was open to receive them
    #[error("malformed trace: {count} event(s) arrived with no open frame")]
    OrphanEvents {
        /// Number of dropped callbacks
        count: usize,
    },
    /// The tracer configuration object could not be parsed
    #[error("invalid tracer config: {0}")]
    InvalidConfig(#[source] serde_json::Error),
    /// The trace could not be converted to JSON
    #[error("failed to serialize trace: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl TraceError {
    /// Whether the callback stream itself was inconsistent
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::UnbalancedFrames { .. } | Self::OrphanEvents { .. })
    }
}
