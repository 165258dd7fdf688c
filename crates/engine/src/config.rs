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

use serde::{Deserialize, Serialize};

use crate::TraceError;

/// Largest memory region copied for a single log or hash, 16 MiB
pub const DEFAULT_MEMORY_COPY_LIMIT: usize = 16 * 1024 * 1024;

/// Configuration for the trace engine.
///
/// Accepts the same JSON object a node hands to a native tracer; every field
/// is optional, so `{}` yields the defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TracerConfig {
    /// Record `KECCAK256` preimages
    pub with_preimages: bool,
    /// Register finalized frames in the address book
    pub with_address_book: bool,
    /// Upper bound on a single memory copy; larger log payloads are truncated
    /// and larger preimages are not recorded
    pub memory_copy_limit: usize,
}

impl Default for TracerConfig {
    fn default() -> Self {
        Self {
            with_preimages: true,
            with_address_book: true,
            memory_copy_limit: DEFAULT_MEMORY_COPY_LIMIT,
        }
    }
}

impl TracerConfig {
    /// Parse a raw tracer config; `null` and empty input yield the defaults
    pub fn from_json(raw: &str) -> Result<Self, TraceError> {
        let raw = raw.trim();
        if raw.is_empty() || raw == "null" {
            return Ok(Self::default());
        }
        serde_json::from_str(raw).map_err(TraceError::InvalidConfig)
    }

    /// Enable or disable preimage recording
    pub fn with_preimages(mut self, enabled: bool) -> Self {
        self.with_preimages = enabled;
        self
    }

    /// Enable or disable address book registration
    pub fn with_address_book(mut self, enabled: bool) -> Self {
        self.with_address_book = enabled;
        self
    }

    /// Set the memory copy limit in bytes
    pub fn with_memory_copy_limit(mut self, limit: usize) -> Self {
        self.memory_copy_limit = limit;
        self
    }
}
