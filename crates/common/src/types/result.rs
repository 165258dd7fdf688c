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

use alloy_primitives::B256;
use serde::{Deserialize, Serialize};

use crate::types::{AddressBook, CallFrame, PreimageLedger, TraceNode, TracePath};

/// The assembled trace of one transaction
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceResult {
    /// Root frame, serialized with its `"type": "call"` tag
    #[serde(with = "tagged_call")]
    pub entrypoint: CallFrame,
    /// Hash preimages observed during execution
    pub preimages: PreimageLedger,
    /// Contracts touched by finalized frames
    pub addresses: AddressBook,
}

impl TraceResult {
    /// Number of nodes in the tree, root included
    pub fn node_count(&self) -> usize {
        self.entrypoint.node_count()
    }

    /// Look up any node by its path; the root path yields `None` since the
    /// root is not a child node (use [`TraceResult::entrypoint`])
    pub fn find(&self, path: &TracePath) -> Option<&TraceNode> {
        self.entrypoint.find(path)
    }

    /// Convert the trace into a JSON value
    pub fn to_json_value(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }
}

/// Response body of the trace proxy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceEnvelope {
    /// Whether a trace was produced
    pub ok: bool,
    /// The trace, on success
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<TraceEnvelopeResult>,
    /// Reason for failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TraceEnvelope {
    /// Successful envelope
    pub fn success(result: TraceEnvelopeResult) -> Self {
        Self { ok: true, result: Some(result), error: None }
    }

    /// Failed envelope
    pub fn failure(error: impl Into<String>) -> Self {
        Self { ok: false, result: None, error: Some(error.into()) }
    }
}

/// A trace annotated with where it came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceEnvelopeResult {
    /// Chain name, as requested
    pub chain: String,
    /// Root frame
    pub entrypoint: serde_json::Value,
    /// Hash preimages
    pub preimages: serde_json::Value,
    /// Contract address book
    pub addresses: serde_json::Value,
    /// Traced transaction
    pub txhash: B256,
}

/// Serialize a [`CallFrame`] the way it appears as a child node
mod tagged_call {
    use serde::{de::Error, Deserialize, Deserializer, Serialize, Serializer};

    use crate::types::{CallFrame, TraceNode};

    #[derive(Serialize)]
    #[serde(tag = "type", rename_all = "lowercase")]
    enum TaggedRef<'a> {
        Call(&'a CallFrame),
    }

    pub(super) fn serialize<S: Serializer>(frame: &CallFrame, serializer: S) -> Result<S::Ok, S::Error> {
        TaggedRef::Call(frame).serialize(serializer)
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<CallFrame, D::Error> {
        match TraceNode::deserialize(deserializer)? {
            TraceNode::Call(frame) => Ok(frame),
            other => Err(D::Error::custom(format!("entrypoint must be a call, got {}", other.kind()))),
        }
    }
}
