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

//! Trace tree nodes
//!
//! A trace is a tree of [`CallFrame`]s. Each frame owns its children in
//! execution order; a child is either a nested frame or a leaf event
//! (storage read, storage write, log). Every node carries the [`TracePath`]
//! it was given when appended.

use alloy_primitives::{Address, Bytes, B256, U256};
use revm::bytecode::OpCode;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use tracing::error;

use crate::{octrace_assert, types::TracePath};

/// Kind of call or creation that opened a frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallVariant {
    /// `CALL`, and the root frame of a message call transaction
    #[default]
    Call,
    /// `CALLCODE`
    CallCode,
    /// `DELEGATECALL`
    DelegateCall,
    /// `STATICCALL`
    StaticCall,
    /// `CREATE`, and the root frame of a deployment transaction
    Create,
    /// `CREATE2`
    Create2,
}

impl CallVariant {
    /// Map a call-like opcode to its variant
    pub fn from_opcode(opcode: OpCode) -> Option<Self> {
        match opcode {
            OpCode::CALL => Some(Self::Call),
            OpCode::CALLCODE => Some(Self::CallCode),
            OpCode::DELEGATECALL => Some(Self::DelegateCall),
            OpCode::STATICCALL => Some(Self::StaticCall),
            OpCode::CREATE => Some(Self::Create),
            OpCode::CREATE2 => Some(Self::Create2),
            _ => None,
        }
    }

    /// Whether this variant deploys code
    pub fn is_create(&self) -> bool {
        matches!(self, Self::Create | Self::Create2)
    }

    /// Lower-cased opcode name, as serialized
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Call => "call",
            Self::CallCode => "callcode",
            Self::DelegateCall => "delegatecall",
            Self::StaticCall => "staticcall",
            Self::Create => "create",
            Self::Create2 => "create2",
        }
    }
}

impl fmt::Display for CallVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a finalized frame, serialized as `1` (success) or `0` (failure)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallStatus {
    /// The frame reverted, halted or otherwise failed
    Failure,
    /// The frame completed successfully
    Success,
}

impl CallStatus {
    /// Status of a frame that did or did not succeed
    pub fn from_success(success: bool) -> Self {
        if success {
            Self::Success
        } else {
            Self::Failure
        }
    }

    /// Whether the frame succeeded
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

impl Serialize for CallStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(match self {
            Self::Failure => 0,
            Self::Success => 1,
        })
    }
}

impl<'de> Deserialize<'de> for CallStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match u8::deserialize(deserializer)? {
            0 => Ok(Self::Failure),
            1 => Ok(Self::Success),
            other => Err(serde::de::Error::custom(format!("invalid call status {other}"))),
        }
    }
}

/// Parameters of a call, known once the VM enters the frame
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallParams {
    /// Kind of call
    pub variant: CallVariant,
    /// Caller address
    pub from: Address,
    /// Callee: the code owner for calls, the new contract for creates
    pub to: Address,
    /// Whether `to` is a precompile
    pub is_precompile: bool,
    /// Whether this frame deploys code
    pub is_create: bool,
    /// Calldata or init code
    pub input: Bytes,
    /// Gas made available to the frame
    pub gas: u64,
    /// Value transferred, if any
    pub value: Option<U256>,
    /// Code hash of `to` when the frame is entered
    pub code_hash: B256,
}

/// One call or creation and everything recorded while it executed
///
/// A frame goes through two phases. It is *open* from the moment it is
/// appended (or entered, for the root) and is *finalized* exactly once by
/// [`CallFrame::finish`]; `gas_used`, `output` and `status` are only
/// meaningful after that, and `code_hash` is re-read then for creations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallFrame {
    /// Coordinate of this frame
    pub path: TracePath,
    /// Nested frames and leaf events, in execution order
    pub children: Vec<TraceNode>,
    /// Code hash of `to`
    #[serde(rename = "codehash")]
    pub code_hash: B256,
    /// Caller address
    pub from: Address,
    /// Gas provided to the frame
    #[serde(rename = "gas")]
    pub gas_provided: u64,
    /// Gas consumed by the frame
    pub gas_used: u64,
    /// Calldata or init code
    pub input: Bytes,
    /// Whether the callee is a precompile
    pub is_precompile: bool,
    /// Return or revert data
    pub output: Bytes,
    /// Outcome, `None` until finalized
    pub status: Option<CallStatus>,
    /// Callee address
    pub to: Address,
    /// Value transferred, `None` when the host supplied none
    pub value: Option<U256>,
    /// Kind of call
    pub variant: CallVariant,
    /// Whether this frame deploys code
    #[serde(skip)]
    pub is_create: bool,
    /// Whether call parameters have been filled in
    #[serde(skip)]
    entered: bool,
}

impl CallFrame {
    /// Create the root frame, already entered
    pub fn root(params: CallParams) -> Self {
        let mut frame = Self::placeholder(TracePath::root());
        frame.enter(params);
        frame
    }

    /// Create an empty frame at `path`, to be filled in by [`CallFrame::enter`]
    pub fn placeholder(path: TracePath) -> Self {
        Self { path, ..Default::default() }
    }

    /// Fill in the call parameters
    ///
    /// Returns `false` (and leaves the frame untouched) if the frame was
    /// already entered.
    pub fn enter(&mut self, params: CallParams) -> bool {
        octrace_assert!(!self.entered, "frame {} entered twice", self.path);
        if self.entered {
            error!(path = %self.path, "Frame already entered, ignoring call parameters");
            return false;
        }

        self.variant = params.variant;
        self.from = params.from;
        self.to = params.to;
        self.is_precompile = params.is_precompile;
        self.is_create = params.is_create;
        self.input = params.input;
        self.gas_provided = params.gas;
        self.value = params.value;
        self.code_hash = params.code_hash;
        self.entered = true;
        true
    }

    /// Finalize the frame with its outcome
    ///
    /// `code_hash` replaces the entry-time hash when given (creations only
    /// have code once the constructor returned). Returns `false` (and keeps
    /// the first outcome) if the frame was already finalized.
    pub fn finish(
        &mut self,
        output: Bytes,
        gas_used: u64,
        status: CallStatus,
        code_hash: Option<B256>,
    ) -> bool {
        octrace_assert!(self.status.is_none(), "frame {} finalized twice", self.path);
        if self.status.is_some() {
            error!(path = %self.path, "Frame already finalized, ignoring second outcome");
            return false;
        }

        self.gas_used = gas_used;
        self.output = output;
        self.status = Some(status);
        if let Some(code_hash) = code_hash {
            self.code_hash = code_hash;
        }
        true
    }

    /// Whether call parameters have been filled in
    pub fn is_entered(&self) -> bool {
        self.entered
    }

    /// Whether the frame has been finalized
    pub fn is_finalized(&self) -> bool {
        self.status.is_some()
    }

    /// Path the next appended child will get
    pub fn next_child_path(&self) -> TracePath {
        self.path.child(self.children.len())
    }

    /// Append a child built from its freshly allocated path
    ///
    /// Returns the index of the new child.
    pub fn append(&mut self, build: impl FnOnce(TracePath) -> TraceNode) -> usize {
        let index = self.children.len();
        let node = build(self.path.child(index));
        self.children.push(node);
        index
    }

    /// Nested frame at child `index`, if that child is a call
    pub fn child_frame(&self, index: usize) -> Option<&Self> {
        match self.children.get(index) {
            Some(TraceNode::Call(frame)) => Some(frame),
            _ => None,
        }
    }

    /// Mutable nested frame at child `index`, if that child is a call
    pub fn child_frame_mut(&mut self, index: usize) -> Option<&mut Self> {
        match self.children.get_mut(index) {
            Some(TraceNode::Call(frame)) => Some(frame),
            _ => None,
        }
    }

    /// Number of nodes in this subtree, including this frame
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(TraceNode::node_count).sum::<usize>()
    }

    /// Look up a node of this subtree by its path
    pub fn find(&self, path: &TracePath) -> Option<&TraceNode> {
        let relative = path.as_str().strip_prefix(self.path.as_str())?;
        let mut indices = relative
            .strip_prefix('.')?
            .split('.')
            .map(|segment| segment.parse::<usize>().ok());

        let mut node = self.children.get(indices.next()??)?;
        for index in indices {
            match node {
                TraceNode::Call(frame) => node = frame.children.get(index?)?,
                _ => return None,
            }
        }
        Some(node)
    }

    /// Visit every frame of this subtree, parents before children
    pub fn frames(&self) -> Vec<&Self> {
        let mut frames = vec![self];
        let mut index = 0;
        while index < frames.len() {
            let frame = frames[index];
            frames.extend(frame.children.iter().filter_map(|child| match child {
                TraceNode::Call(nested) => Some(nested),
                _ => None,
            }));
            index += 1;
        }
        frames
    }
}

/// `SLOAD` observed in a frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageRead {
    /// Coordinate of this node
    pub path: TracePath,
    /// Storage slot
    pub slot: B256,
    /// Value stored in the slot when read
    pub value: B256,
}

/// `SSTORE` observed in a frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageWrite {
    /// Coordinate of this node
    pub path: TracePath,
    /// Storage slot
    pub slot: B256,
    /// Value being written
    pub new_value: B256,
    /// Value stored before the write
    pub old_value: B256,
}

/// `LOG0`..`LOG4` observed in a frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Coordinate of this node
    pub path: TracePath,
    /// Log payload copied from memory
    pub data: Bytes,
    /// Topics, outermost operand first
    pub topics: Vec<B256>,
}

/// A child of a [`CallFrame`], discriminated by `type` when serialized
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TraceNode {
    /// Nested call or creation
    Call(CallFrame),
    /// Storage read
    Sload(StorageRead),
    /// Storage write
    Sstore(StorageWrite),
    /// Emitted log
    Log(LogEntry),
}

impl TraceNode {
    /// Coordinate of this node
    pub fn path(&self) -> &TracePath {
        match self {
            Self::Call(frame) => &frame.path,
            Self::Sload(read) => &read.path,
            Self::Sstore(write) => &write.path,
            Self::Log(log) => &log.path,
        }
    }

    /// The `type` tag this node serializes with
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Call(_) => "call",
            Self::Sload(_) => "sload",
            Self::Sstore(_) => "sstore",
            Self::Log(_) => "log",
        }
    }

    /// Number of nodes in this subtree
    pub fn node_count(&self) -> usize {
        match self {
            Self::Call(frame) => frame.node_count(),
            _ => 1,
        }
    }

    /// The nested frame, if this is a call
    pub fn as_call(&self) -> Option<&CallFrame> {
        match self {
            Self::Call(frame) => Some(frame),
            _ => None,
        }
    }
}
