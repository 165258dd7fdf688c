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

use revm::bytecode::OpCode;

use crate::types::CallVariant;

/// What the trace engine does with a single step, decided by its opcode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    /// `SLOAD`: record a storage-read leaf
    StorageRead,
    /// `SSTORE`: record a storage-write leaf
    StorageWrite,
    /// `LOG0`..`LOG4`: record a log leaf with this many topics
    Log(usize),
    /// `KECCAK256`: record a preimage, no leaf
    Hash,
    /// Call-like opcode: open a placeholder frame
    Call(CallVariant),
    /// Anything else passes through
    Other,
}

/// Extended trait for classifying EVM opcodes during tracing
pub trait OpcodeTr {
    /// Check if this opcode is a call instruction
    fn is_call(&self) -> bool;

    /// Number of topics for `LOG0`..`LOG4`, `None` for every other opcode
    ///
    /// # Example
    /// ```rust
    /// use revm::bytecode::OpCode;
    /// use octrace_common::OpcodeTr;
    ///
    /// assert_eq!(OpCode::LOG0.log_topic_count(), Some(0));
    /// assert_eq!(OpCode::LOG4.log_topic_count(), Some(4));
    /// assert_eq!(OpCode::SSTORE.log_topic_count(), None);
    /// ```
    fn log_topic_count(&self) -> Option<usize>;

    /// Classify the opcode for the trace engine
    fn step_kind(&self) -> StepKind;

    /// Number of operands the instruction pops
    fn stack_inputs(&self) -> usize;
}

impl OpcodeTr for OpCode {
    fn is_call(&self) -> bool {
        matches!(
            *self,
            Self::CREATE
                | Self::CREATE2
                | Self::CALL
                | Self::CALLCODE
                | Self::DELEGATECALL
                | Self::STATICCALL
        )
    }

    fn log_topic_count(&self) -> Option<usize> {
        match *self {
            Self::LOG0 | Self::LOG1 | Self::LOG2 | Self::LOG3 | Self::LOG4 => {
                Some((self.get() - Self::LOG0.get()) as usize)
            }
            _ => None,
        }
    }

    fn step_kind(&self) -> StepKind {
        if let Some(topics) = self.log_topic_count() {
            return StepKind::Log(topics);
        }
        if let Some(variant) = CallVariant::from_opcode(*self) {
            return StepKind::Call(variant);
        }
        match *self {
            Self::SLOAD => StepKind::StorageRead,
            Self::SSTORE => StepKind::StorageWrite,
            Self::KECCAK256 => StepKind::Hash,
            _ => StepKind::Other,
        }
    }

    fn stack_inputs(&self) -> usize {
        self.info().inputs() as usize
    }
}
