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

//! Boundary between the trace engine and the VM driving it
//!
//! The engine never touches VM internals directly. Each callback hands it
//! read-only views of the interpreter (operand stack, memory) and a state
//! accessor for the storage and code hash lookups it needs. The revm
//! adapter in [`crate::inspector`] implements these traits; tests use the
//! plain implementations below.

use alloy_primitives::{Address, Bytes, B256, U256};
use revm::bytecode::OpCode;
use std::collections::HashMap;

/// Operand stack of the executing frame, indexed from the top
pub trait OperandStack {
    /// Number of operands
    fn len(&self) -> usize;

    /// Whether the stack is empty
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Operand `n` slots below the top, without consuming it
    fn peek(&self, n: usize) -> Option<U256>;
}

/// Memory of the executing frame
pub trait MemoryView {
    /// Current memory size in bytes
    fn len(&self) -> usize;

    /// Whether memory is empty
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy `len` bytes starting at `offset`; bytes past the end read as zero
    fn copy(&self, offset: usize, len: usize) -> Vec<u8>;
}

/// World state lookups
pub trait StateAccessor {
    /// Current value of `slot` in the storage of `address`
    fn stored_value(&mut self, address: Address, slot: B256) -> B256;

    /// Code hash of `address`, zero if the account does not exist
    fn code_hash(&mut self, address: Address) -> B256;
}

/// A single interpreter step, as seen before the instruction executes
pub struct Step<'a> {
    /// Program counter
    pub pc: usize,
    /// Opcode about to execute
    pub opcode: OpCode,
    /// Gas left in the frame
    pub gas_remaining: u64,
    /// Static cost of the instruction
    pub gas_cost: u64,
    /// Call depth, 0 for the root frame
    pub depth: usize,
    /// Address whose storage is in scope
    pub contract: Address,
    /// Operand stack
    pub stack: &'a dyn OperandStack,
    /// Memory
    pub memory: &'a dyn MemoryView,
}

impl std::fmt::Debug for Step<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Step")
            .field("pc", &self.pc)
            .field("opcode", &self.opcode.as_str())
            .field("gas_remaining", &self.gas_remaining)
            .field("depth", &self.depth)
            .field("contract", &self.contract)
            .field("stack_len", &self.stack.len())
            .field("memory_len", &self.memory.len())
            .finish()
    }
}

/// Parameters of a frame as reported by the VM when it is entered
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameInput {
    /// Caller
    pub from: Address,
    /// Callee: code owner for calls, new contract for creations
    pub to: Address,
    /// Whether `to` is a precompile
    pub is_precompile: bool,
    /// Whether the frame deploys code
    pub is_create: bool,
    /// Calldata or init code
    pub input: Bytes,
    /// Gas made available to the frame
    pub gas: u64,
    /// Value transferred, if the VM reports one
    pub value: Option<U256>,
}

/// Stack stored bottom-first, so the last element is the top
impl OperandStack for [U256] {
    fn len(&self) -> usize {
        <[U256]>::len(self)
    }

    fn peek(&self, n: usize) -> Option<U256> {
        let len = <[U256]>::len(self);
        n.checked_add(1).and_then(|depth| len.checked_sub(depth)).map(|index| self[index])
    }
}

impl OperandStack for Vec<U256> {
    fn len(&self) -> usize {
        self.as_slice().len()
    }

    fn peek(&self, n: usize) -> Option<U256> {
        OperandStack::peek(self.as_slice(), n)
    }
}

impl MemoryView for [u8] {
    fn len(&self) -> usize {
        <[u8]>::len(self)
    }

    fn copy(&self, offset: usize, len: usize) -> Vec<u8> {
        copy_zero_padded(self, offset, len)
    }
}

impl MemoryView for Vec<u8> {
    fn len(&self) -> usize {
        self.as_slice().len()
    }

    fn copy(&self, offset: usize, len: usize) -> Vec<u8> {
        copy_zero_padded(self, offset, len)
    }
}

/// Copy `memory[offset..offset + len]`, zero-filling whatever lies past the end
pub fn copy_zero_padded(memory: &[u8], offset: usize, len: usize) -> Vec<u8> {
    let mut out = vec![0u8; len];
    if offset < memory.len() {
        let end = offset.saturating_add(len).min(memory.len());
        out[..end - offset].copy_from_slice(&memory[offset..end]);
    }
    out
}

/// World state held in plain maps
///
/// Unknown slots read as zero and unknown accounts have a zero code hash.
#[derive(Debug, Clone, Default)]
pub struct InMemoryState {
    storage: HashMap<(Address, B256), B256>,
    code_hashes: HashMap<Address, B256>,
}

impl InMemoryState {
    /// Create an empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a storage slot
    pub fn set_storage(&mut self, address: Address, slot: B256, value: B256) {
        self.storage.insert((address, slot), value);
    }

    /// Set the code hash of an account
    pub fn set_code_hash(&mut self, address: Address, code_hash: B256) {
        self.code_hashes.insert(address, code_hash);
    }
}

impl StateAccessor for InMemoryState {
    fn stored_value(&mut self, address: Address, slot: B256) -> B256 {
        self.storage.get(&(address, slot)).copied().unwrap_or_default()
    }

    fn code_hash(&mut self, address: Address) -> B256 {
        self.code_hashes.get(&address).copied().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peek_counts_from_top() {
        let stack = vec![U256::from(1), U256::from(2), U256::from(3)];
        assert_eq!(OperandStack::peek(&stack, 0), Some(U256::from(3)));
        assert_eq!(OperandStack::peek(&stack, 2), Some(U256::from(1)));
        assert_eq!(OperandStack::peek(&stack, 3), None);
        assert_eq!(OperandStack::peek(&stack, usize::MAX), None);
    }

    #[test]
    fn test_copy_zero_pads_past_end() {
        let memory = vec![1u8, 2, 3, 4];
        assert_eq!(MemoryView::copy(&memory, 1, 2), vec![2, 3]);
        assert_eq!(MemoryView::copy(&memory, 2, 4), vec![3, 4, 0, 0]);
        assert_eq!(MemoryView::copy(&memory, 10, 3), vec![0, 0, 0]);
        assert!(MemoryView::copy(&memory, 0, 0).is_empty());
    }

    #[test]
    fn test_in_memory_state_defaults_to_zero() {
        let mut state = InMemoryState::new();
        let addr = Address::with_last_byte(1);
        assert_eq!(state.stored_value(addr, B256::ZERO), B256::ZERO);
        assert_eq!(state.code_hash(addr), B256::ZERO);

        state.set_storage(addr, B256::ZERO, B256::with_last_byte(9));
        state.set_code_hash(addr, B256::with_last_byte(7));
        assert_eq!(state.stored_value(addr, B256::ZERO), B256::with_last_byte(9));
        assert_eq!(state.code_hash(addr), B256::with_last_byte(7));
    }
}
