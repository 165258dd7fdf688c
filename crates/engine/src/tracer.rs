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

//! Trace-tree construction engine
//!
//! [`OpenchainTracer`] turns the ordered callback stream of a VM executing one
//! transaction into a tree of call frames with storage, log and nested call
//! children, a preimage ledger and an address book.
//!
//! # Callback order
//!
//! 1. [`OpenchainTracer::begin_root`] once
//! 2. any number of [`OpenchainTracer::step`], [`OpenchainTracer::enter_call`]
//!    and [`OpenchainTracer::exit_call`], with enters and exits balanced
//! 3. [`OpenchainTracer::end_root`] once
//!
//! The engine never panics on a misordered stream (unless `OCTRACE_ASSERT`
//! is set); it logs, drops what it cannot place, and reports the damage from
//! [`OpenchainTracer::result`].

use alloy_primitives::{Bytes, B256, U256};
use octrace_common::{
    octrace_assert,
    types::{
        AddressBook, CallFrame, CallParams, CallStatus, CallVariant, LogEntry, PreimageLedger,
        StorageRead, StorageWrite, TraceNode, TraceResult,
    },
    OpcodeTr, StepKind,
};
use tracing::{debug, error, trace, warn};

use crate::{
    host::{FrameInput, StateAccessor, Step},
    FrameStack, TraceError, TracerConfig,
};

/// Builds the trace of a single transaction from VM callbacks
#[derive(Debug, Default)]
pub struct OpenchainTracer {
    config: TracerConfig,
    root: Option<CallFrame>,
    stack: FrameStack,
    preimages: PreimageLedger,
    addresses: AddressBook,
    orphans: usize,
}

impl OpenchainTracer {
    /// Create a tracer for one transaction
    pub fn new(config: TracerConfig) -> Self {
        Self { config, ..Default::default() }
    }

    /// Configuration in use
    pub fn config(&self) -> &TracerConfig {
        &self.config
    }

    /// Number of open frames
    pub fn depth(&self) -> usize {
        self.stack.depth()
    }

    /// Root frame, once the transaction has begun
    pub fn root(&self) -> Option<&CallFrame> {
        self.root.as_ref()
    }

    /// Currently executing frame
    pub fn current_frame(&self) -> Option<&CallFrame> {
        self.stack.top(self.root.as_ref()?)
    }

    /// Open the root frame
    pub fn begin_root(&mut self, frame: FrameInput, state: &mut dyn StateAccessor) {
        if self.root.is_some() {
            error!(to = %frame.to, "Root frame already opened, dropping second root");
            self.orphans += 1;
            return;
        }

        let variant = if frame.is_create { CallVariant::Create } else { CallVariant::Call };
        let code_hash = state.code_hash(frame.to);
        debug!(%variant, from = %frame.from, to = %frame.to, gas = frame.gas, "Begin root frame");

        self.root = Some(CallFrame::root(Self::call_params(variant, frame, code_hash)));
        self.stack.push_root();
    }

    /// Finalize the root frame; the frame stays on the stack
    pub fn end_root(
        &mut self,
        output: Bytes,
        gas_used: u64,
        error: Option<&str>,
        state: &mut dyn StateAccessor,
    ) {
        let Self { config, root, addresses, orphans, .. } = self;
        let Some(root) = root.as_mut() else {
            error!("Root frame ended before it began");
            *orphans += 1;
            return;
        };

        debug!(gas_used, ?error, "End root frame");
        Self::finalize(config, addresses, root, output, gas_used, error, state);
    }

    /// Fill in the frame opened by the preceding call-like step
    ///
    /// `value` defaults to zero when the VM reports none. If the top frame is
    /// not a pending placeholder (the VM entered a frame without a call-like
    /// step), a placeholder is appended first.
    pub fn enter_call(
        &mut self,
        kind: CallVariant,
        frame: FrameInput,
        state: &mut dyn StateAccessor,
    ) {
        let Self { root, stack, orphans, .. } = self;
        let Some(top) = root.as_mut().and_then(|root| stack.top_mut(root)) else {
            error!(%kind, to = %frame.to, "Call entered with no open frame");
            *orphans += 1;
            return;
        };

        let target = if top.is_entered() {
            warn!(%kind, parent = %top.path, "Call entered without a call step, opening frame");
            let index = top.append(|path| TraceNode::Call(CallFrame::placeholder(path)));
            stack.push_child(index);
            match top.child_frame_mut(index) {
                Some(child) => child,
                None => {
                    error!("Freshly appended placeholder is missing");
                    return;
                }
            }
        } else {
            top
        };

        let code_hash = state.code_hash(frame.to);
        let value = Some(frame.value.unwrap_or(U256::ZERO));
        debug!(
            path = %target.path,
            %kind,
            from = %frame.from,
            to = %frame.to,
            gas = frame.gas,
            "Enter call"
        );
        target.enter(Self::call_params(kind, FrameInput { value, ..frame }, code_hash));
    }

    /// Finalize the top frame and pop it
    pub fn exit_call(
        &mut self,
        output: Bytes,
        gas_used: u64,
        error: Option<&str>,
        state: &mut dyn StateAccessor,
    ) {
        let Self { config, root, stack, addresses, orphans, .. } = self;
        let Some(top) = root.as_mut().and_then(|root| stack.top_mut(root)) else {
            error!("Call exited with no open frame");
            *orphans += 1;
            return;
        };

        debug!(path = %top.path, gas_used, ?error, "Exit call");
        Self::finalize(config, addresses, top, output, gas_used, error, state);
        stack.pop();
    }

    /// Record whatever the step contributes to the trace
    pub fn step(&mut self, step: &Step<'_>, state: &mut dyn StateAccessor) {
        let kind = step.opcode.step_kind();
        if kind == StepKind::Other {
            return;
        }
        trace!(pc = step.pc, opcode = step.opcode.as_str(), depth = step.depth, "Step");

        let Self { config, root, stack, preimages, orphans, .. } = self;
        let Some(top) = root.as_mut().and_then(|root| stack.top_mut(root)) else {
            error!(opcode = step.opcode.as_str(), "Step with no open frame");
            *orphans += 1;
            return;
        };

        match kind {
            StepKind::StorageRead => {
                let Some(slot) = step.stack.peek(0) else {
                    warn!(pc = step.pc, "SLOAD with empty stack, skipping");
                    return;
                };
                let slot = B256::from(slot);
                let value = state.stored_value(step.contract, slot);
                top.append(|path| TraceNode::Sload(StorageRead { path, slot, value }));
            }
            StepKind::StorageWrite => {
                let (Some(slot), Some(new_value)) = (step.stack.peek(0), step.stack.peek(1)) else {
                    warn!(pc = step.pc, "SSTORE with short stack, skipping");
                    return;
                };
                let slot = B256::from(slot);
                let old_value = state.stored_value(step.contract, slot);
                top.append(|path| {
                    TraceNode::Sstore(StorageWrite {
                        path,
                        slot,
                        new_value: B256::from(new_value),
                        old_value,
                    })
                });
            }
            StepKind::Log(topic_count) => {
                let operands: Option<Vec<U256>> =
                    (0..topic_count + 2).map(|n| step.stack.peek(n)).collect();
                let Some(operands) = operands else {
                    warn!(pc = step.pc, topic_count, "LOG with short stack, skipping");
                    return;
                };
                let Some((offset, mut size)) = memory_range(operands[0], operands[1]) else {
                    warn!(pc = step.pc, "LOG memory range out of bounds, skipping");
                    return;
                };
                if size > config.memory_copy_limit {
                    warn!(size, limit = config.memory_copy_limit, "Truncating oversized log data");
                    size = config.memory_copy_limit;
                }

                let data = Bytes::from(step.memory.copy(offset, size));
                let topics = operands[2..].iter().map(|topic| B256::from(*topic)).collect();
                top.append(|path| TraceNode::Log(LogEntry { path, data, topics }));
            }
            StepKind::Hash => {
                if !config.with_preimages {
                    return;
                }
                let (Some(offset), Some(size)) = (step.stack.peek(0), step.stack.peek(1)) else {
                    warn!(pc = step.pc, "KECCAK256 with short stack, skipping");
                    return;
                };
                let Some((offset, size)) = memory_range(offset, size) else {
                    warn!(pc = step.pc, "KECCAK256 memory range out of bounds, skipping");
                    return;
                };
                if size > config.memory_copy_limit {
                    warn!(size, limit = config.memory_copy_limit, "Skipping oversized preimage");
                    return;
                }

                let digest = preimages.record(Bytes::from(step.memory.copy(offset, size)));
                trace!(%digest, size, "Recorded preimage");
            }
            StepKind::Call(variant) => {
                if step.stack.len() < step.opcode.stack_inputs() {
                    debug!(%variant, pc = step.pc, "Call step with short stack, no frame opened");
                    return;
                }
                let index = top.append(|path| TraceNode::Call(CallFrame::placeholder(path)));
                stack.push_child(index);
            }
            StepKind::Other => {}
        }
    }

    /// A step faulted; nothing to record
    pub fn step_fault(&mut self, step: &Step<'_>, error: &str) {
        trace!(pc = step.pc, opcode = step.opcode.as_str(), error, "Step fault");
    }

    /// Execution stopped; nothing to record
    pub fn stop(&mut self, error: Option<&str>) {
        trace!(?error, "Tracer stopped");
    }

    /// Assemble the trace
    ///
    /// Succeeds only when exactly the root frame is open and no callback was
    /// dropped. Leaves the tracer untouched.
    pub fn result(&self) -> Result<TraceResult, TraceError> {
        let root = self.checked_root()?;
        Ok(TraceResult {
            entrypoint: root.clone(),
            preimages: self.preimages.clone(),
            addresses: self.addresses.clone(),
        })
    }

    /// Assemble the trace, consuming the tracer
    pub fn into_result(self) -> Result<TraceResult, TraceError> {
        self.checked_root()?;
        let Self { root, preimages, addresses, .. } = self;
        let entrypoint = root.ok_or(TraceError::UnbalancedFrames { depth: 0 })?;
        Ok(TraceResult { entrypoint, preimages, addresses })
    }

    /// Assemble the trace as JSON
    pub fn result_json(&self) -> Result<serde_json::Value, TraceError> {
        Ok(self.result()?.to_json_value()?)
    }

    fn checked_root(&self) -> Result<&CallFrame, TraceError> {
        let depth = self.stack.depth();
        if depth != 1 {
            return Err(TraceError::UnbalancedFrames { depth });
        }
        if self.orphans > 0 {
            return Err(TraceError::OrphanEvents { count: self.orphans });
        }
        self.root.as_ref().ok_or(TraceError::UnbalancedFrames { depth: 0 })
    }

    fn call_params(variant: CallVariant, frame: FrameInput, code_hash: B256) -> CallParams {
        CallParams {
            variant,
            from: frame.from,
            to: frame.to,
            is_precompile: frame.is_precompile,
            is_create: frame.is_create,
            input: frame.input,
            gas: frame.gas,
            value: frame.value,
            code_hash,
        }
    }

    fn finalize(
        config: &TracerConfig,
        addresses: &mut AddressBook,
        frame: &mut CallFrame,
        output: Bytes,
        gas_used: u64,
        error: Option<&str>,
        state: &mut dyn StateAccessor,
    ) {
        octrace_assert!(frame.is_entered(), "frame {} finalized before entered", frame.path);

        // Deployed code only exists once the constructor returned.
        let code_hash = frame.is_create.then(|| state.code_hash(frame.to));
        let status = CallStatus::from_success(error.is_none());
        if !frame.finish(output, gas_used, status, code_hash) {
            return;
        }

        if config.with_address_book && addresses.ensure(frame.to, frame.code_hash) {
            trace!(address = %frame.to, code_hash = %frame.code_hash, "Registered address");
        }
    }
}

/// Convert a memory operand pair to `(offset, size)`; empty ranges ignore the offset
fn memory_range(offset: U256, size: U256) -> Option<(usize, usize)> {
    let size = usize::try_from(size).ok()?;
    if size == 0 {
        return Some((0, 0));
    }
    let offset = usize::try_from(offset).ok()?;
    offset.checked_add(size)?;
    Some((offset, size))
}
