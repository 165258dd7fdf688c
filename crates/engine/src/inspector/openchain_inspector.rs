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

//! revm inspector driving the trace engine
//!
//! Translates revm's inspector hooks into [`OpenchainTracer`] callbacks:
//!
//! - the first `call`/`create` opens the root frame, later ones enter calls
//! - `call_end`/`create_end` exit calls, and end the root once depth is back at 0
//! - `step` feeds the engine, with one twist for call-like opcodes
//!
//! revm may fault a `CALL`/`CREATE` instruction (stack underflow, static
//! violation, out of gas) without ever reaching the `call` hook. The engine
//! would then be left with a placeholder frame nobody enters, so call-like
//! steps are held back and only forwarded right before the hook that opens
//! their frame. Any other hook arriving first drops the held step.

use alloy_primitives::{Address, Bytes, B256, U256};
use octrace_common::{types::CallVariant, OpcodeTr, StepKind};
use revm::{
    bytecode::OpCode,
    context::{BlockEnv, CfgEnv, CreateScheme, JournalTr, TxEnv},
    interpreter::{
        interpreter_types::{InputsTr, Jumps},
        CallInputs, CallOutcome, CallScheme, CreateInputs, CreateOutcome, Interpreter,
        SharedMemory, Stack,
    },
    precompile::{PrecompileSpecId, Precompiles},
    primitives::hardfork::SpecId,
    Context, Database, Inspector,
};
use std::{collections::HashSet, fmt::Display};
use tracing::{debug, error, trace};

use crate::{
    host::{copy_zero_padded, FrameInput, MemoryView, OperandStack, StateAccessor, Step},
    OpenchainTracer, TraceError, TracerConfig,
};
use octrace_common::types::TraceResult;

/// EVM context the inspector runs in
pub type TraceContext<DB> = Context<BlockEnv, TxEnv, CfgEnv, DB>;

/// Addresses of the precompiles active under the hardfork `spec`
pub fn precompile_addresses(spec: SpecId) -> HashSet<Address> {
    Precompiles::new(PrecompileSpecId::from_spec_id(spec)).addresses().copied().collect()
}

/// A call-like step waiting for its frame to open
#[derive(Debug, Clone)]
struct PendingCallStep {
    pc: usize,
    opcode: OpCode,
    gas_remaining: u64,
    depth: usize,
    contract: Address,
    /// Operands the instruction consumes, bottom first
    operands: Vec<U256>,
}

/// Inspector producing an openchain-style trace of one transaction
#[derive(Debug)]
pub struct OpenchainInspector {
    tracer: OpenchainTracer,
    /// `None` until configured or until the root frame picks the set for the active hardfork
    precompiles: Option<HashSet<Address>>,
    depth: usize,
    pending_call: Option<PendingCallStep>,
}

impl Default for OpenchainInspector {
    fn default() -> Self {
        Self::new(TracerConfig::default())
    }
}

impl OpenchainInspector {
    /// Create an inspector for one transaction
    pub fn new(config: TracerConfig) -> Self {
        Self {
            tracer: OpenchainTracer::new(config),
            precompiles: None,
            depth: 0,
            pending_call: None,
        }
    }

    /// Use a fixed precompile set instead of the one implied by the hardfork
    pub fn with_precompiles(mut self, precompiles: impl IntoIterator<Item = Address>) -> Self {
        self.precompiles = Some(precompiles.into_iter().collect());
        self
    }

    /// The underlying engine
    pub fn tracer(&self) -> &OpenchainTracer {
        &self.tracer
    }

    /// Assemble the trace without consuming the inspector
    pub fn result(&self) -> Result<TraceResult, TraceError> {
        self.tracer.result()
    }

    /// Assemble the trace
    pub fn into_result(self) -> Result<TraceResult, TraceError> {
        self.tracer.into_result()
    }

    fn is_precompile(&self, address: &Address) -> bool {
        self.precompiles.as_ref().is_some_and(|set| set.contains(address))
    }

    fn drop_pending(&mut self, reason: &str) {
        if let Some(pending) = self.pending_call.take() {
            debug!(
                pc = pending.pc,
                opcode = pending.opcode.as_str(),
                reason,
                "Call step did not open a frame, dropping it"
            );
        }
    }

    /// Forward the held call-like step, if any, right before its frame opens
    fn flush_pending(&mut self, state: &mut dyn StateAccessor) {
        let Some(pending) = self.pending_call.take() else { return };
        let memory: Vec<u8> = Vec::new();
        let step = Step {
            pc: pending.pc,
            opcode: pending.opcode,
            gas_remaining: pending.gas_remaining,
            gas_cost: 0,
            depth: pending.depth,
            contract: pending.contract,
            stack: &pending.operands,
            memory: &memory,
        };
        self.tracer.step(&step, state);
    }

    /// Open the root frame or enter a nested call
    fn open_frame<DB>(&mut self, context: &mut TraceContext<DB>, kind: CallVariant, frame: FrameInput)
    where
        DB: Database,
        DB::Error: Display,
    {
        if self.precompiles.is_none() {
            self.precompiles = Some(precompile_addresses(context.cfg.spec));
        }
        let frame = FrameInput { is_precompile: self.is_precompile(&frame.to), ..frame };

        let mut state = JournalState { context };
        if self.depth == 0 {
            self.drop_pending("root frame");
            self.tracer.begin_root(frame, &mut state);
        } else {
            self.flush_pending(&mut state);
            self.tracer.enter_call(kind, frame, &mut state);
        }
        self.depth += 1;
    }

    /// Exit a nested call or end the root
    fn close_frame<DB>(
        &mut self,
        context: &mut TraceContext<DB>,
        output: Bytes,
        gas_used: u64,
        error: Option<String>,
    ) where
        DB: Database,
        DB::Error: Display,
    {
        self.drop_pending("frame ended");

        let mut state = JournalState { context };
        match self.depth {
            0 => {
                error!("Frame ended while no frame was open");
                self.tracer.exit_call(output, gas_used, error.as_deref(), &mut state);
            }
            1 => {
                self.depth = 0;
                self.tracer.end_root(output, gas_used, error.as_deref(), &mut state);
            }
            _ => {
                self.depth -= 1;
                self.tracer.exit_call(output, gas_used, error.as_deref(), &mut state);
            }
        }
    }
}

impl<DB> Inspector<TraceContext<DB>> for OpenchainInspector
where
    DB: Database,
    DB::Error: Display,
{
    fn step(&mut self, interp: &mut Interpreter, context: &mut TraceContext<DB>) {
        self.drop_pending("next step");

        let Some(opcode) = OpCode::new(interp.bytecode.opcode()) else { return };
        let kind = opcode.step_kind();
        if kind == StepKind::Other {
            return;
        }

        let pc = interp.bytecode.pc();
        let gas_remaining = interp.gas.remaining();
        let depth = self.depth.saturating_sub(1);
        let contract = interp.input.target_address();

        if let StepKind::Call(_) = kind {
            let len = interp.stack.len();
            let operands = (0..opcode.stack_inputs().min(len))
                .rev()
                .filter_map(|n| interp.stack.peek(n).ok())
                .collect();
            self.pending_call =
                Some(PendingCallStep { pc, opcode, gas_remaining, depth, contract, operands });
            return;
        }

        let stack = InterpreterStack(&interp.stack);
        let memory = InterpreterMemory(&interp.memory);
        let step = Step {
            pc,
            opcode,
            gas_remaining,
            // Static costs are charged inside the instruction, after this hook.
            gas_cost: 0,
            depth,
            contract,
            stack: &stack,
            memory: &memory,
        };
        self.tracer.step(&step, &mut JournalState { context });
    }

    fn call(
        &mut self,
        context: &mut TraceContext<DB>,
        inputs: &mut CallInputs,
    ) -> Option<CallOutcome> {
        let frame = FrameInput {
            from: inputs.caller,
            to: inputs.bytecode_address,
            is_precompile: false,
            is_create: false,
            input: inputs.input.bytes(context).clone(),
            gas: inputs.gas_limit,
            value: inputs.transfer_value(),
        };
        trace!(scheme = ?inputs.scheme, to = %frame.to, "Call hook");
        self.open_frame(context, call_variant(inputs.scheme), frame);

        None
    }

    fn call_end(
        &mut self,
        context: &mut TraceContext<DB>,
        inputs: &CallInputs,
        outcome: &mut CallOutcome,
    ) {
        let error = (!outcome.result.is_ok()).then(|| format!("{:?}", outcome.result.result));
        let gas_used = inputs.gas_limit.saturating_sub(outcome.result.gas.remaining());
        self.close_frame(context, outcome.result.output.clone(), gas_used, error);
    }

    fn create(
        &mut self,
        context: &mut TraceContext<DB>,
        inputs: &mut CreateInputs,
    ) -> Option<CreateOutcome> {
        let created = match inputs.scheme() {
            CreateScheme::Custom { address } => address,
            _ => {
                let nonce = match context.journaled_state.load_account(inputs.caller()) {
                    Ok(account) => account.info.nonce,
                    Err(err) => {
                        error!(caller = %inputs.caller(), "Failed to load creator account: {err}");
                        0
                    }
                };
                inputs.created_address(nonce)
            }
        };

        let frame = FrameInput {
            from: inputs.caller(),
            to: created,
            is_precompile: false,
            is_create: true,
            input: inputs.init_code().clone(),
            gas: inputs.gas_limit(),
            value: Some(inputs.value()),
        };
        trace!(scheme = ?inputs.scheme(), to = %created, "Create hook");
        self.open_frame(context, create_variant(inputs.scheme()), frame);

        None
    }

    fn create_end(
        &mut self,
        context: &mut TraceContext<DB>,
        inputs: &CreateInputs,
        outcome: &mut CreateOutcome,
    ) {
        let error = (!outcome.result.is_ok()).then(|| format!("{:?}", outcome.result.result));
        let gas_used = inputs.gas_limit().saturating_sub(outcome.result.gas.remaining());
        self.close_frame(context, outcome.result.output.clone(), gas_used, error);
    }
}

fn call_variant(scheme: CallScheme) -> CallVariant {
    match scheme {
        CallScheme::Call => CallVariant::Call,
        CallScheme::CallCode => CallVariant::CallCode,
        CallScheme::DelegateCall => CallVariant::DelegateCall,
        CallScheme::StaticCall => CallVariant::StaticCall,
    }
}

fn create_variant(scheme: CreateScheme) -> CallVariant {
    match scheme {
        CreateScheme::Create2 { .. } => CallVariant::Create2,
        CreateScheme::Create | CreateScheme::Custom { .. } => CallVariant::Create,
    }
}

/// Operand stack of the running interpreter
struct InterpreterStack<'a>(&'a Stack);

impl OperandStack for InterpreterStack<'_> {
    fn len(&self) -> usize {
        self.0.len()
    }

    fn peek(&self, n: usize) -> Option<U256> {
        self.0.peek(n).ok()
    }
}

/// Memory of the running interpreter
struct InterpreterMemory<'a>(&'a SharedMemory);

impl MemoryView for InterpreterMemory<'_> {
    fn len(&self) -> usize {
        self.0.len()
    }

    fn copy(&self, offset: usize, len: usize) -> Vec<u8> {
        copy_zero_padded(&self.0.context_memory(), offset, len)
    }
}

/// State lookups through the journal, falling back to the database
struct JournalState<'a, DB: Database> {
    context: &'a mut TraceContext<DB>,
}

impl<DB> StateAccessor for JournalState<'_, DB>
where
    DB: Database,
    DB::Error: Display,
{
    fn stored_value(&mut self, address: Address, slot: B256) -> B256 {
        let key = U256::from_be_bytes(slot.0);
        let journal = &mut self.context.journaled_state;

        let cached = journal
            .state
            .get(&address)
            .and_then(|account| account.storage.get(&key))
            .map(|slot| slot.present_value);
        if let Some(value) = cached {
            return B256::from(value);
        }

        match journal.db_mut().storage(address, key) {
            Ok(value) => B256::from(value),
            Err(err) => {
                error!(%address, %slot, "Failed to read storage: {err}");
                B256::ZERO
            }
        }
    }

    fn code_hash(&mut self, address: Address) -> B256 {
        let journal = &mut self.context.journaled_state;

        if let Some(account) = journal.state.get(&address) {
            if account.is_loaded_as_not_existing() && !account.is_created() {
                return B256::ZERO;
            }
            return account.info.code_hash;
        }

        match journal.db_mut().basic(address) {
            Ok(Some(info)) => info.code_hash,
            Ok(None) => B256::ZERO,
            Err(err) => {
                error!(%address, "Failed to read account: {err}");
                B256::ZERO
            }
        }
    }
}
