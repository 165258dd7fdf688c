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

use eyre::Result;
use octrace_common::types::TraceResult;
use revm::{
    context::{result::ExecutionResult, TxEnv},
    Database, InspectEvm, MainBuilder,
};
use std::fmt::{Debug, Display};
use tracing::{debug, info, warn};

use crate::{OpenchainInspector, TraceContext, TracerConfig};

/// Outcome of replaying one transaction under the trace engine
#[derive(Debug)]
pub struct TraceReplayResult {
    /// What the VM reported for the transaction
    pub execution: ExecutionResult,
    /// The assembled trace
    pub trace: TraceResult,
}

/// Replay `tx` on top of `ctx` and build its trace
///
/// The state changes of the replay are not committed.
pub fn replay_and_trace<DB>(
    ctx: TraceContext<DB>,
    tx: TxEnv,
    config: TracerConfig,
) -> Result<TraceReplayResult>
where
    DB: Database,
    DB::Error: Display + Debug,
{
    info!("Replaying transaction to build its trace");

    let mut inspector = OpenchainInspector::new(config);
    let mut evm = ctx.build_mainnet_with_inspector(&mut inspector);

    let execution = evm
        .inspect_one_tx(tx)
        .map_err(|e| eyre::eyre!("Failed to inspect the target transaction: {:?}", e))?;

    if !execution.is_success() {
        warn!(gas_used = execution.gas_used(), "Traced transaction did not succeed");
    }

    let trace = inspector.into_result()?;
    debug!(
        nodes = trace.node_count(),
        preimages = trace.preimages.len(),
        addresses = trace.addresses.len(),
        "Trace assembled"
    );

    Ok(TraceReplayResult { execution, trace })
}
