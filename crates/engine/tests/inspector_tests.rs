use alloy_primitives::{address, hex, keccak256, Address, Bytes, B256, U256};
use octrace_common::types::{CallStatus, CallVariant, TraceNode, TracePath};
use octrace_engine::{
    precompile_addresses, replay_and_trace, OpenchainInspector, TraceContext, TracerConfig,
};
use revm::{
    bytecode::Bytecode,
    context::TxEnv,
    database::{CacheDB, EmptyDB},
    primitives::{hardfork::SpecId, TxKind},
    state::AccountInfo,
    Context, InspectEvm, MainBuilder, MainContext,
};
use tracing::info;

const SENDER: Address = address!("0x1000000000000000000000000000000000000001");
const CONTRACT: Address = address!("0x2000000000000000000000000000000000000002");
const CALLEE: Address = address!("0x3000000000000000000000000000000000000003");
const IDENTITY: Address = address!("0x0000000000000000000000000000000000000004");

/// SSTORE 42 to slot 1, SLOAD it back, hash a memory word, LOG1 that word, STOP
const STORAGE_LOG_CODE: &[u8] = &hex!("602a6001556001545060ff600052602060002050600160206000a100");

fn deploy(db: &mut CacheDB<EmptyDB>, address: Address, code: &[u8]) -> B256 {
    let bytecode = Bytecode::new_raw(Bytes::copy_from_slice(code));
    let code_hash = bytecode.hash_slow();
    db.insert_account_info(
        address,
        AccountInfo { nonce: 1, code_hash, code: Some(bytecode), ..Default::default() },
    );
    code_hash
}

/// CALL `target` forwarding all gas, no value, no calldata, then STOP
fn caller_code(target: Address) -> Vec<u8> {
    let mut code = hex!("60006000600060006000").to_vec();
    code.push(0x73);
    code.extend_from_slice(target.as_slice());
    code.extend_from_slice(&hex!("5af15000"));
    code
}

fn context(db: CacheDB<EmptyDB>) -> TraceContext<CacheDB<EmptyDB>> {
    Context::mainnet().with_db(db)
}

fn call_tx(to: Address) -> TxEnv {
    TxEnv { caller: SENDER, kind: TxKind::Call(to), gas_limit: 1_000_000, ..Default::default() }
}

#[test]
fn test_storage_hash_and_log_in_root_frame() {
    octrace_common::logging::ensure_test_logging(None);
    info!("Running test");

    let mut db = CacheDB::new(EmptyDB::default());
    let code_hash = deploy(&mut db, CONTRACT, STORAGE_LOG_CODE);

    let mut inspector = OpenchainInspector::new(TracerConfig::default());
    let mut evm = context(db).build_mainnet_with_inspector(&mut inspector);
    let execution = evm.inspect_one_tx(call_tx(CONTRACT)).unwrap();
    assert!(execution.is_success());

    let trace = inspector.into_result().unwrap();
    let root = &trace.entrypoint;
    assert_eq!(root.path, TracePath::root());
    assert_eq!(root.variant, CallVariant::Call);
    assert_eq!(root.from, SENDER);
    assert_eq!(root.to, CONTRACT);
    assert_eq!(root.code_hash, code_hash);
    assert_eq!(root.status, Some(CallStatus::Success));
    assert!(root.gas_used > 0 && root.gas_used < root.gas_provided);
    assert_eq!(root.children.len(), 3);

    let slot = B256::with_last_byte(1);
    let Some(TraceNode::Sstore(write)) = trace.find(&TracePath::root().child(0)) else {
        panic!("expected sstore at 0.0");
    };
    assert_eq!(write.slot, slot);
    assert_eq!(write.new_value, B256::with_last_byte(42));
    assert_eq!(write.old_value, B256::ZERO);

    let Some(TraceNode::Sload(read)) = trace.find(&TracePath::root().child(1)) else {
        panic!("expected sload at 0.1");
    };
    assert_eq!(read.slot, slot);
    assert_eq!(read.value, B256::with_last_byte(42));

    let word = B256::with_last_byte(0xff);
    let Some(TraceNode::Log(log)) = trace.find(&TracePath::root().child(2)) else {
        panic!("expected log at 0.2");
    };
    assert_eq!(log.topics, vec![B256::with_last_byte(1)]);
    assert_eq!(log.data, Bytes::copy_from_slice(word.as_slice()));

    assert_eq!(trace.preimages.len(), 1);
    let preimage = trace.preimages.preimage(&keccak256(word));
    assert_eq!(preimage, Some(&Bytes::copy_from_slice(word.as_slice())));
    assert!(trace.addresses.get(&CONTRACT, &code_hash).is_some());
}

#[test]
fn test_nested_call_records_callee_storage() {
    octrace_common::logging::ensure_test_logging(None);

    let mut db = CacheDB::new(EmptyDB::default());
    deploy(&mut db, CONTRACT, &caller_code(CALLEE));
    // SSTORE 7 to slot 0, STOP
    let callee_hash = deploy(&mut db, CALLEE, &hex!("600760005500"));

    let replay = replay_and_trace(context(db), call_tx(CONTRACT), TracerConfig::default()).unwrap();
    assert!(replay.execution.is_success());

    let trace = replay.trace;
    let child = trace.entrypoint.child_frame(0).expect("call at 0.0");
    assert_eq!(child.path, "0.0");
    assert_eq!(child.variant, CallVariant::Call);
    assert_eq!(child.from, CONTRACT);
    assert_eq!(child.to, CALLEE);
    assert_eq!(child.value, Some(U256::ZERO));
    assert_eq!(child.code_hash, callee_hash);
    assert_eq!(child.status, Some(CallStatus::Success));
    assert!(!child.is_precompile);

    let Some(TraceNode::Sstore(write)) = trace.find(&TracePath::root().child(0).child(0)) else {
        panic!("expected sstore at 0.0.0");
    };
    assert_eq!(write.slot, B256::ZERO);
    assert_eq!(write.new_value, B256::with_last_byte(7));
    assert_eq!(trace.node_count(), 3);
    assert_eq!(trace.addresses.len(), 2);
}

#[test]
fn test_reverting_callee_under_successful_root() {
    octrace_common::logging::ensure_test_logging(None);

    let mut db = CacheDB::new(EmptyDB::default());
    deploy(&mut db, CONTRACT, &caller_code(CALLEE));
    // REVERT(0, 0)
    deploy(&mut db, CALLEE, &hex!("60006000fd"));

    let replay = replay_and_trace(context(db), call_tx(CONTRACT), TracerConfig::default()).unwrap();
    let trace = replay.trace;

    assert_eq!(trace.entrypoint.status, Some(CallStatus::Success));
    let child = trace.entrypoint.child_frame(0).expect("call at 0.0");
    assert_eq!(child.status, Some(CallStatus::Failure));
    assert!(child.children.is_empty());
}

#[test]
fn test_faulted_call_opcode_opens_no_frame() {
    octrace_common::logging::ensure_test_logging(None);

    let mut db = CacheDB::new(EmptyDB::default());
    // CALL with an empty stack
    deploy(&mut db, CONTRACT, &hex!("f100"));

    let replay = replay_and_trace(context(db), call_tx(CONTRACT), TracerConfig::default()).unwrap();
    assert!(!replay.execution.is_success());

    let trace = replay.trace;
    assert_eq!(trace.entrypoint.status, Some(CallStatus::Failure));
    assert!(trace.entrypoint.children.is_empty());
}

#[test]
fn test_precompile_call_is_flagged() {
    octrace_common::logging::ensure_test_logging(None);

    let mut db = CacheDB::new(EmptyDB::default());
    deploy(&mut db, CONTRACT, &caller_code(IDENTITY));

    let replay = replay_and_trace(context(db), call_tx(CONTRACT), TracerConfig::default()).unwrap();
    let child = replay.trace.entrypoint.child_frame(0).expect("call at 0.0").clone();
    assert_eq!(child.to, IDENTITY);
    assert!(child.is_precompile);
    assert_eq!(child.status, Some(CallStatus::Success));
    assert!(!replay.trace.entrypoint.is_precompile);
}

#[test]
fn test_contract_creation_root() {
    octrace_common::logging::ensure_test_logging(None);

    // SSTORE 42 to slot 0, then return the single byte 0x00 as runtime code
    let init_code = hex!("602a600055600060005360016000f3");
    let tx = TxEnv {
        caller: SENDER,
        kind: TxKind::Create,
        data: Bytes::copy_from_slice(&init_code),
        gas_limit: 1_000_000,
        ..Default::default()
    };

    let db = CacheDB::new(EmptyDB::default());
    let replay = replay_and_trace(context(db), tx, TracerConfig::default()).unwrap();
    assert!(replay.execution.is_success());

    let trace = replay.trace;
    let root = &trace.entrypoint;
    let created = SENDER.create(0);
    let runtime_hash = keccak256([0u8]);
    assert_eq!(root.variant, CallVariant::Create);
    assert!(root.is_create);
    assert_eq!(root.to, created);
    assert_eq!(root.input, Bytes::copy_from_slice(&init_code));
    assert_eq!(root.code_hash, runtime_hash);
    assert_eq!(root.children.len(), 1);
    assert_eq!(root.children[0].kind(), "sstore");
    assert!(trace.addresses.get(&created, &runtime_hash).is_some());
}

#[test]
fn test_fixed_precompile_set_overrides_hardfork() {
    octrace_common::logging::ensure_test_logging(None);
    assert!(precompile_addresses(SpecId::CANCUN).contains(&IDENTITY));

    let mut db = CacheDB::new(EmptyDB::default());
    deploy(&mut db, CONTRACT, &caller_code(CALLEE));

    let mut inspector = OpenchainInspector::default().with_precompiles([CALLEE]);
    let mut evm = context(db).build_mainnet_with_inspector(&mut inspector);
    evm.inspect_one_tx(call_tx(CONTRACT)).unwrap();

    let trace = inspector.result().unwrap();
    assert!(trace.entrypoint.child_frame(0).expect("call at 0.0").is_precompile);
}
