//! Single-shot hook execution.
//!
//! A `HookExecutor` wires the host API, a host-owned fixed memory, and a
//! funcref table into a fresh deterministic engine, then runs the guest
//! entry point once. Executing consumes the executor; engine instances
//! are never reused across invocations.

use std::collections::BTreeMap;
use std::sync::Arc;

use wasmtime::{
    Config, Engine, Linker, Memory, MemoryType, Module, Ref, RefType, Store, Table, TableType,
    Trap,
};

use hookvm_hostapi::{LedgerView, StateMap};
use hookvm_primitives::error::ExitType;
use hookvm_primitives::types::{AccountId, Hash256, NamespaceId};

use crate::config::SandboxConfig;
use crate::context::{HookContext, HookResult};
use crate::error::SandboxError;
use crate::host::register_host_functions;

/// Create a wasmtime engine with deterministic configuration.
fn create_engine() -> Result<Engine, SandboxError> {
    let mut config = Config::new();

    // Fuel metering doubles as the instruction counter.
    config.consume_fuel(true);

    // Determinism enforcement
    config.wasm_threads(false);
    config.wasm_simd(false);
    config.wasm_relaxed_simd(false);
    config.wasm_multi_memory(false);
    config.cranelift_nan_canonicalization(true);

    Ok(Engine::new(&config)?)
}

/// One hook invocation, ready to run. Single use: `execute` consumes it.
pub struct HookExecutor {
    engine: Engine,
    store: Store<HookContext>,
    linker: Linker<HookContext>,
    fuel_limit: u64,
}

impl HookExecutor {
    /// Build the import surface around a prepared context.
    pub fn new(ctx: HookContext, config: &SandboxConfig) -> Result<Self, SandboxError> {
        let engine = create_engine()?;
        let mut store = Store::new(&engine, ctx);
        store.set_fuel(config.fuel_limit)?;

        let mut linker = Linker::new(&engine);
        register_host_functions(&mut linker)?;

        // The guest imports its linear memory and table from the host:
        // one fixed 64 KiB page, no growth.
        let memory = Memory::new(&mut store, MemoryType::new(1, Some(1)))?;
        store.data_mut().memory = Some(memory);
        linker.define(&mut store, "env", "memory", memory)?;

        let table = Table::new(
            &mut store,
            TableType::new(RefType::FUNCREF, 10, Some(20)),
            Ref::Func(None),
        )?;
        linker.define(&mut store, "env", "table", table)?;

        Ok(Self {
            engine,
            store,
            linker,
            fuel_limit: config.fuel_limit,
        })
    }

    /// Run the guest entry point (`hook`, or `cbak` for emission
    /// callbacks) and capture the outcome.
    ///
    /// Engine-level failures become a `WasmError` exit rather than a
    /// host error; the instruction count is recorded either way.
    pub fn execute(mut self, wasm: &[u8], wasm_param: u32) -> HookResult {
        let entry = if self.store.data().callback { "cbak" } else { "hook" };

        let outcome = Module::new(&self.engine, wasm)
            .and_then(|module| self.linker.instantiate(&mut self.store, &module))
            .and_then(|instance| {
                instance.get_typed_func::<i32, i64>(&mut self.store, entry)
            })
            .and_then(|func| func.call(&mut self.store, wasm_param as i32));

        let consumed = self
            .fuel_limit
            .saturating_sub(self.store.get_fuel().unwrap_or(0));

        let ctx = self.store.data_mut();
        ctx.result.instruction_count = consumed;

        match outcome {
            Ok(_) => {
                // A guest that returns without calling accept or
                // rollback forfeits the transaction.
                if ctx.result.exit_type == ExitType::Unset {
                    ctx.result.exit_type = ExitType::Rollback;
                    ctx.result.exit_reason = b"hook returned without exit".to_vec();
                }
            }
            Err(err) => {
                if ctx.result.exit_type == ExitType::Unset {
                    ctx.result.exit_type = ExitType::WasmError;
                    let reason: &[u8] =
                        if matches!(err.downcast_ref::<Trap>(), Some(Trap::OutOfFuel)) {
                            b"instruction budget exhausted"
                        } else {
                            b"wasm execution error"
                        };
                    ctx.result.exit_reason = reason.to_vec();
                    tracing::warn!(
                        "HookError[{}]: vm error: {err}",
                        hookvm_primitives::accountid::encode_raddr(&ctx.result.account)
                    );
                }
            }
        }

        let mut ctx = self.store.into_data();
        ctx.result.emitted = std::mem::take(&mut ctx.emissions).drain();
        ctx.result
    }
}

/// Execute one hook against the supplied ledger and chain state.
///
/// This is the ledger-facing entry point: the orchestrator calls it once
/// per applicable installation, threading the chain-wide state cache and
/// parameter overrides through.
#[allow(clippy::too_many_arguments)]
pub fn apply(
    hook_set_txn_id: Hash256,
    hook_hash: Hash256,
    namespace: NamespaceId,
    wasm: &[u8],
    params: BTreeMap<Vec<u8>, Vec<u8>>,
    param_overrides: BTreeMap<Hash256, BTreeMap<Vec<u8>, Vec<u8>>>,
    state_map: StateMap,
    ledger: Arc<dyn LedgerView>,
    account: AccountId,
    otxn: Vec<u8>,
    callback: bool,
    wasm_param: u32,
    chain_position: i32,
    config: &SandboxConfig,
) -> Result<HookResult, SandboxError> {
    let ctx = HookContext::new(
        ledger,
        config.limits.clone(),
        hook_set_txn_id,
        hook_hash,
        namespace,
        account,
        otxn,
        params,
        param_overrides,
        state_map,
        callback,
        chain_position,
    );
    let executor = HookExecutor::new(ctx, config)?;
    Ok(executor.execute(wasm, wasm_param))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hookvm_hostapi::MemLedger;
    use hookvm_primitives::types::{TxType, ZERO_HASH};
    use hookvm_primitives::TxnBuilder;

    fn run(wat_src: &str) -> HookResult {
        let wasm = wat::parse_str(wat_src).unwrap();
        let otxn = TxnBuilder::new(TxType::Payment)
            .account(&[9u8; 20])
            .destination(&[7u8; 20])
            .amount_drops(100)
            .build();
        apply(
            ZERO_HASH,
            [0x42; 32],
            [0x01; 32],
            &wasm,
            BTreeMap::new(),
            BTreeMap::new(),
            StateMap::new(),
            Arc::new(MemLedger::new()),
            [7u8; 20],
            otxn,
            false,
            0,
            0,
            &SandboxConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_accept_records_reason_and_code() {
        let result = run(
            r#"(module
                (import "env" "accept" (func $accept (param i32 i32 i64) (result i64)))
                (import "env" "memory" (memory 1 1))
                (data (i32.const 0) "ok")
                (func (export "hook") (param i32) (result i64)
                    (drop (call $accept (i32.const 0) (i32.const 2) (i64.const 5)))
                    (i64.const 0)))"#,
        );
        assert_eq!(result.exit_type, ExitType::Accept);
        assert_eq!(result.exit_reason, b"ok".to_vec());
        assert_eq!(result.exit_code, 5);
        assert!(result.instruction_count > 0);
    }

    #[test]
    fn test_rollback_records_exit() {
        let result = run(
            r#"(module
                (import "env" "rollback" (func $rollback (param i32 i32 i64) (result i64)))
                (import "env" "memory" (memory 1 1))
                (data (i32.const 0) "no")
                (func (export "hook") (param i32) (result i64)
                    (drop (call $rollback (i32.const 0) (i32.const 2) (i64.const -1)))
                    (i64.const 0)))"#,
        );
        assert_eq!(result.exit_type, ExitType::Rollback);
        assert_eq!(result.exit_reason, b"no".to_vec());
        assert_eq!(result.exit_code, -1);
    }

    #[test]
    fn test_return_without_exit_is_rollback() {
        let result = run(
            r#"(module
                (func (export "hook") (param i32) (result i64) (i64.const 0)))"#,
        );
        assert_eq!(result.exit_type, ExitType::Rollback);
        assert_eq!(result.exit_reason, b"hook returned without exit".to_vec());
    }

    #[test]
    fn test_guest_trap_is_wasm_error() {
        let result = run(
            r#"(module
                (func (export "hook") (param i32) (result i64)
                    unreachable))"#,
        );
        assert_eq!(result.exit_type, ExitType::WasmError);
        assert!(result.instruction_count > 0);
    }

    #[test]
    fn test_guard_violation_rolls_back() {
        // Loop iterates 5 times against a guard allowing 3.
        let result = run(
            r#"(module
                (import "env" "_g" (func $g (param i32 i32) (result i32)))
                (import "env" "accept" (func $accept (param i32 i32 i64) (result i64)))
                (import "env" "memory" (memory 1 1))
                (func (export "hook") (param i32) (result i64)
                    (local $i i32)
                    (block $exit
                        (loop $l
                            (drop (call $g (i32.const 1) (i32.const 3)))
                            (local.set $i (i32.add (local.get $i) (i32.const 1)))
                            (br_if $exit (i32.ge_u (local.get $i) (i32.const 5)))
                            (br $l)))
                    (drop (call $accept (i32.const 0) (i32.const 0) (i64.const 0)))
                    (i64.const 0)))"#,
        );
        assert_eq!(result.exit_type, ExitType::Rollback);
        assert_eq!(
            result.exit_code,
            hookvm_primitives::HookReturnCode::GuardViolation.as_i64()
        );
        assert_eq!(result.exit_reason, b"guard violation".to_vec());
    }

    #[test]
    fn test_fuel_exhaustion_is_wasm_error() {
        let wasm = wat::parse_str(
            r#"(module
                (func (export "hook") (param i32) (result i64)
                    (loop $l (br $l))
                    (i64.const 0)))"#,
        )
        .unwrap();
        let otxn = TxnBuilder::new(TxType::Payment).account(&[9u8; 20]).build();
        let config = SandboxConfig {
            fuel_limit: 10_000,
            ..SandboxConfig::default()
        };
        let result = apply(
            ZERO_HASH,
            [0x42; 32],
            [0x01; 32],
            &wasm,
            BTreeMap::new(),
            BTreeMap::new(),
            StateMap::new(),
            Arc::new(MemLedger::new()),
            [7u8; 20],
            otxn,
            false,
            0,
            0,
            &config,
        )
        .unwrap();
        assert_eq!(result.exit_type, ExitType::WasmError);
        assert_eq!(result.exit_reason, b"instruction budget exhausted".to_vec());
        assert!(result.instruction_count > 5_000);
    }

    #[test]
    fn test_state_write_lands_in_result_map() {
        let result = run(
            r#"(module
                (import "env" "state_set" (func $state_set (param i32 i32 i32 i32) (result i64)))
                (import "env" "accept" (func $accept (param i32 i32 i64) (result i64)))
                (import "env" "memory" (memory 1 1))
                (data (i32.const 0) "\01")  ;; key
                (data (i32.const 8) "\aa")  ;; value
                (func (export "hook") (param i32) (result i64)
                    (drop (call $state_set (i32.const 8) (i32.const 1) (i32.const 0) (i32.const 1)))
                    (drop (call $accept (i32.const 0) (i32.const 0) (i64.const 0)))
                    (i64.const 0)))"#,
        );
        assert_eq!(result.exit_type, ExitType::Accept);
        assert_eq!(result.changed_state_count, 1);
        let mut key = [0u8; 32];
        key[31] = 0x01;
        let entry = result.state_map.entry(&[7u8; 20], &[0x01; 32], &key).unwrap();
        assert!(entry.modified);
        assert_eq!(entry.value, vec![0xAA]);
    }

    #[test]
    fn test_out_of_bounds_read_returns_error_to_guest() {
        // state_set with a key pointer far outside the single page:
        // the call fails with OUT_OF_BOUNDS (-1), which the guest
        // forwards through rollback's code argument.
        let result = run(
            r#"(module
                (import "env" "state_set" (func $state_set (param i32 i32 i32 i32) (result i64)))
                (import "env" "rollback" (func $rollback (param i32 i32 i64) (result i64)))
                (import "env" "memory" (memory 1 1))
                (func (export "hook") (param i32) (result i64)
                    (drop (call $rollback (i32.const 0) (i32.const 0)
                        (call $state_set (i32.const 0) (i32.const 1) (i32.const 100000000) (i32.const 1))))
                    (i64.const 0)))"#,
        );
        assert_eq!(result.exit_type, ExitType::Rollback);
        assert_eq!(result.exit_code, -1);
    }
}
