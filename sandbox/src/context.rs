//! Per-execution state held in the wasmtime store.
//!
//! `HookContext` bundles every service one hook invocation owns: the
//! slot table, guard meter, nonce set, emission queue, parameter maps,
//! and the shared hook-state cache. It lives inside `Store<HookContext>`
//! for the duration of one execution and is torn down with the instance.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use hookvm_hostapi::emission::EmitSpec;
use hookvm_hostapi::{
    foreign_write_allowed, EmissionQueue, EmittedTxn, GuardMeter, HookLimits, LedgerView,
    SlotTable, StateMap,
};
use hookvm_primitives::crypto::sha512h_concat;
use hookvm_primitives::error::{ExitType, HookError, HookReturnCode};
use hookvm_primitives::types::{AccountId, Hash256, NamespaceId, MAX_EXIT_REASON_LEN};

/// Per-execution summary, populated as the hook runs.
#[derive(Debug, Clone)]
pub struct HookResult {
    pub hook_set_txn_id: Hash256,
    pub hook_hash: Hash256,
    /// The account the hook is installed on, not always the otxn sender.
    pub account: AccountId,
    pub otxn_account: AccountId,
    pub otxn_id: Hash256,
    pub namespace: NamespaceId,
    pub exit_type: ExitType,
    pub exit_code: i64,
    pub exit_reason: Vec<u8>,
    pub instruction_count: u64,
    pub emitted: Vec<EmittedTxn>,
    /// The chain-wide state cache as this execution left it.
    pub state_map: StateMap,
    pub changed_state_count: u16,
    pub hook_skips: BTreeSet<Hash256>,
    pub param_overrides: BTreeMap<Hash256, BTreeMap<Vec<u8>, Vec<u8>>>,
    pub chain_position: i32,
    pub foreign_state_set_disabled: bool,
}

/// Mutable execution state stored in `Store<HookContext>`.
pub struct HookContext {
    pub ledger: Arc<dyn LedgerView>,
    pub limits: HookLimits,
    /// The host-owned linear memory; set by the executor after creation.
    pub memory: Option<wasmtime::Memory>,
    /// The originating transaction, serialized.
    pub otxn: Vec<u8>,
    pub otxn_id: Hash256,
    pub otxn_burden: u64,
    pub otxn_generation: u32,
    pub slots: SlotTable,
    pub guards: GuardMeter,
    pub emissions: EmissionQueue,
    pub nonces_used: BTreeSet<Hash256>,
    pub nonce_counter: u32,
    /// Install-time parameters of this installation.
    pub params: BTreeMap<Vec<u8>, Vec<u8>>,
    /// True when running the `cbak` entry point.
    pub callback: bool,
    pub result: HookResult,
}

impl HookContext {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        ledger: Arc<dyn LedgerView>,
        limits: HookLimits,
        hook_set_txn_id: Hash256,
        hook_hash: Hash256,
        namespace: NamespaceId,
        account: AccountId,
        otxn: Vec<u8>,
        params: BTreeMap<Vec<u8>, Vec<u8>>,
        param_overrides: BTreeMap<Hash256, BTreeMap<Vec<u8>, Vec<u8>>>,
        state_map: StateMap,
        callback: bool,
        chain_position: i32,
    ) -> Self {
        let txn = hookvm_primitives::TxnView::new(&otxn);
        let otxn_id = txn.txn_id();
        let otxn_account = txn.account().unwrap_or([0u8; 20]);
        let (otxn_burden, otxn_generation) = match txn.emit_details() {
            Some(details) => (details.burden, details.generation),
            None => (1, 0),
        };
        let max_slots = limits.max_slots;
        Self {
            ledger,
            limits,
            memory: None,
            otxn,
            otxn_id,
            otxn_burden,
            otxn_generation,
            slots: SlotTable::new(max_slots),
            guards: GuardMeter::new(),
            emissions: EmissionQueue::new(),
            nonces_used: BTreeSet::new(),
            nonce_counter: 0,
            params,
            callback,
            result: HookResult {
                hook_set_txn_id,
                hook_hash,
                account,
                otxn_account,
                otxn_id,
                namespace,
                exit_type: ExitType::Unset,
                exit_code: -1,
                exit_reason: Vec::new(),
                instruction_count: 0,
                emitted: Vec::new(),
                state_map,
                changed_state_count: 0,
                hook_skips: BTreeSet::new(),
                param_overrides,
                chain_position,
                foreign_state_set_disabled: false,
            },
        }
    }

    /// Record a terminal accept/rollback. The reason clamps to 32 bytes.
    pub fn record_exit(&mut self, exit_type: ExitType, code: i64, reason: &[u8]) {
        self.result.exit_type = exit_type;
        self.result.exit_code = code;
        self.result.exit_reason = reason[..reason.len().min(MAX_EXIT_REASON_LEN)].to_vec();
    }

    /// Left-pad a guest state key to 32 bytes.
    pub fn pad_state_key(&self, key: &[u8]) -> Result<Hash256, HookError> {
        if key.is_empty() {
            return Err(HookReturnCode::TooSmall.into());
        }
        if key.len() > self.limits.max_state_key_len {
            return Err(HookReturnCode::TooBig.into());
        }
        let mut padded = [0u8; 32];
        padded[32 - key.len()..].copy_from_slice(key);
        Ok(padded)
    }

    /// Read a state value for an arbitrary owner and namespace.
    pub fn state_get(
        &mut self,
        account: &AccountId,
        ns: &NamespaceId,
        key: &Hash256,
    ) -> Result<Vec<u8>, HookError> {
        self.result.state_map.get(self.ledger.as_ref(), account, ns, key)
    }

    /// Write this installation's own state.
    pub fn state_set_own(&mut self, key: &Hash256, value: Vec<u8>) -> Result<(), HookError> {
        let account = self.result.account;
        let ns = self.result.namespace;
        self.result
            .state_map
            .set(&account, &ns, key, value, &self.limits)?;
        self.result.changed_state_count = self.result.changed_state_count.saturating_add(1);
        Ok(())
    }

    /// Write another account's state, gated by grants.
    ///
    /// The first unauthorised attempt latches `foreign_state_set_disabled`
    /// for the rest of the execution.
    pub fn state_set_foreign(
        &mut self,
        account: &AccountId,
        ns: &NamespaceId,
        key: &Hash256,
        value: Vec<u8>,
    ) -> Result<(), HookError> {
        if *account == self.result.account && *ns == self.result.namespace {
            return self.state_set_own(key, value);
        }
        if self.result.foreign_state_set_disabled {
            return Err(HookReturnCode::NotAuthorized.into());
        }
        if !foreign_write_allowed(
            self.ledger.as_ref(),
            account,
            &self.result.hook_hash,
            &self.result.account,
        ) {
            self.result.foreign_state_set_disabled = true;
            return Err(HookReturnCode::NotAuthorized.into());
        }
        self.result
            .state_map
            .set(account, ns, key, value, &self.limits)?;
        self.result.changed_state_count = self.result.changed_state_count.saturating_add(1);
        Ok(())
    }

    /// An installation parameter, with overrides for this hook layered in.
    pub fn param(&self, name: &[u8]) -> Option<Vec<u8>> {
        if let Some(overrides) = self.result.param_overrides.get(&self.result.hook_hash) {
            if let Some(value) = overrides.get(name) {
                return Some(value.clone());
            }
        }
        self.params.get(name).cloned()
    }

    /// Set a parameter override for a hook later in the chain.
    pub fn param_set(
        &mut self,
        target_hook: Hash256,
        name: Vec<u8>,
        value: Vec<u8>,
    ) -> Result<(), HookError> {
        if name.is_empty() {
            return Err(HookReturnCode::TooSmall.into());
        }
        if name.len() > self.limits.max_param_key_len
            || value.len() > self.limits.max_param_value_len
        {
            return Err(HookReturnCode::TooBig.into());
        }
        let overrides = self.result.param_overrides.entry(target_hook).or_default();
        if overrides.len() >= self.limits.max_params && !overrides.contains_key(&name) {
            return Err(HookReturnCode::TooManyParams.into());
        }
        overrides.insert(name, value);
        Ok(())
    }

    /// Draw a fresh nonce, unique within this execution.
    pub fn next_nonce(&mut self) -> Result<Hash256, HookError> {
        if self.nonce_counter >= self.limits.max_nonces {
            return Err(HookReturnCode::TooManyNonces.into());
        }
        let counter = self.nonce_counter.to_be_bytes();
        let nonce = sha512h_concat(&[
            b"NONCE",
            &self.ledger.last_ledger_hash(),
            &self.otxn_id,
            &counter,
        ]);
        self.nonce_counter += 1;
        self.nonces_used.insert(nonce);
        Ok(nonce)
    }

    /// The metadata every transaction emitted by this execution carries.
    pub fn emit_spec(&self) -> EmitSpec {
        EmitSpec {
            parent_txn_id: self.otxn_id,
            generation: self.otxn_generation + 1,
            burden: self.otxn_burden.saturating_add(1),
        }
    }
}
