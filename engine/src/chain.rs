//! Chain-of-hooks orchestration.
//!
//! For one transaction: resolve the stakeholders, run each account's
//! installation chain head-to-tail with the shared state cache, honour
//! skips and parameter overrides set by earlier hooks, demote rollbacks
//! from collect-only stakeholders, and abort the whole transaction on a
//! veto. Execution fees accrue for every hook that ran, vetoed or not.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use hookvm_hostapi::{fees, EmittedTxn, LedgerView, LedgerWrite, StateMap};
use hookvm_primitives::error::ExitType;
use hookvm_primitives::txn::TxnView;
use hookvm_primitives::types::{can_hook, AccountId, Hash256, ZERO_HASH};
use hookvm_sandbox::{apply, HookResult, SandboxConfig};

use crate::error::EngineError;
use crate::finalize;
use crate::tsh::{self, TshFlags};

/// Transaction-level outcome of the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainResult {
    /// Every consulted hook allowed the transaction.
    Success,
    /// A rollback-rights hook vetoed it; nothing is persisted.
    HookRejected,
}

/// Everything the chain produced, ready for finalisation.
#[derive(Debug)]
pub struct ChainOutcome {
    pub result: ChainResult,
    /// Per-hook results in execution order, demoted hooks included.
    pub executions: Vec<HookResult>,
    /// The surviving chain-wide state cache.
    pub state_map: StateMap,
    /// Surviving emissions, in hook-chain then per-hook order.
    pub emitted: Vec<EmittedTxn>,
    /// Execution fees accrued per hook-owning account.
    pub fees: BTreeMap<AccountId, u64>,
}

/// Run every applicable hook for a transaction.
pub fn apply_hooks(
    otxn: &[u8],
    ledger: Arc<dyn LedgerView>,
    config: &SandboxConfig,
) -> Result<ChainOutcome, EngineError> {
    let txn = TxnView::new(otxn);
    let tx_type = txn.txn_type().map_err(|_| EngineError::MalformedTxn)?;
    let stakeholders =
        tsh::stakeholders(&txn, ledger.as_ref()).ok_or(EngineError::MalformedTxn)?;

    let mut state_map = StateMap::new();
    let mut emitted: Vec<EmittedTxn> = Vec::new();
    let mut executions: Vec<HookResult> = Vec::new();
    let mut skips: BTreeSet<Hash256> = BTreeSet::new();
    let mut overrides: BTreeMap<Hash256, BTreeMap<Vec<u8>, Vec<u8>>> = BTreeMap::new();
    let mut accrued: BTreeMap<AccountId, u64> = BTreeMap::new();

    for (account, rights) in stakeholders {
        let mut chain = ledger.hook_installations(&account);
        chain.truncate(config.limits.max_hook_chain_len);

        for (position, installation) in chain.iter().enumerate() {
            if skips.contains(&installation.hook_hash) {
                continue;
            }
            let Some(definition) = ledger.hook_definition(&installation.hook_hash) else {
                tracing::warn!(
                    "missing hook definition for installed hook at position {position}"
                );
                continue;
            };
            if !can_hook(tx_type, definition.hook_on) {
                continue;
            }

            let result = apply(
                ZERO_HASH,
                installation.hook_hash,
                installation.namespace,
                &definition.wasm,
                installation.params.clone(),
                overrides.clone(),
                state_map.clone(),
                Arc::clone(&ledger),
                account,
                otxn.to_vec(),
                false,
                0,
                position as i32,
                config,
            )?;

            *accrued.entry(account).or_default() +=
                fees::execution_fee(result.instruction_count);

            match result.exit_type {
                ExitType::Accept => {
                    state_map = result.state_map.clone();
                    emitted.extend(result.emitted.iter().cloned());
                    skips.extend(result.hook_skips.iter().copied());
                    overrides = result.param_overrides.clone();
                    executions.push(result);
                }
                ExitType::Rollback | ExitType::WasmError | ExitType::Unset => {
                    if rights == TshFlags::Rollback {
                        executions.push(result);
                        return Ok(ChainOutcome {
                            result: ChainResult::HookRejected,
                            executions,
                            state_map: StateMap::new(),
                            emitted: Vec::new(),
                            fees: accrued,
                        });
                    }
                    // Collect-only stakeholder: demote. This hook's
                    // state delta and emissions are dropped; the
                    // transaction continues.
                    executions.push(result);
                }
            }
        }
    }

    Ok(ChainOutcome {
        result: ChainResult::Success,
        executions,
        state_map,
        emitted,
        fees: accrued,
    })
}

/// Commit a chain outcome: fees always, execution metadata always,
/// state writes and emissions only when the transaction succeeded.
pub fn finalize_chain(
    outcome: &ChainOutcome,
    otxn: &[u8],
    ledger: &mut dyn LedgerWrite,
) -> Result<(), EngineError> {
    for (account, drops) in &outcome.fees {
        ledger.charge_fee(account, *drops)?;
    }
    let do_emit = outcome.result == ChainResult::Success;
    for execution in &outcome.executions {
        finalize::finalize_hook_result(execution, ledger, do_emit)?;
    }
    if outcome.result == ChainResult::Success {
        finalize::finalize_hook_state(&outcome.state_map, ledger)?;
        finalize::remove_emission_entry(ledger, otxn)?;
    }
    Ok(())
}
