//! Transactional finalisation of hook effects.
//!
//! Nothing a hook does touches the ledger until the whole transaction
//! survives: the orchestrator calls these after the chain completes.
//! Any write failure here is fatal to the transaction.

use hookvm_hostapi::{HookExecutionMeta, LedgerWrite, StateMap};
use hookvm_primitives::error::{ExitType, HookError};
use hookvm_primitives::txn::TxnView;
use hookvm_sandbox::HookResult;

/// Record execution metadata and, when `do_emit` is set and the hook
/// accepted, insert its emitted transactions into the emission
/// directory.
pub fn finalize_hook_result(
    result: &HookResult,
    ledger: &mut dyn LedgerWrite,
    do_emit: bool,
) -> Result<(), HookError> {
    ledger.record_hook_execution(HookExecutionMeta {
        hook_hash: result.hook_hash,
        account: result.account,
        otxn_id: result.otxn_id,
        exit_type: result.exit_type,
        exit_code: result.exit_code,
        exit_reason: result.exit_reason.clone(),
        instruction_count: result.instruction_count,
        emit_count: result.emitted.len() as u32,
        changed_state_count: result.changed_state_count,
    })?;
    if do_emit && result.exit_type == ExitType::Accept {
        for txn in &result.emitted {
            ledger.insert_emitted_txn(txn.clone())?;
        }
    }
    Ok(())
}

/// Apply the modified entries of the state cache to the ledger.
///
/// An empty modified value deletes the key. Returns the number of
/// entries written or deleted.
pub fn finalize_hook_state(
    state_map: &StateMap,
    ledger: &mut dyn LedgerWrite,
) -> Result<u32, HookError> {
    let mut changed = 0u32;
    for (account, ns, key, entry) in state_map.changed() {
        if entry.value.is_empty() {
            ledger.delete_hook_state(account, ns, key)?;
        } else {
            ledger.set_hook_state(account, ns, key, entry.value.clone())?;
        }
        changed += 1;
    }
    Ok(changed)
}

/// When the applied transaction is itself an emitted transaction,
/// remove it from the emission directory.
pub fn remove_emission_entry(
    ledger: &mut dyn LedgerWrite,
    otxn: &[u8],
) -> Result<(), HookError> {
    let txn = TxnView::new(otxn);
    if txn.is_emitted() {
        ledger.remove_emission_entry(&txn.txn_id())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hookvm_hostapi::{EmittedTxn, HookLimits, LedgerView, MemLedger};
    use hookvm_primitives::txn::{EmitDetails, TxnBuilder};
    use hookvm_primitives::types::{TxType, ZERO_HASH};

    const ACC: [u8; 20] = [1u8; 20];
    const NS: [u8; 32] = [0u8; 32];

    #[test]
    fn test_finalize_state_writes_and_deletes() {
        let mut ledger = MemLedger::new();
        ledger.insert_state(ACC, NS, [9u8; 32], vec![0x01]);

        ledger.insert_state(ACC, NS, [7u8; 32], vec![0x07]);

        let mut map = StateMap::new();
        let limits = HookLimits::default();
        map.set(&ACC, &NS, &[1u8; 32], vec![0xBB], &limits).unwrap();
        map.set(&ACC, &NS, &[9u8; 32], vec![], &limits).unwrap(); // delete
        // a read-through cache entry is unmodified and must not count
        map.get(&ledger, &ACC, &NS, &[7u8; 32]).unwrap();

        let changed = finalize_hook_state(&map, &mut ledger).unwrap();
        assert_eq!(changed, 2);
        assert_eq!(ledger.hook_state(&ACC, &NS, &[1u8; 32]), Some(vec![0xBB]));
        assert!(ledger.hook_state(&ACC, &NS, &[9u8; 32]).is_none());
        assert_eq!(ledger.hook_state(&ACC, &NS, &[7u8; 32]), Some(vec![0x07]));
    }

    #[test]
    fn test_remove_emission_entry_for_emitted_txn() {
        let mut ledger = MemLedger::new();
        let blob = TxnBuilder::new(TxType::Payment)
            .account(&ACC)
            .emit_details(&EmitDetails {
                generation: 1,
                burden: 2,
                parent_txn_id: ZERO_HASH,
                nonce: [3u8; 32],
                callback: ACC,
            })
            .build();
        ledger
            .insert_emitted_txn(EmittedTxn {
                blob: blob.clone(),
                burden: 2,
                generation: 1,
            })
            .unwrap();

        remove_emission_entry(&mut ledger, &blob).unwrap();
        assert!(ledger.emitted().is_empty());
    }

    #[test]
    fn test_remove_emission_entry_ignores_user_txns() {
        let mut ledger = MemLedger::new();
        let blob = TxnBuilder::new(TxType::Payment).account(&ACC).build();
        remove_emission_entry(&mut ledger, &blob).unwrap();
    }
}
