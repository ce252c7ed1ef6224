//! Backend ledger abstraction for hook execution.
//!
//! `LedgerView` is the read surface the sandbox sees during execution;
//! `LedgerWrite` adds the commit operations used at finalisation. Both
//! must be deterministic: the same query against the same ledger state
//! always returns the same answer.

use std::collections::BTreeMap;

use hookvm_primitives::error::{ExitType, HookError};
use hookvm_primitives::keylet::Keylet;
use hookvm_primitives::txn::TxnView;
use hookvm_primitives::types::{AccountId, Hash256, NamespaceId};

/// An immutable hook definition, shared by every installation that
/// references its hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookDefinition {
    /// SHA-512/256 over the bytecode.
    pub hook_hash: Hash256,
    pub wasm: Vec<u8>,
    pub api_version: u32,
    /// Bitmask of transaction types that trigger the hook.
    pub hook_on: u64,
    /// Worst-case instruction count computed at install time.
    pub max_instr_count: u64,
}

/// Permission for a foreign hook to write this installation's state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookGrant {
    pub hook_hash: Hash256,
    /// When set, the grant is limited to hooks installed on this account.
    pub authorize: Option<AccountId>,
}

/// One position in an account's hook chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookInstallation {
    pub hook_hash: Hash256,
    pub namespace: NamespaceId,
    pub params: BTreeMap<Vec<u8>, Vec<u8>>,
    pub grants: Vec<HookGrant>,
}

/// A guest-produced transaction awaiting insertion into the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmittedTxn {
    pub blob: Vec<u8>,
    pub burden: u64,
    pub generation: u32,
}

impl EmittedTxn {
    pub fn txn_id(&self) -> Hash256 {
        TxnView::new(&self.blob).txn_id()
    }
}

/// Execution metadata recorded at finalisation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookExecutionMeta {
    pub hook_hash: Hash256,
    pub account: AccountId,
    pub otxn_id: Hash256,
    pub exit_type: ExitType,
    pub exit_code: i64,
    pub exit_reason: Vec<u8>,
    pub instruction_count: u64,
    pub emit_count: u32,
    pub changed_state_count: u16,
}

/// Read surface over committed ledger state.
pub trait LedgerView: Send + Sync {
    /// Current ledger sequence number.
    fn ledger_seq(&self) -> u32;

    /// Hash of the last closed ledger.
    fn last_ledger_hash(&self) -> Hash256;

    /// Base network fee in drops.
    fn base_fee(&self) -> u64;

    fn account_exists(&self, account: &AccountId) -> bool;

    /// Committed hook-state value, if any.
    fn hook_state(&self, account: &AccountId, ns: &NamespaceId, key: &Hash256)
        -> Option<Vec<u8>>;

    /// The ordered installation chain for an account. Empty when the
    /// account has no hooks.
    fn hook_installations(&self, account: &AccountId) -> Vec<HookInstallation>;

    fn hook_definition(&self, hash: &Hash256) -> Option<HookDefinition>;

    /// A serialized ledger object by keylet.
    ///
    /// Default implementation reports nothing; backends that can
    /// materialize objects override this.
    fn ledger_object(&self, keylet: &Keylet) -> Option<Vec<u8>> {
        let _ = keylet;
        None
    }
}

/// Commit surface used by transactional finalisation.
pub trait LedgerWrite: LedgerView {
    fn set_hook_state(
        &mut self,
        account: &AccountId,
        ns: &NamespaceId,
        key: &Hash256,
        value: Vec<u8>,
    ) -> Result<(), HookError>;

    fn delete_hook_state(
        &mut self,
        account: &AccountId,
        ns: &NamespaceId,
        key: &Hash256,
    ) -> Result<(), HookError>;

    /// Drop every state entry in one of the account's namespaces.
    fn delete_namespace(&mut self, account: &AccountId, ns: &NamespaceId)
        -> Result<(), HookError>;

    fn set_hook_definition(&mut self, definition: HookDefinition) -> Result<(), HookError>;

    fn set_hook_installations(
        &mut self,
        account: &AccountId,
        chain: Vec<HookInstallation>,
    ) -> Result<(), HookError>;

    /// Append to the emitted-transaction directory.
    fn insert_emitted_txn(&mut self, txn: EmittedTxn) -> Result<(), HookError>;

    /// Remove an entry from the emitted-transaction directory.
    fn remove_emission_entry(&mut self, txn_id: &Hash256) -> Result<(), HookError>;

    fn record_hook_execution(&mut self, meta: HookExecutionMeta) -> Result<(), HookError>;

    /// Assess drops against an account. Charged even for rolled-back
    /// hook executions.
    fn charge_fee(&mut self, account: &AccountId, drops: u64) -> Result<(), HookError>;
}
