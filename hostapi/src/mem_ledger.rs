//! In-memory ledger for testing.
//!
//! `MemLedger` implements both ledger traits over `BTreeMap`s for
//! deterministic iteration order. Tests seed it with accounts, hook
//! installations, state, and ledger objects, then inspect what
//! finalisation wrote back.

use std::collections::BTreeMap;

use hookvm_primitives::error::HookError;
use hookvm_primitives::keylet::Keylet;
use hookvm_primitives::types::{AccountId, Hash256, NamespaceId, ZERO_HASH};

use crate::ledger::{
    EmittedTxn, HookDefinition, HookExecutionMeta, HookGrant, HookInstallation, LedgerView,
    LedgerWrite,
};

/// In-memory ledger backed by `BTreeMap`s.
#[derive(Debug, Clone, Default)]
pub struct MemLedger {
    pub ledger_seq: u32,
    pub last_hash: Hash256,
    pub base_fee: u64,
    accounts: BTreeMap<AccountId, ()>,
    state: BTreeMap<(AccountId, NamespaceId, Hash256), Vec<u8>>,
    installations: BTreeMap<AccountId, Vec<HookInstallation>>,
    definitions: BTreeMap<Hash256, HookDefinition>,
    objects: BTreeMap<[u8; 34], Vec<u8>>,
    emitted: Vec<EmittedTxn>,
    executions: Vec<HookExecutionMeta>,
    fees: BTreeMap<AccountId, u64>,
}

impl MemLedger {
    pub fn new() -> Self {
        Self {
            ledger_seq: 1,
            last_hash: ZERO_HASH,
            base_fee: 10,
            ..Self::default()
        }
    }

    pub fn insert_account(&mut self, account: AccountId) {
        self.accounts.insert(account, ());
    }

    pub fn insert_state(
        &mut self,
        account: AccountId,
        ns: NamespaceId,
        key: Hash256,
        value: Vec<u8>,
    ) {
        self.state.insert((account, ns, key), value);
    }

    pub fn insert_object(&mut self, keylet: &Keylet, blob: Vec<u8>) {
        self.objects.insert(keylet.to_bytes(), blob);
    }

    /// Install a hook at the end of an account's chain.
    pub fn install_hook(
        &mut self,
        account: AccountId,
        definition: HookDefinition,
        namespace: NamespaceId,
        params: BTreeMap<Vec<u8>, Vec<u8>>,
        grants: Vec<HookGrant>,
    ) {
        self.insert_account(account);
        let installation = HookInstallation {
            hook_hash: definition.hook_hash,
            namespace,
            params,
            grants,
        };
        self.definitions.insert(definition.hook_hash, definition);
        self.installations.entry(account).or_default().push(installation);
    }

    pub fn emitted(&self) -> &[EmittedTxn] {
        &self.emitted
    }

    pub fn executions(&self) -> &[HookExecutionMeta] {
        &self.executions
    }

    pub fn fee_charged(&self, account: &AccountId) -> u64 {
        self.fees.get(account).copied().unwrap_or(0)
    }

    pub fn state_entry(
        &self,
        account: &AccountId,
        ns: &NamespaceId,
        key: &Hash256,
    ) -> Option<&Vec<u8>> {
        self.state.get(&(*account, *ns, *key))
    }
}

impl LedgerView for MemLedger {
    fn ledger_seq(&self) -> u32 {
        self.ledger_seq
    }

    fn last_ledger_hash(&self) -> Hash256 {
        self.last_hash
    }

    fn base_fee(&self) -> u64 {
        self.base_fee
    }

    fn account_exists(&self, account: &AccountId) -> bool {
        self.accounts.contains_key(account)
    }

    fn hook_state(
        &self,
        account: &AccountId,
        ns: &NamespaceId,
        key: &Hash256,
    ) -> Option<Vec<u8>> {
        self.state.get(&(*account, *ns, *key)).cloned()
    }

    fn hook_installations(&self, account: &AccountId) -> Vec<HookInstallation> {
        self.installations.get(account).cloned().unwrap_or_default()
    }

    fn hook_definition(&self, hash: &Hash256) -> Option<HookDefinition> {
        self.definitions.get(hash).cloned()
    }

    fn ledger_object(&self, keylet: &Keylet) -> Option<Vec<u8>> {
        self.objects.get(&keylet.to_bytes()).cloned()
    }
}

impl LedgerWrite for MemLedger {
    fn set_hook_state(
        &mut self,
        account: &AccountId,
        ns: &NamespaceId,
        key: &Hash256,
        value: Vec<u8>,
    ) -> Result<(), HookError> {
        self.state.insert((*account, *ns, *key), value);
        Ok(())
    }

    fn delete_hook_state(
        &mut self,
        account: &AccountId,
        ns: &NamespaceId,
        key: &Hash256,
    ) -> Result<(), HookError> {
        self.state.remove(&(*account, *ns, *key));
        Ok(())
    }

    fn delete_namespace(
        &mut self,
        account: &AccountId,
        ns: &NamespaceId,
    ) -> Result<(), HookError> {
        self.state
            .retain(|(acc, namespace, _), _| !(acc == account && namespace == ns));
        Ok(())
    }

    fn set_hook_definition(&mut self, definition: HookDefinition) -> Result<(), HookError> {
        self.definitions.insert(definition.hook_hash, definition);
        Ok(())
    }

    fn set_hook_installations(
        &mut self,
        account: &AccountId,
        chain: Vec<HookInstallation>,
    ) -> Result<(), HookError> {
        if chain.is_empty() {
            self.installations.remove(account);
        } else {
            self.installations.insert(*account, chain);
        }
        Ok(())
    }

    fn insert_emitted_txn(&mut self, txn: EmittedTxn) -> Result<(), HookError> {
        self.emitted.push(txn);
        Ok(())
    }

    fn remove_emission_entry(&mut self, txn_id: &Hash256) -> Result<(), HookError> {
        let before = self.emitted.len();
        self.emitted.retain(|t| &t.txn_id() != txn_id);
        if self.emitted.len() == before {
            return Err(HookError::Code(
                hookvm_primitives::HookReturnCode::DoesntExist,
            ));
        }
        Ok(())
    }

    fn record_hook_execution(&mut self, meta: HookExecutionMeta) -> Result<(), HookError> {
        self.executions.push(meta);
        Ok(())
    }

    fn charge_fee(&mut self, account: &AccountId, drops: u64) -> Result<(), HookError> {
        *self.fees.entry(*account).or_default() += drops;
        Ok(())
    }
}
