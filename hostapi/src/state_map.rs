//! Two-level write-through hook-state cache.
//!
//! The map nests `account → namespace → key → (modified, value)`. Reads
//! fall through to the ledger and are cached unmodified; writes upsert
//! with the modified flag set. An empty-value write is a deletion marker
//! honoured at finalisation. Unmodified entries are pure read caches and
//! may be dropped without effect.

use std::collections::BTreeMap;

use hookvm_primitives::error::{HookError, HookReturnCode};
use hookvm_primitives::types::{AccountId, Hash256, NamespaceId};

use crate::config::HookLimits;
use crate::ledger::LedgerView;

/// One cached state entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateEntry {
    /// True when the entry supersedes the ledger value.
    pub modified: bool,
    /// Empty with `modified` set means delete-at-finalisation.
    pub value: Vec<u8>,
}

/// The chain-wide hook-state cache.
#[derive(Debug, Clone, Default)]
pub struct StateMap {
    accounts: BTreeMap<AccountId, BTreeMap<NamespaceId, BTreeMap<Hash256, StateEntry>>>,
}

impl StateMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a value, consulting the cache before the ledger.
    ///
    /// A cached deletion marker reads as `DOESNT_EXIST`. Ledger hits are
    /// cached unmodified.
    pub fn get(
        &mut self,
        ledger: &dyn LedgerView,
        account: &AccountId,
        ns: &NamespaceId,
        key: &Hash256,
    ) -> Result<Vec<u8>, HookError> {
        if let Some(entry) = self
            .accounts
            .get(account)
            .and_then(|a| a.get(ns))
            .and_then(|n| n.get(key))
        {
            if entry.modified && entry.value.is_empty() {
                return Err(HookReturnCode::DoesntExist.into());
            }
            return Ok(entry.value.clone());
        }
        match ledger.hook_state(account, ns, key) {
            Some(value) => {
                self.accounts
                    .entry(*account)
                    .or_default()
                    .entry(*ns)
                    .or_default()
                    .insert(
                        *key,
                        StateEntry {
                            modified: false,
                            value: value.clone(),
                        },
                    );
                Ok(value)
            }
            None => Err(HookReturnCode::DoesntExist.into()),
        }
    }

    /// Write a value (empty = delete marker), marking it modified.
    pub fn set(
        &mut self,
        account: &AccountId,
        ns: &NamespaceId,
        key: &Hash256,
        value: Vec<u8>,
        limits: &HookLimits,
    ) -> Result<(), HookError> {
        if value.len() > limits.max_state_data_len {
            return Err(HookReturnCode::TooBig.into());
        }
        let namespace = self.accounts.entry(*account).or_default().entry(*ns).or_default();
        let fresh_modification = !namespace.get(key).map(|e| e.modified).unwrap_or(false);
        if fresh_modification && self.modified_count() >= limits.max_state_modifications {
            return Err(HookReturnCode::TooBig.into());
        }
        let namespace = self
            .accounts
            .entry(*account)
            .or_default()
            .entry(*ns)
            .or_default();
        namespace.insert(
            *key,
            StateEntry {
                modified: true,
                value,
            },
        );
        Ok(())
    }

    /// Whether an entry is cached at all (modified or not).
    pub fn contains(&self, account: &AccountId, ns: &NamespaceId, key: &Hash256) -> bool {
        self.accounts
            .get(account)
            .and_then(|a| a.get(ns))
            .map(|n| n.contains_key(key))
            .unwrap_or(false)
    }

    /// The cached entry, if any.
    pub fn entry(&self, account: &AccountId, ns: &NamespaceId, key: &Hash256) -> Option<&StateEntry> {
        self.accounts.get(account).and_then(|a| a.get(ns)).and_then(|n| n.get(key))
    }

    /// Iterate modified entries in deterministic order.
    pub fn changed(
        &self,
    ) -> impl Iterator<Item = (&AccountId, &NamespaceId, &Hash256, &StateEntry)> {
        self.accounts.iter().flat_map(|(acc, namespaces)| {
            namespaces.iter().flat_map(move |(ns, keys)| {
                keys.iter()
                    .filter(|(_, e)| e.modified)
                    .map(move |(key, e)| (acc, ns, key, e))
            })
        })
    }

    /// Number of modified entries.
    pub fn modified_count(&self) -> usize {
        self.changed().count()
    }
}

/// Whether `writer` (hook hash + installing account) may write state
/// owned by `owner`.
///
/// A matching grant on any of the owner's installations authorises the
/// write; a grant that pins an account also requires the writer to be
/// installed on that account.
pub fn foreign_write_allowed(
    ledger: &dyn LedgerView,
    owner: &AccountId,
    writer_hook_hash: &Hash256,
    writer_account: &AccountId,
) -> bool {
    ledger
        .hook_installations(owner)
        .iter()
        .flat_map(|inst| inst.grants.iter())
        .any(|grant| {
            grant.hook_hash == *writer_hook_hash
                && grant
                    .authorize
                    .map(|acc| acc == *writer_account)
                    .unwrap_or(true)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{HookDefinition, HookGrant};
    use crate::mem_ledger::MemLedger;
    use hookvm_primitives::types::ZERO_HASH;

    const ACC: AccountId = [1u8; 20];
    const NS: NamespaceId = [0u8; 32];
    const KEY: Hash256 = [7u8; 32];

    #[test]
    fn test_read_through_caches_unmodified() {
        let mut ledger = MemLedger::new();
        ledger.insert_state(ACC, NS, KEY, vec![0xAA]);
        let mut map = StateMap::new();

        assert_eq!(map.get(&ledger, &ACC, &NS, &KEY).unwrap(), vec![0xAA]);
        let entry = map.entry(&ACC, &NS, &KEY).unwrap();
        assert!(!entry.modified);
        assert_eq!(map.modified_count(), 0);
    }

    #[test]
    fn test_missing_key_doesnt_exist() {
        let ledger = MemLedger::new();
        let mut map = StateMap::new();
        let err = map.get(&ledger, &ACC, &NS, &KEY).unwrap_err();
        assert_eq!(err.to_return_code(), -5);
    }

    #[test]
    fn test_written_value_reads_back_modified() {
        let ledger = MemLedger::new();
        let mut map = StateMap::new();
        map.set(&ACC, &NS, &KEY, vec![0xBB], &HookLimits::default()).unwrap();

        assert_eq!(map.get(&ledger, &ACC, &NS, &KEY).unwrap(), vec![0xBB]);
        assert!(map.entry(&ACC, &NS, &KEY).unwrap().modified);
        assert_eq!(map.modified_count(), 1);
    }

    #[test]
    fn test_write_supersedes_ledger() {
        let mut ledger = MemLedger::new();
        ledger.insert_state(ACC, NS, KEY, vec![0x01]);
        let mut map = StateMap::new();
        map.set(&ACC, &NS, &KEY, vec![0x02], &HookLimits::default()).unwrap();
        assert_eq!(map.get(&ledger, &ACC, &NS, &KEY).unwrap(), vec![0x02]);
    }

    #[test]
    fn test_empty_write_is_delete_marker() {
        let mut ledger = MemLedger::new();
        ledger.insert_state(ACC, NS, KEY, vec![0x01]);
        let mut map = StateMap::new();
        map.set(&ACC, &NS, &KEY, vec![], &HookLimits::default()).unwrap();

        let err = map.get(&ledger, &ACC, &NS, &KEY).unwrap_err();
        assert_eq!(err.to_return_code(), -5);
        let changed: Vec<_> = map.changed().collect();
        assert_eq!(changed.len(), 1);
        assert!(changed[0].3.value.is_empty());
    }

    #[test]
    fn test_oversized_value_too_big() {
        let mut map = StateMap::new();
        let limits = HookLimits::default();
        let big = vec![0u8; limits.max_state_data_len + 1];
        let err = map.set(&ACC, &NS, &KEY, big, &limits).unwrap_err();
        assert_eq!(err.to_return_code(), -3);
    }

    #[test]
    fn test_modification_cap() {
        let mut map = StateMap::new();
        let limits = HookLimits {
            max_state_modifications: 2,
            ..HookLimits::default()
        };
        map.set(&ACC, &NS, &[0u8; 32], vec![1], &limits).unwrap();
        map.set(&ACC, &NS, &[1u8; 32], vec![2], &limits).unwrap();
        // Overwriting an already-modified entry is not a fresh modification
        map.set(&ACC, &NS, &[0u8; 32], vec![3], &limits).unwrap();
        let err = map.set(&ACC, &NS, &[2u8; 32], vec![4], &limits).unwrap_err();
        assert_eq!(err.to_return_code(), -3);
    }

    #[test]
    fn test_changed_iteration_is_deterministic() {
        let mut map = StateMap::new();
        let limits = HookLimits::default();
        map.set(&[2u8; 20], &NS, &[9u8; 32], vec![1], &limits).unwrap();
        map.set(&[1u8; 20], &NS, &[3u8; 32], vec![2], &limits).unwrap();
        map.set(&[1u8; 20], &NS, &[1u8; 32], vec![3], &limits).unwrap();
        let order: Vec<AccountId> = map.changed().map(|(a, _, _, _)| *a).collect();
        assert_eq!(order, vec![[1u8; 20], [1u8; 20], [2u8; 20]]);
    }

    fn grant_ledger(grants: Vec<HookGrant>) -> MemLedger {
        let mut ledger = MemLedger::new();
        let owner = [5u8; 20];
        ledger.install_hook(
            owner,
            HookDefinition {
                hook_hash: [0x42; 32],
                wasm: vec![],
                api_version: 0,
                hook_on: u64::MAX,
                max_instr_count: 0,
            },
            ZERO_HASH,
            BTreeMap::new(),
            grants,
        );
        ledger
    }

    #[test]
    fn test_foreign_write_requires_grant() {
        let ledger = grant_ledger(vec![]);
        assert!(!foreign_write_allowed(&ledger, &[5u8; 20], &[0x99; 32], &[6u8; 20]));
    }

    #[test]
    fn test_foreign_write_with_matching_grant() {
        let ledger = grant_ledger(vec![HookGrant {
            hook_hash: [0x99; 32],
            authorize: None,
        }]);
        assert!(foreign_write_allowed(&ledger, &[5u8; 20], &[0x99; 32], &[6u8; 20]));
        assert!(!foreign_write_allowed(&ledger, &[5u8; 20], &[0x98; 32], &[6u8; 20]));
    }

    #[test]
    fn test_foreign_write_grant_pins_account() {
        let ledger = grant_ledger(vec![HookGrant {
            hook_hash: [0x99; 32],
            authorize: Some([6u8; 20]),
        }]);
        assert!(foreign_write_allowed(&ledger, &[5u8; 20], &[0x99; 32], &[6u8; 20]));
        assert!(!foreign_write_allowed(&ledger, &[5u8; 20], &[0x99; 32], &[7u8; 20]));
    }
}
