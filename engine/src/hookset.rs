//! Install-transaction validation and application.
//!
//! A hook install transaction carries an array of entries, one per chain
//! position. Each entry is classified into an operation and checked
//! against the position's current contents; every rejection logs a
//! stable `HookSet(<code>)` line. Applying a valid transaction updates
//! definitions, installations, and namespaces, and assesses the
//! creation fee for fresh bytecode.

use std::collections::BTreeMap;

use hookvm_hostapi::{fees, HookDefinition, HookGrant, HookInstallation, LedgerWrite};
use hookvm_primitives::crypto::sha512h;
use hookvm_primitives::error::HookSetCode;
use hookvm_primitives::types::{
    AccountId, Hash256, NamespaceId, HOOK_API_VERSION, MAX_GRANTS, MAX_PARAMS,
    MAX_PARAM_KEY_LEN, MAX_PARAM_VALUE_LEN,
};
use hookvm_sandbox::{validate_hook_wasm, HookSetError, SandboxConfig};

use crate::error::EngineError;

/// Replace or delete an existing installation.
pub const HSF_OVERRIDE: u32 = 1 << 0;
/// Delete a whole namespace.
pub const HSF_NSDELETE: u32 = 1 << 1;

/// One parameter in an install entry. Fields are optional so malformed
/// submissions can be diagnosed precisely.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HookSetParam {
    pub name: Option<Vec<u8>>,
    pub value: Option<Vec<u8>>,
}

/// One grant in an install entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HookSetGrant {
    pub hook_hash: Option<Hash256>,
    pub authorize: Option<AccountId>,
}

/// One position of an install transaction's hooks array.
#[derive(Debug, Clone, Default)]
pub struct HookSetEntry {
    pub create_code: Option<Vec<u8>>,
    pub hook_hash: Option<Hash256>,
    pub hook_on: Option<u64>,
    pub namespace: Option<NamespaceId>,
    pub api_version: Option<u32>,
    pub params: Option<Vec<HookSetParam>>,
    pub grants: Option<Vec<HookSetGrant>>,
    pub flags: u32,
}

impl HookSetEntry {
    fn is_empty(&self) -> bool {
        self.create_code.is_none()
            && self.hook_hash.is_none()
            && self.hook_on.is_none()
            && self.namespace.is_none()
            && self.api_version.is_none()
            && self.params.is_none()
            && self.grants.is_none()
            && self.flags == 0
    }
}

/// The operation an entry performs on its chain position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i8)]
pub enum HookSetOperation {
    Invalid = -1,
    Noop = 0,
    Create = 1,
    Install = 2,
    Delete = 3,
    NsDelete = 4,
    Update = 5,
}

/// Classify an entry. Shape violations are reported by
/// [`validate_entry`]; this only decides intent.
pub fn determine_operation(entry: &HookSetEntry) -> HookSetOperation {
    match (&entry.create_code, &entry.hook_hash) {
        (Some(_), Some(_)) => HookSetOperation::Invalid,
        (Some(code), None) => {
            if code.is_empty() {
                HookSetOperation::Delete
            } else {
                HookSetOperation::Create
            }
        }
        (None, Some(_)) => HookSetOperation::Install,
        (None, None) => {
            if entry.flags & HSF_NSDELETE != 0 {
                HookSetOperation::NsDelete
            } else if entry.is_empty() {
                HookSetOperation::Noop
            } else {
                HookSetOperation::Update
            }
        }
    }
}

fn check_params(
    entry: &HookSetEntry,
    account: &AccountId,
) -> Result<(), HookSetError> {
    let Some(params) = &entry.params else {
        return Ok(());
    };
    if params.len() > MAX_PARAMS {
        return Err(HookSetError::new(
            HookSetCode::ParametersIllegal,
            account,
            format!("{} parameters exceed the limit of {MAX_PARAMS}", params.len()),
        ));
    }
    for param in params {
        let Some(name) = &param.name else {
            return Err(HookSetError::new(
                HookSetCode::ParametersName,
                account,
                "parameter lacks a name",
            ));
        };
        if name.is_empty() || name.len() > MAX_PARAM_KEY_LEN {
            return Err(HookSetError::new(
                HookSetCode::ParametersField,
                account,
                "parameter name has an invalid length",
            ));
        }
        if let Some(value) = &param.value {
            if value.len() > MAX_PARAM_VALUE_LEN {
                return Err(HookSetError::new(
                    HookSetCode::ParametersField,
                    account,
                    "parameter value has an invalid length",
                ));
            }
        }
    }
    Ok(())
}

fn check_grants(entry: &HookSetEntry, account: &AccountId) -> Result<(), HookSetError> {
    let Some(grants) = &entry.grants else {
        return Ok(());
    };
    if grants.is_empty() {
        return Err(HookSetError::new(
            HookSetCode::GrantsEmpty,
            account,
            "grants array is empty; remove it",
        ));
    }
    if grants.len() > MAX_GRANTS {
        return Err(HookSetError::new(
            HookSetCode::GrantsExcess,
            account,
            format!("{} grants exceed the limit of {MAX_GRANTS}", grants.len()),
        ));
    }
    for grant in grants {
        if grant.hook_hash.is_none() && grant.authorize.is_none() {
            return Err(HookSetError::new(
                HookSetCode::GrantsField,
                account,
                "grant lacks both authorize and hook hash",
            ));
        }
        if grant.hook_hash.is_none() {
            return Err(HookSetError::new(
                HookSetCode::GrantsField,
                account,
                "grant lacks a hook hash",
            ));
        }
    }
    Ok(())
}

/// Validate one entry against its chain position.
///
/// `has_existing` is whether the position currently holds an
/// installation.
pub fn validate_entry(
    entry: &HookSetEntry,
    account: &AccountId,
    has_existing: bool,
) -> Result<HookSetOperation, HookSetError> {
    if entry.flags & !(HSF_OVERRIDE | HSF_NSDELETE) != 0 {
        return Err(HookSetError::new(
            HookSetCode::FlagsInvalid,
            account,
            format!("unknown flag bits 0x{:x}", entry.flags),
        ));
    }
    let op = determine_operation(entry);
    if op == HookSetOperation::Invalid {
        return Err(HookSetError::new(
            HookSetCode::HashOrCode,
            account,
            "entry may carry bytecode or a hook hash, not both",
        ));
    }
    check_params(entry, account)?;
    check_grants(entry, account)?;

    match op {
        HookSetOperation::Noop => {}
        HookSetOperation::Create => {
            if entry.namespace.is_none() {
                return Err(HookSetError::new(
                    HookSetCode::NamespaceMissing,
                    account,
                    "create requires a namespace",
                ));
            }
            match entry.api_version {
                None => {
                    return Err(HookSetError::new(
                        HookSetCode::ApiMissing,
                        account,
                        "create requires an api version",
                    ))
                }
                Some(v) if v != HOOK_API_VERSION => {
                    return Err(HookSetError::new(
                        HookSetCode::ApiInvalid,
                        account,
                        format!("unrecognised hook api version {v}"),
                    ))
                }
                Some(_) => {}
            }
            if entry.hook_on.is_none() {
                return Err(HookSetError::new(
                    HookSetCode::HookOnMissing,
                    account,
                    "create requires a hook-on mask",
                ));
            }
            if has_existing && entry.flags & HSF_OVERRIDE == 0 {
                return Err(HookSetError::new(
                    HookSetCode::OverrideMissing,
                    account,
                    "replacing an installed hook requires the override flag",
                ));
            }
        }
        HookSetOperation::Install => {
            if entry.api_version.is_some() {
                return Err(HookSetError::new(
                    HookSetCode::ApiIllegal,
                    account,
                    "api version belongs to the definition, not the installation",
                ));
            }
            if entry.namespace.is_none() {
                return Err(HookSetError::new(
                    HookSetCode::NamespaceMissing,
                    account,
                    "install requires a namespace",
                ));
            }
            if has_existing && entry.flags & HSF_OVERRIDE == 0 {
                return Err(HookSetError::new(
                    HookSetCode::OverrideMissing,
                    account,
                    "replacing an installed hook requires the override flag",
                ));
            }
        }
        HookSetOperation::Delete => {
            if entry.hook_on.is_some()
                || entry.params.is_some()
                || entry.grants.is_some()
                || entry.api_version.is_some()
            {
                return Err(HookSetError::new(
                    HookSetCode::DeleteField,
                    account,
                    "delete carries no payload fields",
                ));
            }
            if entry.flags & HSF_OVERRIDE == 0 {
                return Err(HookSetError::new(
                    HookSetCode::OverrideMissing,
                    account,
                    "delete requires the override flag",
                ));
            }
        }
        HookSetOperation::NsDelete => {
            if entry.namespace.is_none() {
                return Err(HookSetError::new(
                    HookSetCode::NsDeleteFlags,
                    account,
                    "namespace delete requires a namespace",
                ));
            }
            if entry.hook_on.is_some()
                || entry.params.is_some()
                || entry.grants.is_some()
                || entry.api_version.is_some()
            {
                return Err(HookSetError::new(
                    HookSetCode::NsDeleteField,
                    account,
                    "namespace delete carries no payload fields",
                ));
            }
        }
        HookSetOperation::Update => {
            if !has_existing {
                return Err(HookSetError::new(
                    HookSetCode::DeleteField,
                    account,
                    "update targets an empty chain position",
                ));
            }
            if entry.flags & HSF_OVERRIDE == 0 && entry.hook_on.is_some() {
                return Err(HookSetError::new(
                    HookSetCode::OverrideMissing,
                    account,
                    "changing the hook-on mask requires the override flag",
                ));
            }
        }
        HookSetOperation::Invalid => unreachable!("rejected above"),
    }
    Ok(op)
}

fn entry_params(entry: &HookSetEntry) -> BTreeMap<Vec<u8>, Vec<u8>> {
    entry
        .params
        .iter()
        .flatten()
        .filter_map(|p| Some((p.name.clone()?, p.value.clone().unwrap_or_default())))
        .collect()
}

fn entry_grants(entry: &HookSetEntry) -> Vec<HookGrant> {
    entry
        .grants
        .iter()
        .flatten()
        .filter_map(|g| {
            Some(HookGrant {
                hook_hash: g.hook_hash?,
                authorize: g.authorize,
            })
        })
        .collect()
}

/// Validate and apply an install transaction to an account's chain.
///
/// Entries align with chain positions. Returns the total fee assessed
/// for fresh bytecode.
pub fn apply_hook_set(
    ledger: &mut dyn LedgerWrite,
    account: &AccountId,
    entries: &[HookSetEntry],
    config: &SandboxConfig,
) -> Result<u64, EngineError> {
    let mut chain = ledger.hook_installations(account);
    let original_len = chain.len();
    let mut total_fee = 0u64;

    // Validate every entry before touching the ledger.
    let mut operations = Vec::with_capacity(entries.len());
    let mut validated_code = Vec::with_capacity(entries.len());
    for (position, entry) in entries.iter().enumerate() {
        let has_existing = position < original_len;
        operations.push(validate_entry(entry, account, has_existing)?);
        let mut validated = None;
        if let Some(code) = &entry.create_code {
            if code.len() > config.max_wasm_len {
                return Err(HookSetError::new(
                    HookSetCode::ShortHook,
                    account,
                    "bytecode exceeds the maximum size",
                )
                .into());
            }
            if !code.is_empty() {
                validated = Some(validate_hook_wasm(code, account, config)?);
            }
        }
        validated_code.push(validated);
    }

    while chain.len() < entries.len() {
        chain.push(HookInstallation {
            hook_hash: [0u8; 32],
            namespace: [0u8; 32],
            params: BTreeMap::new(),
            grants: Vec::new(),
        });
    }
    let mut occupied: Vec<bool> = (0..chain.len()).map(|i| i < original_len).collect();

    for (position, (entry, op)) in entries.iter().zip(&operations).enumerate() {
        match op {
            HookSetOperation::Noop => {}
            HookSetOperation::Create => {
                let code = entry.create_code.as_ref().expect("create carries bytecode");
                let validated = validated_code[position]
                    .clone()
                    .expect("create bytecode was validated");
                let hook_hash = sha512h(code);
                if ledger.hook_definition(&hook_hash).is_none() {
                    total_fee += fees::creation_fee(code.len() as u64);
                    ledger.set_hook_definition(HookDefinition {
                        hook_hash,
                        wasm: code.clone(),
                        api_version: entry.api_version.expect("validated above"),
                        hook_on: entry.hook_on.expect("validated above"),
                        max_instr_count: validated.worst_case_instructions,
                    })?;
                }
                chain[position] = HookInstallation {
                    hook_hash,
                    namespace: entry.namespace.expect("validated above"),
                    params: entry_params(entry),
                    grants: entry_grants(entry),
                };
                occupied[position] = true;
            }
            HookSetOperation::Install => {
                let hook_hash = entry.hook_hash.expect("install carries a hash");
                if ledger.hook_definition(&hook_hash).is_none() {
                    return Err(EngineError::UnknownDefinition);
                }
                chain[position] = HookInstallation {
                    hook_hash,
                    namespace: entry.namespace.expect("validated above"),
                    params: entry_params(entry),
                    grants: entry_grants(entry),
                };
                occupied[position] = true;
            }
            HookSetOperation::Delete => {
                occupied[position] = false;
            }
            HookSetOperation::NsDelete => {
                let ns = entry.namespace.expect("validated above");
                ledger.delete_namespace(account, &ns)?;
            }
            HookSetOperation::Update => {
                let installation = &mut chain[position];
                if let Some(ns) = entry.namespace {
                    installation.namespace = ns;
                }
                if let Some(hook_on) = entry.hook_on {
                    // Requires override; validated above.
                    let hash = installation.hook_hash;
                    if let Some(mut def) = ledger.hook_definition(&hash) {
                        def.hook_on = hook_on;
                        ledger.set_hook_definition(def)?;
                    }
                }
                if entry.params.is_some() {
                    installation.params = entry_params(entry);
                }
                if entry.grants.is_some() {
                    installation.grants = entry_grants(entry);
                }
            }
            HookSetOperation::Invalid => unreachable!("validated above"),
        }
    }

    let new_chain: Vec<HookInstallation> = chain
        .into_iter()
        .zip(occupied)
        .filter_map(|(inst, keep)| keep.then_some(inst))
        .collect();
    ledger.set_hook_installations(account, new_chain)?;
    if total_fee > 0 {
        ledger.charge_fee(account, total_fee)?;
    }
    Ok(total_fee)
}
