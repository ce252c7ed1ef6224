//! Keylet computation: typed 34-byte ledger-object identifiers.
//!
//! A keylet is a 2-byte ledger-entry-type tag followed by a 32-byte key.
//! Keys are SHA-512/256 hashes over a 2-byte space tag and the keylet's
//! parameters, so distinct object families can never collide.

use crate::crypto::sha512h_concat;
use crate::error::HookReturnCode;
use crate::types::{AccountId, Hash256, KEYLET_LEN};

/// Ledger-entry-type tags carried in the keylet prefix.
pub mod ltype {
    pub const ACCOUNT: u16 = 0x0061;
    pub const DIR_NODE: u16 = 0x0064;
    pub const RIPPLE_STATE: u16 = 0x0072;
    pub const TICKET: u16 = 0x0054;
    pub const SIGNER_LIST: u16 = 0x0053;
    pub const OFFER: u16 = 0x006F;
    pub const LEDGER_HASHES: u16 = 0x0068;
    pub const AMENDMENTS: u16 = 0x0066;
    pub const FEE_SETTINGS: u16 = 0x0073;
    pub const ESCROW: u16 = 0x0075;
    pub const PAYCHAN: u16 = 0x0078;
    pub const CHECK: u16 = 0x0043;
    pub const DEPOSIT_PREAUTH: u16 = 0x0070;
    pub const NEGATIVE_UNL: u16 = 0x004E;
    pub const HOOK: u16 = 0x0048;
    pub const HOOK_DEFINITION: u16 = 0x0044;
    pub const HOOK_STATE: u16 = 0x0076;
    pub const EMITTED_TXN: u16 = 0x0045;
    pub const ANY: u16 = 0x0000;
}

mod space {
    pub const ACCOUNT: u16 = 0x0061;
    pub const DIR_NODE: u16 = 0x0064;
    pub const RIPPLE_STATE: u16 = 0x0072;
    pub const TICKET: u16 = 0x0054;
    pub const SIGNER_LIST: u16 = 0x0053;
    pub const OFFER: u16 = 0x006F;
    pub const SKIP_LIST: u16 = 0x0073;
    pub const AMENDMENTS: u16 = 0x0066;
    pub const FEES: u16 = 0x0065;
    pub const ESCROW: u16 = 0x0075;
    pub const PAYCHAN: u16 = 0x0078;
    pub const CHECK: u16 = 0x0043;
    pub const DEPOSIT_PREAUTH: u16 = 0x0070;
    pub const NEGATIVE_UNL: u16 = 0x004E;
    pub const HOOK: u16 = 0x0048;
    pub const HOOK_DEFINITION: u16 = 0x0044;
    pub const HOOK_STATE: u16 = 0x0076;
    pub const EMITTED_TXN: u16 = 0x0045;
    pub const EMITTED_DIR: u16 = 0x0046;
}

/// The 22 keylet kinds addressable through `util_keylet`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum KeyletType {
    Hook = 1,
    HookState = 2,
    Account = 3,
    Amendments = 4,
    Child = 5,
    Skip = 6,
    Fees = 7,
    NegativeUnl = 8,
    Line = 9,
    Offer = 10,
    Quality = 11,
    EmittedDir = 12,
    Ticket = 13,
    Signers = 14,
    Check = 15,
    DepositPreauth = 16,
    Unchecked = 17,
    OwnerDir = 18,
    Page = 19,
    Escrow = 20,
    Paychan = 21,
    Emitted = 22,
}

impl KeyletType {
    pub fn from_u32(v: u32) -> Option<Self> {
        use KeyletType::*;
        Some(match v {
            1 => Hook,
            2 => HookState,
            3 => Account,
            4 => Amendments,
            5 => Child,
            6 => Skip,
            7 => Fees,
            8 => NegativeUnl,
            9 => Line,
            10 => Offer,
            11 => Quality,
            12 => EmittedDir,
            13 => Ticket,
            14 => Signers,
            15 => Check,
            16 => DepositPreauth,
            17 => Unchecked,
            18 => OwnerDir,
            19 => Page,
            20 => Escrow,
            21 => Paychan,
            22 => Emitted,
            _ => return None,
        })
    }
}

/// A typed ledger-object identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Keylet {
    pub ltype: u16,
    pub key: Hash256,
}

impl Keylet {
    pub fn to_bytes(&self) -> [u8; KEYLET_LEN] {
        let mut out = [0u8; KEYLET_LEN];
        out[..2].copy_from_slice(&self.ltype.to_be_bytes());
        out[2..].copy_from_slice(&self.key);
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, HookReturnCode> {
        if bytes.len() != KEYLET_LEN {
            return Err(HookReturnCode::InvalidArgument);
        }
        let ltype = u16::from_be_bytes([bytes[0], bytes[1]]);
        let mut key = [0u8; 32];
        key.copy_from_slice(&bytes[2..]);
        Ok(Self { ltype, key })
    }
}

fn hashed(ltype: u16, space: u16, parts: &[&[u8]]) -> Keylet {
    let tag = space.to_be_bytes();
    let mut all: Vec<&[u8]> = Vec::with_capacity(parts.len() + 1);
    all.push(&tag);
    all.extend_from_slice(parts);
    Keylet {
        ltype,
        key: sha512h_concat(&all),
    }
}

pub fn account(acc: &AccountId) -> Keylet {
    hashed(ltype::ACCOUNT, space::ACCOUNT, &[acc])
}

pub fn hook(acc: &AccountId) -> Keylet {
    hashed(ltype::HOOK, space::HOOK, &[acc])
}

pub fn hook_definition(hash: &Hash256) -> Keylet {
    hashed(ltype::HOOK_DEFINITION, space::HOOK_DEFINITION, &[hash])
}

pub fn hook_state(acc: &AccountId, ns: &Hash256, key: &Hash256) -> Keylet {
    hashed(ltype::HOOK_STATE, space::HOOK_STATE, &[acc, ns, key])
}

pub fn amendments() -> Keylet {
    hashed(ltype::AMENDMENTS, space::AMENDMENTS, &[])
}

pub fn fees() -> Keylet {
    hashed(ltype::FEE_SETTINGS, space::FEES, &[])
}

pub fn negative_unl() -> Keylet {
    hashed(ltype::NEGATIVE_UNL, space::NEGATIVE_UNL, &[])
}

pub fn skip(ledger_seq: Option<u32>) -> Keylet {
    match ledger_seq {
        None => hashed(ltype::LEDGER_HASHES, space::SKIP_LIST, &[]),
        Some(seq) => {
            let block = (seq >> 16).to_be_bytes();
            hashed(ltype::LEDGER_HASHES, space::SKIP_LIST, &[&block])
        }
    }
}

/// Trust line between two accounts in a currency. The account pair is
/// ordered so both directions name the same object.
pub fn line(a: &AccountId, b: &AccountId, currency: &[u8; 20]) -> Keylet {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    hashed(ltype::RIPPLE_STATE, space::RIPPLE_STATE, &[lo, hi, currency])
}

pub fn offer(acc: &AccountId, seq: u32) -> Keylet {
    hashed(ltype::OFFER, space::OFFER, &[acc, &seq.to_be_bytes()])
}

pub fn ticket(acc: &AccountId, seq: u32) -> Keylet {
    hashed(ltype::TICKET, space::TICKET, &[acc, &seq.to_be_bytes()])
}

pub fn signers(acc: &AccountId) -> Keylet {
    hashed(ltype::SIGNER_LIST, space::SIGNER_LIST, &[acc])
}

pub fn check(acc: &AccountId, seq: u32) -> Keylet {
    hashed(ltype::CHECK, space::CHECK, &[acc, &seq.to_be_bytes()])
}

pub fn deposit_preauth(owner: &AccountId, preauthorized: &AccountId) -> Keylet {
    hashed(
        ltype::DEPOSIT_PREAUTH,
        space::DEPOSIT_PREAUTH,
        &[owner, preauthorized],
    )
}

pub fn escrow(acc: &AccountId, seq: u32) -> Keylet {
    hashed(ltype::ESCROW, space::ESCROW, &[acc, &seq.to_be_bytes()])
}

pub fn paychan(src: &AccountId, dst: &AccountId, seq: u32) -> Keylet {
    hashed(ltype::PAYCHAN, space::PAYCHAN, &[src, dst, &seq.to_be_bytes()])
}

pub fn owner_dir(acc: &AccountId) -> Keylet {
    hashed(ltype::DIR_NODE, space::DIR_NODE, &[acc])
}

/// A page within a directory, indexed from the directory root key.
pub fn page(root: &Hash256, index: u64) -> Keylet {
    if index == 0 {
        return Keylet {
            ltype: ltype::DIR_NODE,
            key: *root,
        };
    }
    hashed(ltype::DIR_NODE, space::DIR_NODE, &[root, &index.to_be_bytes()])
}

/// The chain-wide emitted-transaction directory.
pub fn emitted_dir() -> Keylet {
    hashed(ltype::DIR_NODE, space::EMITTED_DIR, &[])
}

pub fn emitted_txn(id: &Hash256) -> Keylet {
    hashed(ltype::EMITTED_TXN, space::EMITTED_TXN, &[id])
}

/// Wrap an arbitrary key with no type expectation.
pub fn unchecked(key: &Hash256) -> Keylet {
    Keylet {
        ltype: ltype::ANY,
        key: *key,
    }
}

/// A child key derived from an arbitrary parent key.
pub fn child(key: &Hash256) -> Keylet {
    Keylet {
        ltype: ltype::ANY,
        key: *key,
    }
}

/// A quality-adjusted directory key: the base directory key with the low
/// eight bytes replaced by the 64-bit quality.
pub fn quality(dir: &Keylet, quality: u64) -> Result<Keylet, HookReturnCode> {
    if dir.ltype != ltype::DIR_NODE {
        return Err(HookReturnCode::InvalidArgument);
    }
    let mut key = dir.key;
    key[24..].copy_from_slice(&quality.to_be_bytes());
    Ok(Keylet {
        ltype: ltype::DIR_NODE,
        key,
    })
}
