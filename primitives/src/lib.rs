//! `hookvm-primitives` — foundational types for the hookvm execution core.
//!
//! This crate provides the canonical types, guest-facing return codes,
//! the packed decimal float, the serialized-object codec, keylet
//! computation, account-id encoding, and cryptographic helpers shared by
//! the host API, the sandbox, and the chain engine.

pub mod types;
pub mod error;
pub mod float;
pub mod sto;
pub mod keylet;
pub mod accountid;
pub mod crypto;
pub mod txn;

// Re-export commonly used types at the crate root.
pub use types::{AccountId, Hash256, NamespaceId, TxType};
pub use error::{ExitType, HookError, HookReturnCode, HookSetCode};
pub use keylet::{Keylet, KeyletType};
pub use txn::{TxnBuilder, TxnView};
