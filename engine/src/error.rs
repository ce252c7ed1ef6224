//! Engine error types.

use hookvm_primitives::error::HookError;
use hookvm_sandbox::{HookSetError, SandboxError};

/// Top-level error type for hook orchestration.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Sandbox construction or engine plumbing failed.
    #[error("sandbox error: {0}")]
    Sandbox(#[from] SandboxError),

    /// An install transaction failed validation; the code narrates which
    /// check rejected it.
    #[error(transparent)]
    HookSet(#[from] HookSetError),

    /// The transaction being applied could not be parsed.
    #[error("malformed transaction")]
    MalformedTxn,

    /// A referenced hook definition is not on the ledger.
    #[error("unknown hook definition")]
    UnknownDefinition,

    /// Writing back state or emissions failed; fatal to the transaction.
    #[error("finalisation failed: {0}")]
    Finalize(#[from] HookError),
}
