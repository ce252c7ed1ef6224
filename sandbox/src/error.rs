//! Sandbox error types.

use crate::validation::HookSetError;

/// Top-level error type for the sandbox crate.
#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    /// Wasmtime engine, compilation, or instantiation error.
    #[error("wasmtime error: {0}")]
    Wasmtime(#[from] anyhow::Error),

    /// Install-time static validation failed.
    #[error("hook validation failed: {0}")]
    Validation(#[from] HookSetError),

    /// The module lacks a required export.
    #[error("missing required export: {0}")]
    MissingExport(String),

    /// Guest memory setup or access failed outside a host call.
    #[error("memory error: {0}")]
    Memory(String),
}
