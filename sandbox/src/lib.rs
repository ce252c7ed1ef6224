//! `hookvm-sandbox` — wasmtime sandbox for hook execution.
//!
//! This crate loads, statically validates, and runs hook WebAssembly
//! modules inside a deterministic wasmtime sandbox. It enforces:
//!
//! - **Determinism:** no SIMD, no threads, NaN canonicalization
//! - **Fuel metering:** instruction counting and a hard execution budget
//! - **Guard metering:** `_g` loop guards validated at install time and
//!   enforced at run time
//! - **Memory discipline:** a host-owned fixed 64 KiB linear memory;
//!   every pointer/length pair is bounds-checked before use
//! - **Import whitelisting:** only the hook API is importable
//!
//! The primary entry points are [`validation::validate_hook_wasm`] for
//! install-time checks and [`executor::apply`] for a single hook
//! invocation.

pub mod config;
pub mod error;
pub mod memory;
pub mod context;
pub mod host;
pub mod validation;
pub mod executor;

pub use config::SandboxConfig;
pub use context::{HookContext, HookResult};
pub use error::SandboxError;
pub use executor::{apply, HookExecutor};
pub use validation::{validate_hook_wasm, HookSetError, ValidatedModule};
