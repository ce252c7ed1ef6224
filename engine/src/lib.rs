//! `hookvm-engine` — ledger-facing hook orchestration.
//!
//! For one applied transaction this crate determines which accounts'
//! hook chains run (`tsh`), drives them in order with shared state and
//! skip/override propagation (`chain`), validates install transactions
//! (`hookset`), and commits the surviving effects (`finalize`).

pub mod error;
pub mod tsh;
pub mod hookset;
pub mod chain;
pub mod finalize;

pub use chain::{apply_hooks, finalize_chain, ChainOutcome, ChainResult};
pub use error::EngineError;
pub use finalize::{finalize_hook_result, finalize_hook_state, remove_emission_entry};
pub use hookset::{apply_hook_set, HookSetEntry, HookSetGrant, HookSetOperation, HookSetParam};
pub use tsh::{stakeholders, TshFlags};
