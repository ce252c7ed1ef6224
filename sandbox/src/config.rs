//! Sandbox configuration.

use hookvm_hostapi::HookLimits;
use hookvm_primitives::types::MAX_WASM_LEN;

/// Configuration for hook execution and install-time validation.
#[derive(Debug, Clone)]
pub struct SandboxConfig {
    /// Wasmtime fuel budget per execution. The consumed fuel is the
    /// recorded instruction count.
    pub fuel_limit: u64,

    /// Ceiling on the statically computed worst-case instruction count.
    pub max_worst_case_instructions: u64,

    /// Maximum accepted bytecode size.
    pub max_wasm_len: usize,

    /// Per-execution resource limits.
    pub limits: HookLimits,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            fuel_limit: 10_000_000,
            max_worst_case_instructions: 1_000_000,
            max_wasm_len: MAX_WASM_LEN,
            limits: HookLimits::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SandboxConfig::default();
        assert_eq!(config.fuel_limit, 10_000_000);
        assert_eq!(config.max_worst_case_instructions, 1_000_000);
        assert_eq!(config.max_wasm_len, 0xFFFF);
        assert!(config.fuel_limit >= config.max_worst_case_instructions);
    }
}
