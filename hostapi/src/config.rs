//! Per-execution resource limits.

use hookvm_primitives::types::{
    MAX_EMIT, MAX_HOOK_CHAIN_LEN, MAX_NONCES, MAX_PARAMS, MAX_PARAM_KEY_LEN, MAX_PARAM_VALUE_LEN,
    MAX_SLOTS, MAX_STATE_DATA_LEN, MAX_STATE_KEY_LEN, MAX_STATE_MODIFICATIONS,
};

/// Resource limits for a single hook execution.
///
/// Enforced host-side; the guest cannot exceed them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookLimits {
    /// Maximum byte length of a hook-state value.
    pub max_state_data_len: usize,
    /// Maximum byte length of a hook-state key (keys are padded to 32).
    pub max_state_key_len: usize,
    /// Maximum modified state entries per execution.
    pub max_state_modifications: usize,
    /// Maximum hook parameters per installation.
    pub max_params: usize,
    /// Maximum byte length of a parameter name.
    pub max_param_key_len: usize,
    /// Maximum byte length of a parameter value.
    pub max_param_value_len: usize,
    /// Maximum emission reservation.
    pub max_emit: u32,
    /// Maximum nonces per execution.
    pub max_nonces: u32,
    /// Slot table capacity.
    pub max_slots: u32,
    /// Maximum installations in one account's chain.
    pub max_hook_chain_len: usize,
}

impl Default for HookLimits {
    fn default() -> Self {
        Self {
            max_state_data_len: MAX_STATE_DATA_LEN,
            max_state_key_len: MAX_STATE_KEY_LEN,
            max_state_modifications: MAX_STATE_MODIFICATIONS,
            max_params: MAX_PARAMS,
            max_param_key_len: MAX_PARAM_KEY_LEN,
            max_param_value_len: MAX_PARAM_VALUE_LEN,
            max_emit: MAX_EMIT,
            max_nonces: MAX_NONCES,
            max_slots: MAX_SLOTS,
            max_hook_chain_len: MAX_HOOK_CHAIN_LEN,
        }
    }
}
