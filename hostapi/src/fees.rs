//! Fee formulas for hook execution, installation, and emission.
//!
//! All fee math is pure integer arithmetic. The 1.1 base multiplier is
//! applied as the ratio 11/10 with ceiling division; constants stay
//! fixed until a voteable-config mechanism exists.

/// Drops charged per byte of installed bytecode.
pub const DROPS_PER_BYTE: u64 = 31_250;

/// Flat drops charged for any hook execution.
pub const EXECUTION_FEE_BASE: u64 = 100;

/// Instructions covered by one drop of execution fee.
pub const INSTRUCTIONS_PER_DROP: u64 = 16;

/// Apply the 11/10 fee multiplier with ceiling division.
fn multiplied(drops: u64) -> u64 {
    drops.saturating_mul(11).div_ceil(10)
}

/// Fee for one hook execution, assessed even on rollback.
pub fn execution_fee(instruction_count: u64) -> u64 {
    EXECUTION_FEE_BASE.saturating_add(instruction_count / INSTRUCTIONS_PER_DROP)
}

/// Fee for installing a new hook definition.
pub fn creation_fee(byte_count: u64) -> u64 {
    multiplied(byte_count.saturating_mul(DROPS_PER_BYTE))
}

/// Base fee for emitting a transaction of the given serialized size.
pub fn emission_fee_base(byte_count: u64) -> u64 {
    multiplied(byte_count.saturating_mul(DROPS_PER_BYTE))
}
