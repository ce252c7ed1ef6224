//! Host-function registration.
//!
//! Every hook API function is a thin `func_wrap` closure with the same
//! shape: fetch the host-owned memory, bounds-check every pointer/length
//! pair, delegate to a core service on the `HookContext`, and map the
//! outcome into the `i64` return convention. No closure mutates guest
//! memory on an error path.

mod control;
mod etxn;
mod float;
mod hook;
mod otxn;
mod slot;
mod state;
mod sto;
mod trace;
mod util;

use wasmtime::{Caller, Linker, Memory};

use hookvm_primitives::error::{HookError, HookReturnCode};

use crate::context::HookContext;
use crate::error::SandboxError;

/// Register the full hook API into the linker under the `env` module.
pub fn register_host_functions(linker: &mut Linker<HookContext>) -> Result<(), SandboxError> {
    control::register(linker)?;
    trace::register(linker)?;
    state::register(linker)?;
    slot::register(linker)?;
    float::register(linker)?;
    sto::register(linker)?;
    util::register(linker)?;
    etxn::register(linker)?;
    otxn::register(linker)?;
    hook::register(linker)?;
    Ok(())
}

/// The host-owned linear memory, stashed in the context by the executor.
pub(crate) fn memory_of(caller: &Caller<'_, HookContext>) -> Result<Memory, i64> {
    caller
        .data()
        .memory
        .ok_or(HookReturnCode::InternalError.as_i64())
}

/// Map a service result into the guest return convention.
pub(crate) fn ret(result: Result<i64, HookError>) -> i64 {
    result.unwrap_or_else(|e| e.to_return_code())
}

/// Map a float result into the guest return convention.
pub(crate) fn retf(result: Result<i64, HookReturnCode>) -> i64 {
    result.unwrap_or_else(|c| c.as_i64())
}

/// Read guest bytes, mapping violations to the error convention.
pub(crate) fn read_guest(
    mem: &Memory,
    caller: &Caller<'_, HookContext>,
    ptr: i32,
    len: i32,
) -> Result<Vec<u8>, i64> {
    crate::memory::read_bytes(mem.data(caller), ptr, len).map_err(|c| c.as_i64())
}

/// Read a guest buffer that must be exactly a 20-byte account id.
pub(crate) fn read_account(
    mem: &Memory,
    caller: &Caller<'_, HookContext>,
    ptr: i32,
    len: i32,
) -> Result<[u8; 20], i64> {
    let bytes = read_guest(mem, caller, ptr, len)?;
    bytes
        .as_slice()
        .try_into()
        .map_err(|_| HookReturnCode::InvalidAccount.as_i64())
}

/// Read a guest buffer that must be exactly 32 bytes.
pub(crate) fn read_h256(
    mem: &Memory,
    caller: &Caller<'_, HookContext>,
    ptr: i32,
    len: i32,
) -> Result<[u8; 32], i64> {
    let bytes = read_guest(mem, caller, ptr, len)?;
    bytes
        .as_slice()
        .try_into()
        .map_err(|_| HookReturnCode::InvalidArgument.as_i64())
}

/// Write data back into a guest buffer, mapping violations.
pub(crate) fn write_guest(
    mem: &Memory,
    caller: &mut Caller<'_, HookContext>,
    ptr: i32,
    capacity: i32,
    data: &[u8],
) -> i64 {
    match crate::memory::write_back(mem.data_mut(caller), ptr, capacity, data) {
        Ok(n) => n,
        Err(c) => c.as_i64(),
    }
}

/// Shorthand for `match x { Ok(v) => v, Err(code) => return code }` in
/// closures returning plain `i64`.
macro_rules! host_try {
    ($e:expr) => {
        match $e {
            Ok(v) => v,
            Err(code) => return code,
        }
    };
}
pub(crate) use host_try;
