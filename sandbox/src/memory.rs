//! Bounds-checked guest linear memory access.
//!
//! Every host function that takes a pointer/length pair validates it
//! here before touching memory. An invalid range is `OUT_OF_BOUNDS` and
//! never has side effects. A zero length with any offset is a valid
//! no-op.

use hookvm_primitives::error::HookReturnCode;

/// Read `len` bytes from guest memory at `ptr`.
pub fn read_bytes(mem: &[u8], ptr: i32, len: i32) -> Result<Vec<u8>, HookReturnCode> {
    if ptr < 0 || len < 0 {
        return Err(HookReturnCode::OutOfBounds);
    }
    if len == 0 {
        return Ok(Vec::new());
    }
    let start = ptr as usize;
    let end = start
        .checked_add(len as usize)
        .ok_or(HookReturnCode::OutOfBounds)?;
    if end > mem.len() {
        return Err(HookReturnCode::OutOfBounds);
    }
    Ok(mem[start..end].to_vec())
}

/// Write `data` into the guest buffer described by `ptr`/`capacity`.
///
/// The buffer must be in bounds and large enough for `data`
/// (`TOO_SMALL` otherwise). Returns the number of bytes written.
pub fn write_back(
    mem: &mut [u8],
    ptr: i32,
    capacity: i32,
    data: &[u8],
) -> Result<i64, HookReturnCode> {
    if ptr < 0 || capacity < 0 {
        return Err(HookReturnCode::OutOfBounds);
    }
    if (capacity as usize) < data.len() {
        return Err(HookReturnCode::TooSmall);
    }
    if data.is_empty() {
        return Ok(0);
    }
    let start = ptr as usize;
    let end = start
        .checked_add(data.len())
        .ok_or(HookReturnCode::OutOfBounds)?;
    if end > mem.len() {
        return Err(HookReturnCode::OutOfBounds);
    }
    mem[start..end].copy_from_slice(data);
    Ok(data.len() as i64)
}
