//! Emission accounting and the `emit` call itself.

use wasmtime::{Caller, Linker};

use hookvm_primitives::error::HookReturnCode;
use hookvm_primitives::txn::{EmitDetails, TxnView};

use crate::context::HookContext;
use crate::error::SandboxError;
use crate::host::{host_try, memory_of, read_guest, write_guest};

pub(super) fn register(linker: &mut Linker<HookContext>) -> Result<(), SandboxError> {
    linker.func_wrap(
        "env",
        "etxn_reserve",
        |mut caller: Caller<'_, HookContext>, count: i32| -> i64 {
            if count < 0 {
                return HookReturnCode::InvalidArgument.as_i64();
            }
            let ctx = caller.data_mut();
            let max_emit = ctx.limits.max_emit;
            match ctx.emissions.reserve(count as u32, max_emit) {
                Ok(n) => n as i64,
                Err(e) => e.to_return_code(),
            }
        },
    )?;

    linker.func_wrap("env", "etxn_burden", |caller: Caller<'_, HookContext>| -> i64 {
        caller.data().emit_spec().burden as i64
    })?;

    linker.func_wrap(
        "env",
        "etxn_generation",
        |caller: Caller<'_, HookContext>| -> i64 { caller.data().emit_spec().generation as i64 },
    )?;

    linker.func_wrap(
        "env",
        "etxn_fee_base",
        |_: Caller<'_, HookContext>, tx_byte_count: i32| -> i64 {
            if tx_byte_count < 0 {
                return HookReturnCode::InvalidArgument.as_i64();
            }
            hookvm_hostapi::fees::emission_fee_base(tx_byte_count as u64) as i64
        },
    )?;

    linker.func_wrap(
        "env",
        "etxn_details",
        |mut caller: Caller<'_, HookContext>, write_ptr: i32, write_len: i32| -> i64 {
            let mem = host_try!(memory_of(&caller));
            let ctx = caller.data_mut();
            if ctx.emissions.reserved().is_none() {
                return HookReturnCode::PrerequisiteNotMet.as_i64();
            }
            let spec = ctx.emit_spec();
            let nonce = match ctx.next_nonce() {
                Ok(n) => n,
                Err(e) => return e.to_return_code(),
            };
            let details = EmitDetails {
                generation: spec.generation,
                burden: spec.burden,
                parent_txn_id: spec.parent_txn_id,
                nonce,
                callback: ctx.result.account,
            };
            let blob = details.to_bytes();
            write_guest(&mem, &mut caller, write_ptr, write_len, &blob)
        },
    )?;

    linker.func_wrap(
        "env",
        "emit",
        |mut caller: Caller<'_, HookContext>,
         write_ptr: i32,
         write_len: i32,
         read_ptr: i32,
         read_len: i32|
         -> i64 {
            let mem = host_try!(memory_of(&caller));
            let blob = host_try!(read_guest(&mem, &caller, read_ptr, read_len));
            // The emitted txn id goes back to the guest; reject a bad
            // output buffer before the queue is touched.
            if write_ptr < 0 || write_len < 0 {
                return HookReturnCode::OutOfBounds.as_i64();
            }
            if (write_len as usize) < 32 {
                return HookReturnCode::TooSmall.as_i64();
            }
            if write_ptr as usize + 32 > mem.data(&caller).len() {
                return HookReturnCode::OutOfBounds.as_i64();
            }
            let ctx = caller.data_mut();
            let spec = ctx.emit_spec();
            let txn_id = TxnView::new(&blob).txn_id();
            if let Err(e) = ctx.emissions.emit(blob, &spec) {
                return e.to_return_code();
            }
            write_guest(&mem, &mut caller, write_ptr, write_len, &txn_id)
        },
    )?;
    Ok(())
}
