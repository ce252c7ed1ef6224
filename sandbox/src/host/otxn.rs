//! Access to the originating transaction.

use wasmtime::{Caller, Linker};

use hookvm_primitives::error::HookReturnCode;
use hookvm_primitives::sto;
use hookvm_primitives::txn::TxnView;

use crate::context::HookContext;
use crate::error::SandboxError;
use crate::host::{host_try, memory_of, ret, write_guest};

pub(super) fn register(linker: &mut Linker<HookContext>) -> Result<(), SandboxError> {
    linker.func_wrap("env", "otxn_burden", |caller: Caller<'_, HookContext>| -> i64 {
        caller.data().otxn_burden as i64
    })?;

    linker.func_wrap(
        "env",
        "otxn_generation",
        |caller: Caller<'_, HookContext>| -> i64 { caller.data().otxn_generation as i64 },
    )?;

    linker.func_wrap(
        "env",
        "otxn_type",
        |caller: Caller<'_, HookContext>| -> i64 {
            match TxnView::new(&caller.data().otxn).txn_type() {
                Ok(t) => t.as_u16() as i64,
                Err(c) => c.as_i64(),
            }
        },
    )?;

    linker.func_wrap(
        "env",
        "otxn_id",
        |mut caller: Caller<'_, HookContext>, write_ptr: i32, write_len: i32, _flags: i32| -> i64 {
            let mem = host_try!(memory_of(&caller));
            let id = caller.data().otxn_id;
            write_guest(&mem, &mut caller, write_ptr, write_len, &id)
        },
    )?;

    linker.func_wrap(
        "env",
        "otxn_field",
        |mut caller: Caller<'_, HookContext>, write_ptr: i32, write_len: i32, field_id: i32| -> i64 {
            let mem = host_try!(memory_of(&caller));
            let payload = {
                let otxn = &caller.data().otxn;
                match sto::subfield(otxn, field_id as u32) {
                    Ok((off, len)) => otxn[off..off + len].to_vec(),
                    Err(c) => return c.as_i64(),
                }
            };
            write_guest(&mem, &mut caller, write_ptr, write_len, &payload)
        },
    )?;

    linker.func_wrap(
        "env",
        "otxn_slot",
        |mut caller: Caller<'_, HookContext>, slot_no: i32| -> i64 {
            if slot_no < 0 {
                return HookReturnCode::InvalidArgument.as_i64();
            }
            let ctx = caller.data_mut();
            let id = ctx.otxn_id.to_vec();
            let blob = ctx.otxn.clone();
            ret(ctx.slots.set(id, blob, slot_no as u32).map(|n| n as i64))
        },
    )?;
    Ok(())
}
