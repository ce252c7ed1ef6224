//! Slot directory access.

use wasmtime::{Caller, Linker};

use hookvm_primitives::error::HookReturnCode;
use hookvm_primitives::keylet::Keylet;
use hookvm_primitives::types::KEYLET_LEN;

use crate::context::HookContext;
use crate::error::SandboxError;
use crate::host::{host_try, memory_of, read_guest, ret, write_guest};

pub(super) fn register(linker: &mut Linker<HookContext>) -> Result<(), SandboxError> {
    linker.func_wrap(
        "env",
        "slot",
        |mut caller: Caller<'_, HookContext>, write_ptr: i32, write_len: i32, slot_no: i32| -> i64 {
            let mem = host_try!(memory_of(&caller));
            let bytes = match caller.data().slots.get(slot_no as u32) {
                Some(entry) => entry.bytes().to_vec(),
                None => return HookReturnCode::DoesntExist.as_i64(),
            };
            write_guest(&mem, &mut caller, write_ptr, write_len, &bytes)
        },
    )?;

    linker.func_wrap(
        "env",
        "slot_set",
        |mut caller: Caller<'_, HookContext>, read_ptr: i32, read_len: i32, slot_no: i32| -> i64 {
            let mem = host_try!(memory_of(&caller));
            let id = host_try!(read_guest(&mem, &caller, read_ptr, read_len));
            if slot_no < 0 {
                return HookReturnCode::InvalidArgument.as_i64();
            }
            if id.len() != KEYLET_LEN {
                return HookReturnCode::InvalidArgument.as_i64();
            }
            let keylet = match Keylet::from_bytes(&id) {
                Ok(k) => k,
                Err(c) => return c.as_i64(),
            };
            let ctx = caller.data_mut();
            let blob = match ctx.ledger.ledger_object(&keylet) {
                Some(b) => b,
                None => return HookReturnCode::DoesntExist.as_i64(),
            };
            ret(ctx.slots.set(id, blob, slot_no as u32).map(|n| n as i64))
        },
    )?;

    linker.func_wrap(
        "env",
        "slot_clear",
        |mut caller: Caller<'_, HookContext>, slot_no: i32| -> i64 {
            ret(caller.data_mut().slots.clear(slot_no as u32).map(|()| 0))
        },
    )?;

    linker.func_wrap(
        "env",
        "slot_count",
        |mut caller: Caller<'_, HookContext>, slot_no: i32| -> i64 {
            ret(caller.data_mut().slots.count(slot_no as u32).map(|n| n as i64))
        },
    )?;

    linker.func_wrap(
        "env",
        "slot_id",
        |mut caller: Caller<'_, HookContext>, write_ptr: i32, write_len: i32, slot_no: i32| -> i64 {
            let mem = host_try!(memory_of(&caller));
            let id = match caller.data().slots.get(slot_no as u32) {
                Some(entry) => entry.id.clone(),
                None => return HookReturnCode::DoesntExist.as_i64(),
            };
            write_guest(&mem, &mut caller, write_ptr, write_len, &id)
        },
    )?;

    linker.func_wrap(
        "env",
        "slot_size",
        |mut caller: Caller<'_, HookContext>, slot_no: i32| -> i64 {
            ret(caller.data_mut().slots.size(slot_no as u32).map(|n| n as i64))
        },
    )?;

    linker.func_wrap(
        "env",
        "slot_subfield",
        |mut caller: Caller<'_, HookContext>, parent: i32, field_id: i32, new_slot: i32| -> i64 {
            if parent < 0 || new_slot < 0 {
                return HookReturnCode::InvalidArgument.as_i64();
            }
            ret(caller
                .data_mut()
                .slots
                .subfield(parent as u32, field_id as u32, new_slot as u32)
                .map(|n| n as i64))
        },
    )?;

    linker.func_wrap(
        "env",
        "slot_subarray",
        |mut caller: Caller<'_, HookContext>, parent: i32, index: i32, new_slot: i32| -> i64 {
            if parent < 0 || index < 0 || new_slot < 0 {
                return HookReturnCode::InvalidArgument.as_i64();
            }
            ret(caller
                .data_mut()
                .slots
                .subarray(parent as u32, index as usize, new_slot as u32)
                .map(|n| n as i64))
        },
    )?;

    linker.func_wrap(
        "env",
        "slot_type",
        |mut caller: Caller<'_, HookContext>, slot_no: i32, flags: i32| -> i64 {
            let ctx = caller.data_mut();
            match flags {
                0 => ret(ctx.slots.type_tag(slot_no as u32).map(|t| t as i64)),
                1 => ret(ctx
                    .slots
                    .is_native_amount(slot_no as u32)
                    .map(|native| native as i64)),
                _ => HookReturnCode::InvalidArgument.as_i64(),
            }
        },
    )?;

    linker.func_wrap(
        "env",
        "slot_float",
        |mut caller: Caller<'_, HookContext>, slot_no: i32| -> i64 {
            ret(caller.data_mut().slots.as_float(slot_no as u32))
        },
    )?;
    Ok(())
}
