//! Best-effort guest logging.
//!
//! Trace output goes to the host log and never influences execution.
//! Pointer violations still report `OUT_OF_BOUNDS`; everything else
//! succeeds.

use wasmtime::{Caller, Linker};

use crate::context::HookContext;
use crate::error::SandboxError;
use crate::host::{host_try, memory_of, read_guest};

fn to_hex(data: &[u8]) -> String {
    use std::fmt::Write;
    let mut s = String::with_capacity(data.len() * 2);
    for b in data {
        let _ = write!(s, "{b:02X}");
    }
    s
}

fn label(result: &crate::context::HookResult) -> String {
    format!(
        "{}-{}",
        hookvm_primitives::accountid::encode_raddr(&result.account),
        hookvm_primitives::accountid::encode_raddr(&result.otxn_account)
    )
}

pub(super) fn register(linker: &mut Linker<HookContext>) -> Result<(), SandboxError> {
    linker.func_wrap(
        "env",
        "trace",
        |caller: Caller<'_, HookContext>,
         mread_ptr: i32,
         mread_len: i32,
         dread_ptr: i32,
         dread_len: i32,
         as_hex: i32|
         -> i64 {
            let mem = host_try!(memory_of(&caller));
            let message = host_try!(read_guest(&mem, &caller, mread_ptr, mread_len));
            let data = host_try!(read_guest(&mem, &caller, dread_ptr, dread_len));
            let rendered = if as_hex != 0 {
                to_hex(&data)
            } else {
                String::from_utf8_lossy(&data).into_owned()
            };
            tracing::trace!(
                "HookTrace[{}]: {} {}",
                label(&caller.data().result),
                String::from_utf8_lossy(&message),
                rendered
            );
            0
        },
    )?;

    linker.func_wrap(
        "env",
        "trace_num",
        |caller: Caller<'_, HookContext>, read_ptr: i32, read_len: i32, number: i64| -> i64 {
            let mem = host_try!(memory_of(&caller));
            let message = host_try!(read_guest(&mem, &caller, read_ptr, read_len));
            tracing::trace!(
                "HookTrace[{}]: {} {}",
                label(&caller.data().result),
                String::from_utf8_lossy(&message),
                number
            );
            0
        },
    )?;

    linker.func_wrap(
        "env",
        "trace_float",
        |caller: Caller<'_, HookContext>, read_ptr: i32, read_len: i32, float1: i64| -> i64 {
            let mem = host_try!(memory_of(&caller));
            let message = host_try!(read_guest(&mem, &caller, read_ptr, read_len));
            let rendered = match (
                hookvm_primitives::float::mantissa(float1),
                hookvm_primitives::float::exponent(float1),
                hookvm_primitives::float::sign(float1),
            ) {
                (Ok(m), Ok(e), Ok(s)) => {
                    format!("{}{}e{}", if s == 1 { "-" } else { "" }, m, e)
                }
                _ => "<invalid float>".to_string(),
            };
            tracing::trace!(
                "HookTrace[{}]: {} {}",
                label(&caller.data().result),
                String::from_utf8_lossy(&message),
                rendered
            );
            0
        },
    )?;

    linker.func_wrap(
        "env",
        "trace_slot",
        |caller: Caller<'_, HookContext>, read_ptr: i32, read_len: i32, slot_no: i32| -> i64 {
            let mem = host_try!(memory_of(&caller));
            let message = host_try!(read_guest(&mem, &caller, read_ptr, read_len));
            let ctx = caller.data();
            let rendered = match ctx.slots.get(slot_no as u32) {
                Some(entry) => to_hex(entry.bytes()),
                None => "<empty slot>".to_string(),
            };
            tracing::trace!(
                "HookTrace[{}]: {} {}",
                label(&ctx.result),
                String::from_utf8_lossy(&message),
                rendered
            );
            0
        },
    )?;
    Ok(())
}
