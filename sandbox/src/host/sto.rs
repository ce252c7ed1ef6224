//! Direct operations on serialized-object blobs.
//!
//! Location results pack the offset in the low 32 bits and the length in
//! the high 32 bits; offsets are relative to the start of the supplied
//! blob.

use wasmtime::{Caller, Linker};

use hookvm_primitives::sto;

use crate::context::HookContext;
use crate::error::SandboxError;
use crate::host::{host_try, memory_of, read_guest, write_guest};

pub(super) fn register(linker: &mut Linker<HookContext>) -> Result<(), SandboxError> {
    linker.func_wrap(
        "env",
        "sto_subfield",
        |mut caller: Caller<'_, HookContext>, read_ptr: i32, read_len: i32, field_id: i32| -> i64 {
            let mem = host_try!(memory_of(&caller));
            let blob = host_try!(read_guest(&mem, &caller, read_ptr, read_len));
            match sto::subfield(&blob, field_id as u32) {
                Ok((off, len)) => sto::pack_location(off, len),
                Err(c) => c.as_i64(),
            }
        },
    )?;

    linker.func_wrap(
        "env",
        "sto_subarray",
        |mut caller: Caller<'_, HookContext>, read_ptr: i32, read_len: i32, index: i32| -> i64 {
            let mem = host_try!(memory_of(&caller));
            let blob = host_try!(read_guest(&mem, &caller, read_ptr, read_len));
            if index < 0 {
                return hookvm_primitives::HookReturnCode::InvalidArgument.as_i64();
            }
            match sto::subarray(&blob, index as usize) {
                Ok((off, len)) => sto::pack_location(off, len),
                Err(c) => c.as_i64(),
            }
        },
    )?;

    linker.func_wrap(
        "env",
        "sto_emplace",
        |mut caller: Caller<'_, HookContext>,
         write_ptr: i32,
         write_len: i32,
         sread_ptr: i32,
         sread_len: i32,
         fread_ptr: i32,
         fread_len: i32,
         field_id: i32|
         -> i64 {
            let mem = host_try!(memory_of(&caller));
            let sto_blob = host_try!(read_guest(&mem, &caller, sread_ptr, sread_len));
            let field_blob = host_try!(read_guest(&mem, &caller, fread_ptr, fread_len));
            match sto::emplace(&sto_blob, &field_blob, field_id as u32) {
                Ok(out) => write_guest(&mem, &mut caller, write_ptr, write_len, &out),
                Err(c) => c.as_i64(),
            }
        },
    )?;

    linker.func_wrap(
        "env",
        "sto_erase",
        |mut caller: Caller<'_, HookContext>,
         write_ptr: i32,
         write_len: i32,
         read_ptr: i32,
         read_len: i32,
         field_id: i32|
         -> i64 {
            let mem = host_try!(memory_of(&caller));
            let blob = host_try!(read_guest(&mem, &caller, read_ptr, read_len));
            match sto::erase(&blob, field_id as u32) {
                Ok(out) => write_guest(&mem, &mut caller, write_ptr, write_len, &out),
                Err(c) => c.as_i64(),
            }
        },
    )?;

    linker.func_wrap(
        "env",
        "sto_validate",
        |mut caller: Caller<'_, HookContext>, read_ptr: i32, read_len: i32| -> i64 {
            let mem = host_try!(memory_of(&caller));
            let blob = host_try!(read_guest(&mem, &caller, read_ptr, read_len));
            sto::validate(&blob)
        },
    )?;
    Ok(())
}
