//! Hook-state access: own and foreign reads and writes.

use wasmtime::{Caller, Linker};

use hookvm_primitives::error::HookReturnCode;

use crate::context::HookContext;
use crate::error::SandboxError;
use crate::host::{host_try, memory_of, read_account, read_guest, read_h256, write_guest};

pub(super) fn register(linker: &mut Linker<HookContext>) -> Result<(), SandboxError> {
    linker.func_wrap(
        "env",
        "state",
        |mut caller: Caller<'_, HookContext>,
         write_ptr: i32,
         write_len: i32,
         kread_ptr: i32,
         kread_len: i32|
         -> i64 {
            let mem = host_try!(memory_of(&caller));
            let key = host_try!(read_guest(&mem, &caller, kread_ptr, kread_len));
            let ctx = caller.data_mut();
            let key = match ctx.pad_state_key(&key) {
                Ok(k) => k,
                Err(e) => return e.to_return_code(),
            };
            let account = ctx.result.account;
            let ns = ctx.result.namespace;
            let value = match ctx.state_get(&account, &ns, &key) {
                Ok(v) => v,
                Err(e) => return e.to_return_code(),
            };
            write_guest(&mem, &mut caller, write_ptr, write_len, &value)
        },
    )?;

    linker.func_wrap(
        "env",
        "state_set",
        |mut caller: Caller<'_, HookContext>,
         read_ptr: i32,
         read_len: i32,
         kread_ptr: i32,
         kread_len: i32|
         -> i64 {
            let mem = host_try!(memory_of(&caller));
            let value = host_try!(read_guest(&mem, &caller, read_ptr, read_len));
            let key = host_try!(read_guest(&mem, &caller, kread_ptr, kread_len));
            let ctx = caller.data_mut();
            let key = match ctx.pad_state_key(&key) {
                Ok(k) => k,
                Err(e) => return e.to_return_code(),
            };
            let len = value.len() as i64;
            match ctx.state_set_own(&key, value) {
                Ok(()) => len,
                Err(e) => e.to_return_code(),
            }
        },
    )?;

    linker.func_wrap(
        "env",
        "state_foreign",
        |mut caller: Caller<'_, HookContext>,
         write_ptr: i32,
         write_len: i32,
         kread_ptr: i32,
         kread_len: i32,
         nread_ptr: i32,
         nread_len: i32,
         aread_ptr: i32,
         aread_len: i32|
         -> i64 {
            let mem = host_try!(memory_of(&caller));
            let key = host_try!(read_guest(&mem, &caller, kread_ptr, kread_len));
            let ns = host_try!(read_h256(&mem, &caller, nread_ptr, nread_len));
            let account = host_try!(read_account(&mem, &caller, aread_ptr, aread_len));
            let ctx = caller.data_mut();
            let key = match ctx.pad_state_key(&key) {
                Ok(k) => k,
                Err(e) => return e.to_return_code(),
            };
            let value = match ctx.state_get(&account, &ns, &key) {
                Ok(v) => v,
                Err(e) => return e.to_return_code(),
            };
            write_guest(&mem, &mut caller, write_ptr, write_len, &value)
        },
    )?;

    linker.func_wrap(
        "env",
        "state_foreign_set",
        |mut caller: Caller<'_, HookContext>,
         read_ptr: i32,
         read_len: i32,
         kread_ptr: i32,
         kread_len: i32,
         nread_ptr: i32,
         nread_len: i32,
         aread_ptr: i32,
         aread_len: i32|
         -> i64 {
            let mem = host_try!(memory_of(&caller));
            let value = host_try!(read_guest(&mem, &caller, read_ptr, read_len));
            let key = host_try!(read_guest(&mem, &caller, kread_ptr, kread_len));
            let ns = host_try!(read_h256(&mem, &caller, nread_ptr, nread_len));
            let account = host_try!(read_account(&mem, &caller, aread_ptr, aread_len));
            let ctx = caller.data_mut();
            if !ctx.ledger.account_exists(&account) && account != ctx.result.account {
                return HookReturnCode::DoesntExist.as_i64();
            }
            let key = match ctx.pad_state_key(&key) {
                Ok(k) => k,
                Err(e) => return e.to_return_code(),
            };
            let len = value.len() as i64;
            match ctx.state_set_foreign(&account, &ns, &key, value) {
                Ok(()) => len,
                Err(e) => e.to_return_code(),
            }
        },
    )?;
    Ok(())
}
