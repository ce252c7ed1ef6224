//! Hook introspection, parameters, chain control, and ledger headers.

use wasmtime::{Caller, Linker};

use hookvm_primitives::error::HookReturnCode;

use crate::context::HookContext;
use crate::error::SandboxError;
use crate::host::{host_try, memory_of, read_guest, read_h256, write_guest};

pub(super) fn register(linker: &mut Linker<HookContext>) -> Result<(), SandboxError> {
    linker.func_wrap(
        "env",
        "hook_account",
        |mut caller: Caller<'_, HookContext>, write_ptr: i32, write_len: i32| -> i64 {
            let mem = host_try!(memory_of(&caller));
            let account = caller.data().result.account;
            write_guest(&mem, &mut caller, write_ptr, write_len, &account)
        },
    )?;

    linker.func_wrap(
        "env",
        "hook_hash",
        |mut caller: Caller<'_, HookContext>, write_ptr: i32, write_len: i32, hook_no: i32| -> i64 {
            let mem = host_try!(memory_of(&caller));
            let hash = if hook_no < 0 {
                caller.data().result.hook_hash
            } else {
                let ctx = caller.data();
                let chain = ctx.ledger.hook_installations(&ctx.result.account);
                match chain.get(hook_no as usize) {
                    Some(installation) => installation.hook_hash,
                    None => return HookReturnCode::DoesntExist.as_i64(),
                }
            };
            write_guest(&mem, &mut caller, write_ptr, write_len, &hash)
        },
    )?;

    linker.func_wrap("env", "hook_pos", |caller: Caller<'_, HookContext>| -> i64 {
        caller.data().result.chain_position as i64
    })?;

    linker.func_wrap(
        "env",
        "hook_param",
        |mut caller: Caller<'_, HookContext>,
         write_ptr: i32,
         write_len: i32,
         read_ptr: i32,
         read_len: i32|
         -> i64 {
            let mem = host_try!(memory_of(&caller));
            let name = host_try!(read_guest(&mem, &caller, read_ptr, read_len));
            let ctx = caller.data();
            if name.is_empty() {
                return HookReturnCode::TooSmall.as_i64();
            }
            if name.len() > ctx.limits.max_param_key_len {
                return HookReturnCode::TooBig.as_i64();
            }
            let value = match ctx.param(&name) {
                Some(v) => v,
                None => return HookReturnCode::DoesntExist.as_i64(),
            };
            write_guest(&mem, &mut caller, write_ptr, write_len, &value)
        },
    )?;

    linker.func_wrap(
        "env",
        "hook_param_set",
        |mut caller: Caller<'_, HookContext>,
         read_ptr: i32,
         read_len: i32,
         kread_ptr: i32,
         kread_len: i32,
         hread_ptr: i32,
         hread_len: i32|
         -> i64 {
            let mem = host_try!(memory_of(&caller));
            let value = host_try!(read_guest(&mem, &caller, read_ptr, read_len));
            let name = host_try!(read_guest(&mem, &caller, kread_ptr, kread_len));
            let target = host_try!(read_h256(&mem, &caller, hread_ptr, hread_len));
            let len = value.len() as i64;
            match caller.data_mut().param_set(target, name, value) {
                Ok(()) => len,
                Err(e) => e.to_return_code(),
            }
        },
    )?;

    linker.func_wrap(
        "env",
        "hook_skip",
        |mut caller: Caller<'_, HookContext>, read_ptr: i32, read_len: i32, flags: i32| -> i64 {
            let mem = host_try!(memory_of(&caller));
            let hash = host_try!(read_h256(&mem, &caller, read_ptr, read_len));
            let skips = &mut caller.data_mut().result.hook_skips;
            match flags {
                0 => {
                    skips.insert(hash);
                    1
                }
                1 => {
                    if skips.remove(&hash) {
                        1
                    } else {
                        HookReturnCode::DoesntExist.as_i64()
                    }
                }
                _ => HookReturnCode::InvalidArgument.as_i64(),
            }
        },
    )?;

    linker.func_wrap("env", "fee_base", |caller: Caller<'_, HookContext>| -> i64 {
        caller.data().ledger.base_fee() as i64
    })?;

    linker.func_wrap("env", "ledger_seq", |caller: Caller<'_, HookContext>| -> i64 {
        caller.data().ledger.ledger_seq() as i64
    })?;

    linker.func_wrap(
        "env",
        "ledger_last_hash",
        |mut caller: Caller<'_, HookContext>, write_ptr: i32, write_len: i32| -> i64 {
            let mem = host_try!(memory_of(&caller));
            let hash = caller.data().ledger.last_ledger_hash();
            write_guest(&mem, &mut caller, write_ptr, write_len, &hash)
        },
    )?;

    linker.func_wrap(
        "env",
        "nonce",
        |mut caller: Caller<'_, HookContext>, write_ptr: i32, write_len: i32| -> i64 {
            let mem = host_try!(memory_of(&caller));
            let nonce = match caller.data_mut().next_nonce() {
                Ok(n) => n,
                Err(e) => return e.to_return_code(),
            };
            write_guest(&mem, &mut caller, write_ptr, write_len, &nonce)
        },
    )?;
    Ok(())
}
