//! Utility host functions: address codecs, hashing, signature
//! verification, and keylet computation.

use wasmtime::{Caller, Linker, Memory};

use hookvm_primitives::error::HookReturnCode;
use hookvm_primitives::keylet::{self, Keylet, KeyletType};
use hookvm_primitives::{accountid, crypto};

use crate::context::HookContext;
use crate::error::SandboxError;
use crate::host::{host_try, memory_of, read_account, read_guest, read_h256, write_guest};

/// Combine two u32 halves into a u64 (high, low).
fn combine(high: i32, low: i32) -> u64 {
    ((high as u32 as u64) << 32) | low as u32 as u64
}

fn build_keylet(
    mem: &Memory,
    caller: &Caller<'_, HookContext>,
    keylet_type: i32,
    a: i32,
    b: i32,
    c: i32,
    d: i32,
    e: i32,
    f: i32,
) -> Result<Keylet, i64> {
    let kind = KeyletType::from_u32(keylet_type as u32)
        .ok_or(HookReturnCode::NoSuchKeylet.as_i64())?;
    let no_params = |rest: &[i32]| -> Result<(), i64> {
        if rest.iter().any(|v| *v != 0) {
            return Err(HookReturnCode::InvalidArgument.as_i64());
        }
        Ok(())
    };
    match kind {
        KeyletType::Account => {
            no_params(&[c, d, e, f])?;
            Ok(keylet::account(&read_account(mem, caller, a, b)?))
        }
        KeyletType::Hook => {
            no_params(&[c, d, e, f])?;
            Ok(keylet::hook(&read_account(mem, caller, a, b)?))
        }
        KeyletType::HookState => {
            let acc = read_account(mem, caller, a, b)?;
            let ns = read_h256(mem, caller, c, d)?;
            let key = read_h256(mem, caller, e, f)?;
            Ok(keylet::hook_state(&acc, &ns, &key))
        }
        KeyletType::Amendments => {
            no_params(&[a, b, c, d, e, f])?;
            Ok(keylet::amendments())
        }
        KeyletType::Fees => {
            no_params(&[a, b, c, d, e, f])?;
            Ok(keylet::fees())
        }
        KeyletType::NegativeUnl => {
            no_params(&[a, b, c, d, e, f])?;
            Ok(keylet::negative_unl())
        }
        KeyletType::EmittedDir => {
            no_params(&[a, b, c, d, e, f])?;
            Ok(keylet::emitted_dir())
        }
        KeyletType::Skip => {
            no_params(&[c, d, e, f])?;
            match a {
                0 => {
                    if b != 0 {
                        return Err(HookReturnCode::InvalidArgument.as_i64());
                    }
                    Ok(keylet::skip(None))
                }
                1 => Ok(keylet::skip(Some(b as u32))),
                _ => Err(HookReturnCode::InvalidArgument.as_i64()),
            }
        }
        KeyletType::Line => {
            let acc_a = read_account(mem, caller, a, b)?;
            let acc_b = read_account(mem, caller, c, d)?;
            let currency = read_guest(mem, caller, e, f)?;
            let currency: &[u8; 20] = currency
                .as_slice()
                .try_into()
                .map_err(|_| HookReturnCode::InvalidArgument.as_i64())?;
            Ok(keylet::line(&acc_a, &acc_b, currency))
        }
        KeyletType::Offer => {
            no_params(&[d, e, f])?;
            Ok(keylet::offer(&read_account(mem, caller, a, b)?, c as u32))
        }
        KeyletType::Ticket => {
            no_params(&[d, e, f])?;
            Ok(keylet::ticket(&read_account(mem, caller, a, b)?, c as u32))
        }
        KeyletType::Check => {
            no_params(&[d, e, f])?;
            Ok(keylet::check(&read_account(mem, caller, a, b)?, c as u32))
        }
        KeyletType::Escrow => {
            no_params(&[d, e, f])?;
            Ok(keylet::escrow(&read_account(mem, caller, a, b)?, c as u32))
        }
        KeyletType::Signers => {
            no_params(&[c, d, e, f])?;
            Ok(keylet::signers(&read_account(mem, caller, a, b)?))
        }
        KeyletType::OwnerDir => {
            no_params(&[c, d, e, f])?;
            Ok(keylet::owner_dir(&read_account(mem, caller, a, b)?))
        }
        KeyletType::Paychan => {
            no_params(&[f])?;
            let src = read_account(mem, caller, a, b)?;
            let dst = read_account(mem, caller, c, d)?;
            Ok(keylet::paychan(&src, &dst, e as u32))
        }
        KeyletType::DepositPreauth => {
            no_params(&[e, f])?;
            let owner = read_account(mem, caller, a, b)?;
            let preauthorized = read_account(mem, caller, c, d)?;
            Ok(keylet::deposit_preauth(&owner, &preauthorized))
        }
        KeyletType::Page => {
            let root = read_h256(mem, caller, a, b)?;
            Ok(keylet::page(&root, combine(c, d)))
        }
        KeyletType::Quality => {
            let base = read_guest(mem, caller, a, b)?;
            let base = Keylet::from_bytes(&base).map_err(|code| code.as_i64())?;
            keylet::quality(&base, combine(c, d)).map_err(|code| code.as_i64())
        }
        KeyletType::Unchecked => {
            no_params(&[c, d, e, f])?;
            Ok(keylet::unchecked(&read_h256(mem, caller, a, b)?))
        }
        KeyletType::Child => {
            no_params(&[c, d, e, f])?;
            Ok(keylet::child(&read_h256(mem, caller, a, b)?))
        }
        KeyletType::Emitted => {
            no_params(&[c, d, e, f])?;
            Ok(keylet::emitted_txn(&read_h256(mem, caller, a, b)?))
        }
    }
}

pub(super) fn register(linker: &mut Linker<HookContext>) -> Result<(), SandboxError> {
    linker.func_wrap(
        "env",
        "util_raddr",
        |mut caller: Caller<'_, HookContext>,
         write_ptr: i32,
         write_len: i32,
         read_ptr: i32,
         read_len: i32|
         -> i64 {
            let mem = host_try!(memory_of(&caller));
            let account = host_try!(read_account(&mem, &caller, read_ptr, read_len));
            let address = accountid::encode_raddr(&account);
            write_guest(&mem, &mut caller, write_ptr, write_len, address.as_bytes())
        },
    )?;

    linker.func_wrap(
        "env",
        "util_accid",
        |mut caller: Caller<'_, HookContext>,
         write_ptr: i32,
         write_len: i32,
         read_ptr: i32,
         read_len: i32|
         -> i64 {
            let mem = host_try!(memory_of(&caller));
            let raw = host_try!(read_guest(&mem, &caller, read_ptr, read_len));
            let address = match std::str::from_utf8(&raw) {
                Ok(s) => s,
                Err(_) => return HookReturnCode::InvalidArgument.as_i64(),
            };
            match accountid::decode_raddr(address) {
                Ok(account) => write_guest(&mem, &mut caller, write_ptr, write_len, &account),
                Err(c) => c.as_i64(),
            }
        },
    )?;

    linker.func_wrap(
        "env",
        "util_verify",
        |mut caller: Caller<'_, HookContext>,
         dread_ptr: i32,
         dread_len: i32,
         sread_ptr: i32,
         sread_len: i32,
         kread_ptr: i32,
         kread_len: i32|
         -> i64 {
            let mem = host_try!(memory_of(&caller));
            let data = host_try!(read_guest(&mem, &caller, dread_ptr, dread_len));
            let signature = host_try!(read_guest(&mem, &caller, sread_ptr, sread_len));
            let public_key = host_try!(read_guest(&mem, &caller, kread_ptr, kread_len));
            crypto::verify(&data, &signature, &public_key) as i64
        },
    )?;

    linker.func_wrap(
        "env",
        "util_sha512h",
        |mut caller: Caller<'_, HookContext>,
         write_ptr: i32,
         write_len: i32,
         read_ptr: i32,
         read_len: i32|
         -> i64 {
            let mem = host_try!(memory_of(&caller));
            let data = host_try!(read_guest(&mem, &caller, read_ptr, read_len));
            let digest = crypto::sha512h(&data);
            write_guest(&mem, &mut caller, write_ptr, write_len, &digest)
        },
    )?;

    linker.func_wrap(
        "env",
        "util_keylet",
        |mut caller: Caller<'_, HookContext>,
         write_ptr: i32,
         write_len: i32,
         keylet_type: i32,
         a: i32,
         b: i32,
         c: i32,
         d: i32,
         e: i32,
         f: i32|
         -> i64 {
            let mem = host_try!(memory_of(&caller));
            let keylet =
                host_try!(build_keylet(&mem, &caller, keylet_type, a, b, c, d, e, f));
            write_guest(&mem, &mut caller, write_ptr, write_len, &keylet.to_bytes())
        },
    )?;
    Ok(())
}
