//! Decimal-float operations: thin wrappers over the packed-float core.

use wasmtime::{Caller, Linker};

use hookvm_primitives::error::HookReturnCode;
use hookvm_primitives::{float, sto};

use crate::context::HookContext;
use crate::error::SandboxError;
use crate::host::{host_try, memory_of, read_guest, retf, write_guest};

pub(super) fn register(linker: &mut Linker<HookContext>) -> Result<(), SandboxError> {
    linker.func_wrap(
        "env",
        "float_set",
        |_: Caller<'_, HookContext>, exponent: i32, mantissa: i64| -> i64 {
            retf(float::new(exponent, mantissa))
        },
    )?;
    linker.func_wrap("env", "float_one", |_: Caller<'_, HookContext>| -> i64 {
        float::one()
    })?;
    linker.func_wrap(
        "env",
        "float_sum",
        |_: Caller<'_, HookContext>, a: i64, b: i64| -> i64 { retf(float::sum(a, b)) },
    )?;
    linker.func_wrap(
        "env",
        "float_multiply",
        |_: Caller<'_, HookContext>, a: i64, b: i64| -> i64 { retf(float::multiply(a, b)) },
    )?;
    linker.func_wrap(
        "env",
        "float_mulratio",
        |_: Caller<'_, HookContext>, f: i64, round_up: i32, numerator: i32, denominator: i32| -> i64 {
            retf(float::mulratio(
                f,
                round_up != 0,
                numerator as u32,
                denominator as u32,
            ))
        },
    )?;
    linker.func_wrap(
        "env",
        "float_divide",
        |_: Caller<'_, HookContext>, a: i64, b: i64| -> i64 { retf(float::divide(a, b)) },
    )?;
    linker.func_wrap(
        "env",
        "float_invert",
        |_: Caller<'_, HookContext>, f: i64| -> i64 { retf(float::invert(f)) },
    )?;
    linker.func_wrap(
        "env",
        "float_negate",
        |_: Caller<'_, HookContext>, f: i64| -> i64 { retf(float::negate(f)) },
    )?;
    linker.func_wrap(
        "env",
        "float_compare",
        |_: Caller<'_, HookContext>, a: i64, b: i64, mode: i32| -> i64 {
            retf(float::compare(a, b, mode as u32))
        },
    )?;
    linker.func_wrap(
        "env",
        "float_exponent",
        |_: Caller<'_, HookContext>, f: i64| -> i64 { retf(float::exponent(f)) },
    )?;
    linker.func_wrap(
        "env",
        "float_exponent_set",
        |_: Caller<'_, HookContext>, f: i64, exponent: i32| -> i64 {
            retf(float::exponent_set(f, exponent))
        },
    )?;
    linker.func_wrap(
        "env",
        "float_mantissa",
        |_: Caller<'_, HookContext>, f: i64| -> i64 { retf(float::mantissa(f)) },
    )?;
    linker.func_wrap(
        "env",
        "float_mantissa_set",
        |_: Caller<'_, HookContext>, f: i64, mantissa: i64| -> i64 {
            retf(float::mantissa_set(f, mantissa))
        },
    )?;
    linker.func_wrap(
        "env",
        "float_sign",
        |_: Caller<'_, HookContext>, f: i64| -> i64 { retf(float::sign(f)) },
    )?;
    linker.func_wrap(
        "env",
        "float_sign_set",
        |_: Caller<'_, HookContext>, f: i64, negative: i32| -> i64 {
            retf(float::sign_set(f, negative != 0))
        },
    )?;
    linker.func_wrap(
        "env",
        "float_int",
        |_: Caller<'_, HookContext>, f: i64, decimal_places: i32, absolute: i32| -> i64 {
            if decimal_places < 0 {
                return HookReturnCode::InvalidArgument.as_i64();
            }
            retf(float::int(f, decimal_places as u32, absolute != 0))
        },
    )?;

    linker.func_wrap(
        "env",
        "float_sto",
        |mut caller: Caller<'_, HookContext>,
         write_ptr: i32,
         write_len: i32,
         cread_ptr: i32,
         cread_len: i32,
         iread_ptr: i32,
         iread_len: i32,
         float1: i64,
         field_code: i32|
         -> i64 {
            let mem = host_try!(memory_of(&caller));
            let currency = host_try!(read_guest(&mem, &caller, cread_ptr, cread_len));
            let issuer = host_try!(read_guest(&mem, &caller, iread_ptr, iread_len));
            let body = match (currency.len(), issuer.len()) {
                (0, 0) => float::to_amount_bytes(float1, None),
                (20, 20) => {
                    let cur: &[u8; 20] = currency.as_slice().try_into().unwrap();
                    let iss: &[u8; 20] = issuer.as_slice().try_into().unwrap();
                    float::to_amount_bytes(float1, Some((cur, iss)))
                }
                _ => return HookReturnCode::InvalidArgument.as_i64(),
            };
            let body = match body {
                Ok(b) => b,
                Err(c) => return c.as_i64(),
            };
            let out = if field_code == 0 {
                body
            } else {
                sto::encode_amount((field_code as u32 & 0xFFFF) as u16, &body)
            };
            write_guest(&mem, &mut caller, write_ptr, write_len, &out)
        },
    )?;

    linker.func_wrap(
        "env",
        "float_sto_set",
        |mut caller: Caller<'_, HookContext>, read_ptr: i32, read_len: i32| -> i64 {
            let mem = host_try!(memory_of(&caller));
            let data = host_try!(read_guest(&mem, &caller, read_ptr, read_len));
            // Accept a bare amount body or a whole AMOUNT field.
            if let Ok(f) = sto::parse_field(&data, 0) {
                if f.type_code == sto::TYPE_AMOUNT && f.end == data.len() {
                    return retf(float::from_amount_bytes(
                        &data[f.payload_start..f.payload_start + f.payload_len],
                    ));
                }
            }
            retf(float::from_amount_bytes(&data))
        },
    )?;
    Ok(())
}
