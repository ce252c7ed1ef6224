//! Execution control: the `_g` guard and the two terminal calls.
//!
//! `accept` and `rollback` record the exit on the context and then trap,
//! which is the single mechanism that stops the guest. A guard violation
//! takes the same trap path with a forced rollback exit.

use wasmtime::{Caller, Linker};

use hookvm_primitives::error::{ExitType, HookReturnCode};

use crate::context::HookContext;
use crate::error::SandboxError;
use crate::host::{memory_of, read_guest};

/// Marker message carried by deliberate termination traps.
pub(crate) const EXIT_TRAP: &str = "hook exit";

fn register_exit(
    linker: &mut Linker<HookContext>,
    name: &str,
    exit_type: ExitType,
) -> Result<(), SandboxError> {
    linker.func_wrap(
        "env",
        name,
        move |mut caller: Caller<'_, HookContext>,
              read_ptr: i32,
              read_len: i32,
              error_code: i64|
              -> Result<i64, anyhow::Error> {
            let mem = match memory_of(&caller) {
                Ok(m) => m,
                Err(code) => return Ok(code),
            };
            let reason = match read_guest(&mem, &caller, read_ptr, read_len) {
                Ok(r) => r,
                Err(code) => return Ok(code),
            };
            caller.data_mut().record_exit(exit_type, error_code, &reason);
            Err(anyhow::anyhow!(EXIT_TRAP))
        },
    )?;
    Ok(())
}

pub(super) fn register(linker: &mut Linker<HookContext>) -> Result<(), SandboxError> {
    register_exit(linker, "accept", ExitType::Accept)?;
    register_exit(linker, "rollback", ExitType::Rollback)?;

    linker.func_wrap(
        "env",
        "_g",
        |mut caller: Caller<'_, HookContext>,
         guard_id: i32,
         max_iter: i32|
         -> Result<i32, anyhow::Error> {
            let ctx = caller.data_mut();
            match ctx.guards.hit(guard_id as u32, max_iter as u32) {
                Ok(count) => Ok(count as i32),
                Err(_) => {
                    ctx.record_exit(
                        ExitType::Rollback,
                        HookReturnCode::GuardViolation.as_i64(),
                        b"guard violation",
                    );
                    Err(anyhow::anyhow!(EXIT_TRAP))
                }
            }
        },
    )?;
    Ok(())
}
