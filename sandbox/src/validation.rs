//! Install-time static analysis of candidate hook modules.
//!
//! One pass over the bytecode, in check order: wasm validity, import
//! whitelist, `call_indirect` ban, `memory.grow` ban, loop-guard
//! injection, block nesting, and the worst-case instruction bound. Each
//! rejection carries a stable log code and is logged as
//! `HookSet(<code>)[<account>]: <message>`.

use wasmparser::{
    CompositeType, ExternalKind, FuncType, Operator, Parser, Payload, TypeRef, ValType, Validator,
    WasmFeatures,
};

use hookvm_primitives::accountid::encode_raddr;
use hookvm_primitives::error::HookSetCode;
use hookvm_primitives::types::AccountId;

use crate::config::SandboxConfig;

/// The fixed set of function names a hook module may import from `env`.
pub const IMPORT_WHITELIST: &[&str] = &[
    "accept",
    "emit",
    "etxn_burden",
    "etxn_details",
    "etxn_fee_base",
    "etxn_generation",
    "etxn_reserve",
    "float_compare",
    "float_divide",
    "float_exponent",
    "float_exponent_set",
    "float_int",
    "float_invert",
    "float_mantissa",
    "float_mantissa_set",
    "float_mulratio",
    "float_multiply",
    "float_negate",
    "float_one",
    "float_set",
    "float_sign",
    "float_sign_set",
    "float_sto",
    "float_sto_set",
    "float_sum",
    "fee_base",
    "_g",
    "hook_account",
    "hook_hash",
    "hook_param",
    "hook_param_set",
    "hook_pos",
    "hook_skip",
    "ledger_seq",
    "ledger_last_hash",
    "nonce",
    "otxn_burden",
    "otxn_field",
    "otxn_generation",
    "otxn_id",
    "otxn_slot",
    "otxn_type",
    "rollback",
    "slot",
    "slot_clear",
    "slot_count",
    "slot_float",
    "slot_id",
    "slot_set",
    "slot_size",
    "slot_subarray",
    "slot_subfield",
    "slot_type",
    "state",
    "state_foreign",
    "state_foreign_set",
    "state_set",
    "sto_emplace",
    "sto_erase",
    "sto_subarray",
    "sto_subfield",
    "sto_validate",
    "trace",
    "trace_float",
    "trace_num",
    "trace_slot",
    "util_accid",
    "util_keylet",
    "util_raddr",
    "util_sha512h",
    "util_verify",
];

/// Outcome of a successful validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedModule {
    /// Worst-case instruction count: Σ block instructions × the product
    /// of enclosing guard maxima.
    pub worst_case_instructions: u64,
}

/// An install-time rejection with its stable log code.
#[derive(Debug, Clone, thiserror::Error)]
#[error("HookSet({code})[{account}]: {message}")]
pub struct HookSetError {
    pub code: HookSetCode,
    pub account: String,
    pub message: String,
}

impl HookSetError {
    pub fn new(code: HookSetCode, account: &AccountId, message: impl Into<String>) -> Self {
        let err = Self {
            code,
            account: encode_raddr(account),
            message: message.into(),
        };
        tracing::debug!("{err}");
        err
    }
}

fn deterministic_features() -> WasmFeatures {
    WasmFeatures {
        simd: false,
        relaxed_simd: false,
        threads: false,
        multi_memory: false,
        memory64: false,
        tail_call: false,
        exceptions: false,
        gc: false,
        function_references: false,
        component_model: false,
        ..WasmFeatures::default()
    }
}

fn is_hook_signature(ty: &FuncType) -> bool {
    ty.params() == [ValType::I32] && ty.results() == [ValType::I64]
}

/// Validate a candidate hook module.
pub fn validate_hook_wasm(
    wasm: &[u8],
    account: &AccountId,
    config: &SandboxConfig,
) -> Result<ValidatedModule, HookSetError> {
    // Check 1: the bytecode must parse and validate.
    Validator::new_with_features(deterministic_features())
        .validate_all(wasm)
        .map_err(|e| {
            HookSetError::new(
                HookSetCode::ShortHook,
                account,
                format!("invalid webassembly: {e}"),
            )
        })?;

    let mut func_types: Vec<FuncType> = Vec::new();
    let mut imported_funcs: Vec<u32> = Vec::new();
    let mut declared_funcs: Vec<u32> = Vec::new();
    let mut guard_index: Option<u32> = None;
    let mut hook_export: Option<u32> = None;
    let mut cbak_export: Option<u32> = None;
    let mut bodies = Vec::new();

    for payload in Parser::new(0).parse_all(wasm) {
        let payload = payload.map_err(|e| {
            HookSetError::new(HookSetCode::ShortHook, account, format!("parse error: {e}"))
        })?;
        match payload {
            Payload::TypeSection(reader) => {
                for rec_group in reader {
                    let rec_group = rec_group.map_err(|e| {
                        HookSetError::new(
                            HookSetCode::ShortHook,
                            account,
                            format!("type section: {e}"),
                        )
                    })?;
                    for sub in rec_group.types() {
                        match &sub.composite_type {
                            CompositeType::Func(f) => func_types.push(f.clone()),
                            _ => {
                                return Err(HookSetError::new(
                                    HookSetCode::ShortHook,
                                    account,
                                    "non-function type",
                                ))
                            }
                        }
                    }
                }
            }
            Payload::ImportSection(reader) => {
                for import in reader {
                    let import = import.map_err(|e| {
                        HookSetError::new(
                            HookSetCode::ShortHook,
                            account,
                            format!("import section: {e}"),
                        )
                    })?;
                    // Check 2: imports come only from the hook API.
                    match import.ty {
                        TypeRef::Func(type_idx) => {
                            if import.module != "env"
                                || !IMPORT_WHITELIST.contains(&import.name)
                            {
                                return Err(HookSetError::new(
                                    HookSetCode::CallIllegal,
                                    account,
                                    format!(
                                        "import of non-whitelisted function {}::{}",
                                        import.module, import.name
                                    ),
                                ));
                            }
                            if import.name == "_g" {
                                guard_index = Some(imported_funcs.len() as u32);
                            }
                            imported_funcs.push(type_idx);
                        }
                        TypeRef::Memory(_) if import.module == "env" && import.name == "memory" => {}
                        TypeRef::Table(_) if import.module == "env" && import.name == "table" => {}
                        _ => {
                            return Err(HookSetError::new(
                                HookSetCode::CallIllegal,
                                account,
                                format!(
                                    "disallowed import {}::{}",
                                    import.module, import.name
                                ),
                            ))
                        }
                    }
                }
            }
            Payload::FunctionSection(reader) => {
                for idx in reader {
                    let idx = idx.map_err(|e| {
                        HookSetError::new(
                            HookSetCode::ShortHook,
                            account,
                            format!("function section: {e}"),
                        )
                    })?;
                    declared_funcs.push(idx);
                }
            }
            Payload::ExportSection(reader) => {
                for export in reader {
                    let export = export.map_err(|e| {
                        HookSetError::new(
                            HookSetCode::ShortHook,
                            account,
                            format!("export section: {e}"),
                        )
                    })?;
                    if export.kind == ExternalKind::Func {
                        match export.name {
                            "hook" => hook_export = Some(export.index),
                            "cbak" => cbak_export = Some(export.index),
                            _ => {}
                        }
                    }
                }
            }
            Payload::CodeSectionEntry(body) => bodies.push(body),
            _ => {}
        }
    }

    // Entry points must exist with the (i32) -> i64 signature.
    let func_type_of = |func_index: u32| -> Option<&FuncType> {
        let imported = imported_funcs.len() as u32;
        let type_idx = if func_index < imported {
            imported_funcs[func_index as usize]
        } else {
            *declared_funcs.get((func_index - imported) as usize)?
        };
        func_types.get(type_idx as usize)
    };
    for (name, export) in [("hook", hook_export), ("cbak", cbak_export)] {
        match export {
            None if name == "hook" => {
                return Err(HookSetError::new(
                    HookSetCode::ShortHook,
                    account,
                    "module does not export hook(i32) -> i64",
                ))
            }
            Some(index) => {
                let ok = func_type_of(index).map(is_hook_signature).unwrap_or(false);
                if !ok {
                    return Err(HookSetError::new(
                        HookSetCode::ShortHook,
                        account,
                        format!("export {name} has wrong signature"),
                    ));
                }
            }
            None => {}
        }
    }

    // Checks 3..7 over every function body.
    let mut total: u64 = 0;
    for body in bodies {
        let ops = collect_operators(&body, account)?;
        total = total.saturating_add(scan_function(&ops, guard_index, account)?);
    }

    tracing::debug!(
        "HookSet({})[{}]: worst-case instruction count {}",
        HookSetCode::InstructionCount,
        encode_raddr(account),
        total
    );
    if total > config.max_worst_case_instructions {
        return Err(HookSetError::new(
            HookSetCode::InstructionExcess,
            account,
            format!(
                "worst-case instruction count {total} exceeds ceiling {}",
                config.max_worst_case_instructions
            ),
        ));
    }

    Ok(ValidatedModule {
        worst_case_instructions: total,
    })
}

fn collect_operators<'a>(
    body: &wasmparser::FunctionBody<'a>,
    account: &AccountId,
) -> Result<Vec<Operator<'a>>, HookSetError> {
    let mut reader = body.get_operators_reader().map_err(|e| {
        HookSetError::new(HookSetCode::ShortHook, account, format!("code section: {e}"))
    })?;
    let mut ops = Vec::new();
    while !reader.eof() {
        let op = reader.read().map_err(|e| {
            HookSetError::new(HookSetCode::ShortHook, account, format!("code section: {e}"))
        })?;
        ops.push(op);
    }
    Ok(ops)
}

/// Scan one function body; returns its worst-case instruction count.
fn scan_function(
    ops: &[Operator<'_>],
    guard_index: Option<u32>,
    account: &AccountId,
) -> Result<u64, HookSetError> {
    // Multiplier stack: one frame per open block, function frame at the
    // bottom. The top is the product of all enclosing guard maxima.
    let mut stack: Vec<u64> = vec![1];
    let mut total: u64 = 0;

    for (i, op) in ops.iter().enumerate() {
        let product = match stack.last() {
            Some(p) => *p,
            // Check 6: execution fell below depth 0.
            None => {
                return Err(HookSetError::new(
                    HookSetCode::BlockIllegal,
                    account,
                    "instruction after function frame closed",
                ))
            }
        };
        total = total.saturating_add(product);

        match op {
            // Check 3: no indirect calls.
            Operator::CallIndirect { .. } => {
                return Err(HookSetError::new(
                    HookSetCode::CallIndirect,
                    account,
                    "call_indirect is disallowed",
                ))
            }
            // Check 4: no memory growth.
            Operator::MemoryGrow { .. } => {
                return Err(HookSetError::new(
                    HookSetCode::MemoryGrow,
                    account,
                    "memory.grow is disallowed",
                ))
            }
            Operator::Block { .. } | Operator::If { .. } => stack.push(product),
            // Check 5: every loop body starts with a constant guard call.
            Operator::Loop { .. } => {
                let max_iter = check_guard(ops, i, guard_index, account)?;
                stack.push(product.saturating_mul(max_iter));
            }
            Operator::End => {
                if stack.pop().is_none() {
                    return Err(HookSetError::new(
                        HookSetCode::BlockIllegal,
                        account,
                        "end below depth 0",
                    ));
                }
            }
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(HookSetError::new(
            HookSetCode::BlockIllegal,
            account,
            "unclosed block at end of function",
        ));
    }
    Ok(total)
}

/// Validate the guard sequence directly after the loop opcode at
/// `loop_at`; returns the guard's max-iteration immediate.
fn check_guard(
    ops: &[Operator<'_>],
    loop_at: usize,
    guard_index: Option<u32>,
    account: &AccountId,
) -> Result<u64, HookSetError> {
    let is_guard_call = |op: &Operator<'_>| {
        matches!(op, Operator::Call { function_index } if Some(*function_index) == guard_index)
    };
    if let (
        Some(Operator::I32Const { .. }),
        Some(Operator::I32Const { value }),
        Some(call),
    ) = (
        ops.get(loop_at + 1),
        ops.get(loop_at + 2),
        ops.get(loop_at + 3),
    ) {
        if is_guard_call(call) {
            return Ok(*value as u32 as u64);
        }
    }
    // A guard call near the loop head with anything other than two
    // constant immediates is a parameter violation; no call at all means
    // the guard is missing.
    let nearby_guard = ops[loop_at + 1..]
        .iter()
        .take(3)
        .any(|op| is_guard_call(op));
    if nearby_guard {
        Err(HookSetError::new(
            HookSetCode::GuardParameters,
            account,
            "guard call must take two constant parameters",
        ))
    } else {
        Err(HookSetError::new(
            HookSetCode::GuardMissing,
            account,
            "loop body must start with a call to _g",
        ))
    }
}
