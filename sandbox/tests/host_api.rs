//! Host API integration tests: WAT guests drive the host functions and
//! report results back through the accept exit code or a state write.

use std::collections::BTreeMap;
use std::sync::Arc;

use hookvm_hostapi::{MemLedger, StateMap};
use hookvm_primitives::crypto::sha512h;
use hookvm_primitives::error::ExitType;
use hookvm_primitives::types::{AccountId, Hash256, TxType};
use hookvm_primitives::TxnBuilder;
use hookvm_sandbox::{apply, HookResult, SandboxConfig};

const HOOK_ACCOUNT: AccountId = [7u8; 20];
const NAMESPACE: Hash256 = [0x01; 32];
const HOOK_HASH: Hash256 = [0x42; 32];

fn run_at_position(wat_src: &str, chain_position: i32) -> HookResult {
    let wasm = wat::parse_str(wat_src).expect("test wat must assemble");
    let otxn = TxnBuilder::new(TxType::Payment)
        .account(&[9u8; 20])
        .destination(&HOOK_ACCOUNT)
        .amount_drops(1000)
        .build();
    let mut ledger = MemLedger::new();
    ledger.insert_account(HOOK_ACCOUNT);
    apply(
        [0u8; 32],
        HOOK_HASH,
        NAMESPACE,
        &wasm,
        BTreeMap::new(),
        BTreeMap::new(),
        StateMap::new(),
        Arc::new(ledger),
        HOOK_ACCOUNT,
        otxn,
        false,
        0,
        chain_position,
        &SandboxConfig::default(),
    )
    .unwrap()
}

fn run(wat_src: &str) -> HookResult {
    run_at_position(wat_src, 0)
}

/// The guest accepts with the expression's value as the exit code.
fn accept_code(result: &HookResult) -> i64 {
    assert_eq!(
        result.exit_type,
        ExitType::Accept,
        "guest must accept, got {:?} / {:?}",
        result.exit_type,
        String::from_utf8_lossy(&result.exit_reason)
    );
    result.exit_code
}

#[test]
fn test_float_arithmetic_through_guest() {
    // 3 * 4 scaled to an integer
    let result = run(
        r#"(module
            (import "env" "float_set" (func $fset (param i32 i64) (result i64)))
            (import "env" "float_multiply" (func $fmul (param i64 i64) (result i64)))
            (import "env" "float_int" (func $fint (param i64 i32 i32) (result i64)))
            (import "env" "accept" (func $accept (param i32 i32 i64) (result i64)))
            (import "env" "memory" (memory 1 1))
            (func (export "hook") (param i32) (result i64)
                (drop (call $accept (i32.const 0) (i32.const 0)
                    (call $fint
                        (call $fmul
                            (call $fset (i32.const 0) (i64.const 3))
                            (call $fset (i32.const 0) (i64.const 4)))
                        (i32.const 0)
                        (i32.const 0))))
                (i64.const 0)))"#,
    );
    assert_eq!(accept_code(&result), 12);
}

#[test]
fn test_float_compare_through_guest() {
    // compare(2, 3, LT) == 1
    let result = run(
        r#"(module
            (import "env" "float_set" (func $fset (param i32 i64) (result i64)))
            (import "env" "float_compare" (func $fcmp (param i64 i64 i32) (result i64)))
            (import "env" "accept" (func $accept (param i32 i32 i64) (result i64)))
            (import "env" "memory" (memory 1 1))
            (func (export "hook") (param i32) (result i64)
                (drop (call $accept (i32.const 0) (i32.const 0)
                    (call $fcmp
                        (call $fset (i32.const 0) (i64.const 2))
                        (call $fset (i32.const 0) (i64.const 3))
                        (i32.const 2))))
                (i64.const 0)))"#,
    );
    assert_eq!(accept_code(&result), 1);
}

#[test]
fn test_etxn_reserve_second_call_already_set() {
    let result = run(
        r#"(module
            (import "env" "etxn_reserve" (func $reserve (param i32) (result i64)))
            (import "env" "accept" (func $accept (param i32 i32 i64) (result i64)))
            (import "env" "memory" (memory 1 1))
            (func (export "hook") (param i32) (result i64)
                (drop (call $reserve (i32.const 1)))
                (drop (call $accept (i32.const 0) (i32.const 0)
                    (call $reserve (i32.const 1))))
                (i64.const 0)))"#,
    );
    assert_eq!(accept_code(&result), -8); // ALREADY_SET
}

#[test]
fn test_emit_without_reserve_prerequisite_not_met() {
    let result = run(
        r#"(module
            (import "env" "emit" (func $emit (param i32 i32 i32 i32) (result i64)))
            (import "env" "accept" (func $accept (param i32 i32 i64) (result i64)))
            (import "env" "memory" (memory 1 1))
            (func (export "hook") (param i32) (result i64)
                (drop (call $accept (i32.const 0) (i32.const 0)
                    (call $emit (i32.const 100) (i32.const 32) (i32.const 0) (i32.const 4))))
                (i64.const 0)))"#,
    );
    assert_eq!(accept_code(&result), -9); // PREREQUISITE_NOT_MET
}

#[test]
fn test_hook_pos_reports_chain_position() {
    let result = run_at_position(
        r#"(module
            (import "env" "hook_pos" (func $pos (result i64)))
            (import "env" "accept" (func $accept (param i32 i32 i64) (result i64)))
            (import "env" "memory" (memory 1 1))
            (func (export "hook") (param i32) (result i64)
                (drop (call $accept (i32.const 0) (i32.const 0) (call $pos)))
                (i64.const 0)))"#,
        3,
    );
    assert_eq!(accept_code(&result), 3);
}

#[test]
fn test_otxn_type_and_burden() {
    let result = run(
        r#"(module
            (import "env" "otxn_type" (func $otype (result i64)))
            (import "env" "otxn_burden" (func $oburden (result i64)))
            (import "env" "accept" (func $accept (param i32 i32 i64) (result i64)))
            (import "env" "memory" (memory 1 1))
            (func (export "hook") (param i32) (result i64)
                (drop (call $accept (i32.const 0) (i32.const 0)
                    (i64.add
                        (i64.mul (call $otype) (i64.const 1000))
                        (call $oburden))))
                (i64.const 0)))"#,
    );
    // Payment (0) * 1000 + user-txn burden (1)
    assert_eq!(accept_code(&result), 1);
}

#[test]
fn test_amount_through_slots_and_float() {
    // Load the otxn into slot 1, take its Amount subfield, parse it as a
    // float, and report the drop count.
    let result = run(
        r#"(module
            (import "env" "otxn_slot" (func $oslot (param i32) (result i64)))
            (import "env" "slot_subfield" (func $subfield (param i32 i32 i32) (result i64)))
            (import "env" "slot_float" (func $sfloat (param i32) (result i64)))
            (import "env" "float_int" (func $fint (param i64 i32 i32) (result i64)))
            (import "env" "accept" (func $accept (param i32 i32 i64) (result i64)))
            (import "env" "memory" (memory 1 1))
            (func (export "hook") (param i32) (result i64)
                (local $amount_slot i64)
                (drop (call $oslot (i32.const 1)))
                ;; Amount field id: type 6, field 1
                (local.set $amount_slot
                    (call $subfield (i32.const 1) (i32.const 393217) (i32.const 0)))
                (drop (call $accept (i32.const 0) (i32.const 0)
                    (call $fint
                        (call $sfloat (i32.wrap_i64 (local.get $amount_slot)))
                        (i32.const 0)
                        (i32.const 0))))
                (i64.const 0)))"#,
    );
    assert_eq!(accept_code(&result), 1000);
}

#[test]
fn test_sto_subfield_through_guest() {
    // The guest asks for the TransactionType field of a two-field blob
    // it carries in its own data segment and reports the packed
    // offset/length. Blob: TransactionType (0x12 0x00 0x00) then
    // Sequence (0x24 0x00 0x00 0x00 0x07).
    let result = run(
        r#"(module
            (import "env" "sto_subfield" (func $sub (param i32 i32 i32) (result i64)))
            (import "env" "accept" (func $accept (param i32 i32 i64) (result i64)))
            (import "env" "memory" (memory 1 1))
            (data (i32.const 0) "\12\00\00\24\00\00\00\07")
            (func (export "hook") (param i32) (result i64)
                ;; Sequence field id: type 2, field 4
                (drop (call $accept (i32.const 0) (i32.const 0)
                    (call $sub (i32.const 0) (i32.const 8) (i32.const 131076))))
                (i64.const 0)))"#,
    );
    // payload at offset 4, length 4
    let packed = accept_code(&result);
    assert_eq!(packed & 0xFFFF_FFFF, 4);
    assert_eq!(packed >> 32, 4);
}

#[test]
fn test_sha512h_writes_digest() {
    // Hash "abcd" and persist the digest through hook state.
    let result = run(
        r#"(module
            (import "env" "util_sha512h" (func $sha (param i32 i32 i32 i32) (result i64)))
            (import "env" "state_set" (func $state_set (param i32 i32 i32 i32) (result i64)))
            (import "env" "accept" (func $accept (param i32 i32 i64) (result i64)))
            (import "env" "memory" (memory 1 1))
            (data (i32.const 0) "abcd")
            (data (i32.const 4) "\01")
            (func (export "hook") (param i32) (result i64)
                (drop (call $sha (i32.const 100) (i32.const 32) (i32.const 0) (i32.const 4)))
                (drop (call $state_set (i32.const 100) (i32.const 32) (i32.const 4) (i32.const 1)))
                (drop (call $accept (i32.const 0) (i32.const 0) (i64.const 0)))
                (i64.const 0)))"#,
    );
    let mut key = [0u8; 32];
    key[31] = 0x01;
    let entry = result
        .state_map
        .entry(&HOOK_ACCOUNT, &NAMESPACE, &key)
        .expect("digest stored");
    assert_eq!(entry.value, sha512h(b"abcd").to_vec());
}

#[test]
fn test_raddr_accid_roundtrip_through_guest() {
    // hook_account -> util_raddr -> util_accid must reproduce the
    // account id; the guest persists the decoded bytes.
    let result = run(
        r#"(module
            (import "env" "hook_account" (func $acct (param i32 i32) (result i64)))
            (import "env" "util_raddr" (func $raddr (param i32 i32 i32 i32) (result i64)))
            (import "env" "util_accid" (func $accid (param i32 i32 i32 i32) (result i64)))
            (import "env" "state_set" (func $state_set (param i32 i32 i32 i32) (result i64)))
            (import "env" "accept" (func $accept (param i32 i32 i64) (result i64)))
            (import "env" "memory" (memory 1 1))
            (data (i32.const 0) "\01")
            (func (export "hook") (param i32) (result i64)
                (local $addr_len i64)
                (drop (call $acct (i32.const 100) (i32.const 20)))
                (local.set $addr_len
                    (call $raddr (i32.const 200) (i32.const 64) (i32.const 100) (i32.const 20)))
                (drop (call $accid (i32.const 300) (i32.const 20)
                    (i32.const 200) (i32.wrap_i64 (local.get $addr_len))))
                (drop (call $state_set (i32.const 300) (i32.const 20) (i32.const 0) (i32.const 1)))
                (drop (call $accept (i32.const 0) (i32.const 0) (i64.const 0)))
                (i64.const 0)))"#,
    );
    let mut key = [0u8; 32];
    key[31] = 0x01;
    let entry = result
        .state_map
        .entry(&HOOK_ACCOUNT, &NAMESPACE, &key)
        .expect("decoded account stored");
    assert_eq!(entry.value, HOOK_ACCOUNT.to_vec());
}

#[test]
fn test_keylet_account_written_to_guest() {
    // util_keylet(ACCOUNT) writes 34 bytes and returns the length.
    let result = run(
        r#"(module
            (import "env" "hook_account" (func $acct (param i32 i32) (result i64)))
            (import "env" "util_keylet" (func $keylet (param i32 i32 i32 i32 i32 i32 i32 i32 i32) (result i64)))
            (import "env" "accept" (func $accept (param i32 i32 i64) (result i64)))
            (import "env" "memory" (memory 1 1))
            (func (export "hook") (param i32) (result i64)
                (drop (call $acct (i32.const 100) (i32.const 20)))
                (drop (call $accept (i32.const 0) (i32.const 0)
                    (call $keylet (i32.const 200) (i32.const 34)
                        (i32.const 3) ;; ACCOUNT keylet
                        (i32.const 100) (i32.const 20)
                        (i32.const 0) (i32.const 0) (i32.const 0) (i32.const 0))))
                (i64.const 0)))"#,
    );
    assert_eq!(accept_code(&result), 34);
}

#[test]
fn test_unknown_keylet_type() {
    let result = run(
        r#"(module
            (import "env" "util_keylet" (func $keylet (param i32 i32 i32 i32 i32 i32 i32 i32 i32) (result i64)))
            (import "env" "accept" (func $accept (param i32 i32 i64) (result i64)))
            (import "env" "memory" (memory 1 1))
            (func (export "hook") (param i32) (result i64)
                (drop (call $accept (i32.const 0) (i32.const 0)
                    (call $keylet (i32.const 200) (i32.const 34)
                        (i32.const 99)
                        (i32.const 0) (i32.const 0) (i32.const 0)
                        (i32.const 0) (i32.const 0) (i32.const 0))))
                (i64.const 0)))"#,
    );
    assert_eq!(accept_code(&result), -21); // NO_SUCH_KEYLET
}

#[test]
fn test_nonce_returns_unique_values() {
    // Two nonces into guest memory; the guest reports whether the first
    // eight bytes differ.
    let result = run(
        r#"(module
            (import "env" "nonce" (func $nonce (param i32 i32) (result i64)))
            (import "env" "accept" (func $accept (param i32 i32 i64) (result i64)))
            (import "env" "memory" (memory 1 1))
            (func (export "hook") (param i32) (result i64)
                (drop (call $nonce (i32.const 100) (i32.const 32)))
                (drop (call $nonce (i32.const 200) (i32.const 32)))
                (drop (call $accept (i32.const 0) (i32.const 0)
                    (i64.extend_i32_u
                        (i64.ne (i64.load (i32.const 100)) (i64.load (i32.const 200))))))
                (i64.const 0)))"#,
    );
    assert_eq!(accept_code(&result), 1);
}

#[test]
fn test_write_buffer_too_small() {
    // ledger_last_hash needs 32 bytes; offering 16 is TOO_SMALL.
    let result = run(
        r#"(module
            (import "env" "ledger_last_hash" (func $last (param i32 i32) (result i64)))
            (import "env" "accept" (func $accept (param i32 i32 i64) (result i64)))
            (import "env" "memory" (memory 1 1))
            (func (export "hook") (param i32) (result i64)
                (drop (call $accept (i32.const 0) (i32.const 0)
                    (call $last (i32.const 100) (i32.const 16))))
                (i64.const 0)))"#,
    );
    assert_eq!(accept_code(&result), -4); // TOO_SMALL
}

#[test]
fn test_out_of_bounds_pointer_is_rejected() {
    let result = run(
        r#"(module
            (import "env" "util_sha512h" (func $sha (param i32 i32 i32 i32) (result i64)))
            (import "env" "accept" (func $accept (param i32 i32 i64) (result i64)))
            (import "env" "memory" (memory 1 1))
            (func (export "hook") (param i32) (result i64)
                (drop (call $accept (i32.const 0) (i32.const 0)
                    (call $sha (i32.const 100) (i32.const 32)
                        (i32.const 200000) (i32.const 4))))
                (i64.const 0)))"#,
    );
    assert_eq!(accept_code(&result), -1); // OUT_OF_BOUNDS
}
