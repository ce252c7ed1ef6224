//! Emitted-transaction queue with reservation accounting.
//!
//! A hook must reserve its emission count exactly once before emitting.
//! Each candidate is validated against the execution's expected emission
//! metadata before it is enqueued; the queue is drained into the ledger
//! only when the hook accepts.

use hookvm_primitives::error::{HookError, HookReturnCode};
use hookvm_primitives::txn::TxnView;
use hookvm_primitives::types::Hash256;

use crate::ledger::EmittedTxn;

/// The emission metadata every candidate must carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmitSpec {
    /// Id of the transaction being applied.
    pub parent_txn_id: Hash256,
    /// Required EmitGeneration: the applying txn's generation + 1.
    pub generation: u32,
    /// Required EmitBurden: the applying txn's burden + 1.
    pub burden: u64,
}

/// Ordered queue of validated emitted transactions.
#[derive(Debug, Clone, Default)]
pub struct EmissionQueue {
    reserved: Option<u32>,
    queue: Vec<EmittedTxn>,
}

impl EmissionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fix the expected emission count. Callable at most once.
    pub fn reserve(&mut self, count: u32, max_emit: u32) -> Result<u32, HookError> {
        if self.reserved.is_some() {
            return Err(HookReturnCode::AlreadySet.into());
        }
        if count > max_emit {
            return Err(HookReturnCode::TooBig.into());
        }
        self.reserved = Some(count);
        Ok(count)
    }

    /// The reservation, if one was made.
    pub fn reserved(&self) -> Option<u32> {
        self.reserved
    }

    /// Validate a candidate and enqueue it.
    pub fn emit(&mut self, blob: Vec<u8>, spec: &EmitSpec) -> Result<(), HookError> {
        let reserved = self
            .reserved
            .ok_or(HookReturnCode::PrerequisiteNotMet)?;
        if self.queue.len() as u32 >= reserved {
            return Err(HookReturnCode::TooManyEmittedTxn.into());
        }
        let txn = TxnView::new(&blob);
        txn.txn_type()
            .map_err(|_| HookReturnCode::EmissionFailure)?;
        let details = txn
            .emit_details()
            .ok_or(HookReturnCode::EmissionFailure)?;
        if details.generation != spec.generation
            || details.burden != spec.burden
            || details.parent_txn_id != spec.parent_txn_id
        {
            return Err(HookReturnCode::EmissionFailure.into());
        }
        self.queue.push(EmittedTxn {
            blob,
            burden: details.burden,
            generation: details.generation,
        });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Take the queued transactions, in emission order.
    pub fn drain(self) -> Vec<EmittedTxn> {
        self.queue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hookvm_primitives::txn::{EmitDetails, TxnBuilder};
    use hookvm_primitives::types::TxType;

    fn spec() -> EmitSpec {
        EmitSpec {
            parent_txn_id: [0x11; 32],
            generation: 1,
            burden: 2,
        }
    }

    fn candidate(spec: &EmitSpec) -> Vec<u8> {
        TxnBuilder::new(TxType::Payment)
            .account(&[1u8; 20])
            .destination(&[2u8; 20])
            .amount_drops(500)
            .emit_details(&EmitDetails {
                generation: spec.generation,
                burden: spec.burden,
                parent_txn_id: spec.parent_txn_id,
                nonce: [0xEE; 32],
                callback: [1u8; 20],
            })
            .build()
    }

    #[test]
    fn test_emit_before_reserve_fails() {
        let mut q = EmissionQueue::new();
        let err = q.emit(candidate(&spec()), &spec()).unwrap_err();
        assert_eq!(err.to_return_code(), -9);
    }

    #[test]
    fn test_reserve_once() {
        let mut q = EmissionQueue::new();
        q.reserve(2, 255).unwrap();
        let err = q.reserve(1, 255).unwrap_err();
        assert_eq!(err.to_return_code(), -8);
    }

    #[test]
    fn test_reserve_above_cap() {
        let mut q = EmissionQueue::new();
        let err = q.reserve(256, 255).unwrap_err();
        assert_eq!(err.to_return_code(), -3);
    }

    #[test]
    fn test_emission_respects_reservation() {
        let mut q = EmissionQueue::new();
        let spec = spec();
        q.reserve(2, 255).unwrap();
        q.emit(candidate(&spec), &spec).unwrap();
        q.emit(candidate(&spec), &spec).unwrap();
        let err = q.emit(candidate(&spec), &spec).unwrap_err();
        assert_eq!(err.to_return_code(), -13);
        assert_eq!(q.len(), 2);
    }

    #[test]
    fn test_reserve_zero_rejects_all_emits() {
        let mut q = EmissionQueue::new();
        let spec = spec();
        q.reserve(0, 255).unwrap();
        let err = q.emit(candidate(&spec), &spec).unwrap_err();
        assert_eq!(err.to_return_code(), -13);
    }

    #[test]
    fn test_emit_rejects_missing_details() {
        let mut q = EmissionQueue::new();
        let spec = spec();
        q.reserve(1, 255).unwrap();
        let plain = TxnBuilder::new(TxType::Payment).account(&[1u8; 20]).build();
        let err = q.emit(plain, &spec).unwrap_err();
        assert_eq!(err.to_return_code(), -11);
    }

    #[test]
    fn test_emit_rejects_wrong_generation() {
        let mut q = EmissionQueue::new();
        let spec = spec();
        q.reserve(1, 255).unwrap();
        let wrong = EmitSpec {
            generation: 9,
            ..spec.clone()
        };
        let err = q.emit(candidate(&wrong), &spec).unwrap_err();
        assert_eq!(err.to_return_code(), -11);
    }

    #[test]
    fn test_emit_rejects_garbage() {
        let mut q = EmissionQueue::new();
        q.reserve(1, 255).unwrap();
        let err = q.emit(vec![0xFF, 0xFF], &spec()).unwrap_err();
        assert_eq!(err.to_return_code(), -11);
    }

    #[test]
    fn test_drain_preserves_order() {
        let mut q = EmissionQueue::new();
        let spec = spec();
        q.reserve(2, 255).unwrap();
        let a = candidate(&spec);
        let b = TxnBuilder::new(TxType::Payment)
            .account(&[9u8; 20])
            .emit_details(&EmitDetails {
                generation: 1,
                burden: 2,
                parent_txn_id: spec.parent_txn_id,
                nonce: [0xDD; 32],
                callback: [9u8; 20],
            })
            .build();
        q.emit(a.clone(), &spec).unwrap();
        q.emit(b.clone(), &spec).unwrap();
        let drained = q.drain();
        assert_eq!(drained[0].blob, a);
        assert_eq!(drained[1].blob, b);
    }
}
