//! Transactional stakeholder resolution.
//!
//! For each transaction type the table classifies the non-sender
//! stakeholder: `Rollback` stakeholders may veto the transaction,
//! `Collect` stakeholders only observe (their rollbacks are demoted),
//! `None` means no extra stakeholder. The sender always holds rollback
//! rights. Transaction types outside the table contribute no extra
//! stakeholders.

use hookvm_hostapi::LedgerView;
use hookvm_primitives::txn::TxnView;
use hookvm_primitives::types::{AccountId, TxType};

/// Stakeholder classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TshFlags {
    None = 0b000,
    Rollback = 0b001,
    Collect = 0b010,
}

/// The per-type stakeholder allowance table.
pub fn allowance(tx_type: TxType) -> TshFlags {
    use TxType::*;
    match tx_type {
        Payment => TshFlags::Rollback,
        EscrowCreate => TshFlags::Rollback,
        EscrowFinish => TshFlags::Rollback,
        AccountSet => TshFlags::None,
        EscrowCancel => TshFlags::Collect,
        SetRegularKey => TshFlags::None,
        OfferCreate => TshFlags::Collect,
        OfferCancel => TshFlags::None,
        TicketCreate => TshFlags::None,
        SignerListSet => TshFlags::Rollback,
        PaychanCreate => TshFlags::Rollback,
        PaychanFund => TshFlags::Collect,
        PaychanClaim => TshFlags::Collect,
        CheckCreate => TshFlags::Rollback,
        CheckCash => TshFlags::Rollback,
        CheckCancel => TshFlags::Collect,
        DepositPreauth => TshFlags::Rollback,
        TrustSet => TshFlags::Collect,
        AccountDelete => TshFlags::Rollback,
        HookSet => TshFlags::None,
    }
}

/// The ordered stakeholder list for a transaction: the sender first
/// (always with rollback rights), then the destination under the
/// table's classification when it exists on the ledger.
pub fn stakeholders(
    txn: &TxnView<'_>,
    ledger: &dyn LedgerView,
) -> Option<Vec<(AccountId, TshFlags)>> {
    let tx_type = txn.txn_type().ok()?;
    let sender = txn.account().ok()?;
    let mut out = vec![(sender, TshFlags::Rollback)];
    if let Some(destination) = txn.destination() {
        let rights = allowance(tx_type);
        if destination != sender
            && rights != TshFlags::None
            && ledger.account_exists(&destination)
        {
            out.push((destination, rights));
        }
    }
    Some(out)
}
