//! Core type aliases and protocol constants for the hook execution core.

/// 20-byte account identifier.
pub type AccountId = [u8; 20];

/// 32-byte hash used for hook hashes, transaction ids, state keys, and nonces.
pub type Hash256 = [u8; 32];

/// 256-bit tag partitioning an account's hook-state keyspace.
pub type NamespaceId = Hash256;

/// A zero-valued hash (32 zero bytes).
pub const ZERO_HASH: Hash256 = [0u8; 32];

/// A zero-valued account id (20 zero bytes).
pub const ZERO_ACCOUNT: AccountId = [0u8; 20];

/// Current hook API version. Install transactions carrying any other
/// version are rejected with `API_INVALID`.
pub const HOOK_API_VERSION: u32 = 0;

/// Maximum number of slots in one execution. Slot numbers are 1..=255.
pub const MAX_SLOTS: u32 = 255;

/// Maximum number of nonces one execution may draw.
pub const MAX_NONCES: u32 = 255;

/// Maximum emission reservation for one execution.
pub const MAX_EMIT: u32 = 255;

/// Maximum number of hook parameters per installation or install txn.
pub const MAX_PARAMS: usize = 16;

/// Maximum number of grants per installation.
pub const MAX_GRANTS: usize = 8;

/// Maximum installations in one account's hook chain.
pub const MAX_HOOK_CHAIN_LEN: usize = 10;

/// Maximum byte length of a hook-state value.
pub const MAX_STATE_DATA_LEN: usize = 128;

/// Maximum byte length of a hook-state key. Shorter keys are left-padded
/// with zeros to 32 bytes.
pub const MAX_STATE_KEY_LEN: usize = 32;

/// Maximum byte length of a hook parameter name. Shared bound with state
/// keys.
pub const MAX_PARAM_KEY_LEN: usize = 32;

/// Maximum byte length of a hook parameter value.
pub const MAX_PARAM_VALUE_LEN: usize = 256;

/// Maximum number of modified state entries per execution.
pub const MAX_STATE_MODIFICATIONS: usize = 256;

/// Maximum accepted hook bytecode size.
pub const MAX_WASM_LEN: usize = 0xFFFF;

/// Maximum byte length of an accept/rollback reason string.
pub const MAX_EXIT_REASON_LEN: usize = 32;

/// Byte length of a serialized keylet: 2-byte type prefix + 32-byte key.
pub const KEYLET_LEN: usize = 34;

/// Transaction types understood by the stakeholder table.
///
/// The discriminants are wire values carried in the `TransactionType`
/// field of a serialized transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u16)]
pub enum TxType {
    Payment = 0,
    EscrowCreate = 1,
    EscrowFinish = 2,
    AccountSet = 3,
    EscrowCancel = 4,
    SetRegularKey = 5,
    OfferCreate = 7,
    OfferCancel = 8,
    TicketCreate = 10,
    SignerListSet = 12,
    PaychanCreate = 13,
    PaychanFund = 14,
    PaychanClaim = 15,
    CheckCreate = 16,
    CheckCash = 17,
    CheckCancel = 18,
    DepositPreauth = 19,
    TrustSet = 20,
    AccountDelete = 21,
    HookSet = 22,
}

impl TxType {
    /// Decode a wire transaction-type value.
    pub fn from_u16(v: u16) -> Option<Self> {
        match v {
            0 => Some(Self::Payment),
            1 => Some(Self::EscrowCreate),
            2 => Some(Self::EscrowFinish),
            3 => Some(Self::AccountSet),
            4 => Some(Self::EscrowCancel),
            5 => Some(Self::SetRegularKey),
            7 => Some(Self::OfferCreate),
            8 => Some(Self::OfferCancel),
            10 => Some(Self::TicketCreate),
            12 => Some(Self::SignerListSet),
            13 => Some(Self::PaychanCreate),
            14 => Some(Self::PaychanFund),
            15 => Some(Self::PaychanClaim),
            16 => Some(Self::CheckCreate),
            17 => Some(Self::CheckCash),
            18 => Some(Self::CheckCancel),
            19 => Some(Self::DepositPreauth),
            20 => Some(Self::TrustSet),
            21 => Some(Self::AccountDelete),
            22 => Some(Self::HookSet),
            _ => None,
        }
    }

    /// Wire value of this transaction type.
    pub fn as_u16(self) -> u16 {
        self as u16
    }
}

/// Whether a hook with the given `HookOn` mask fires for a transaction type.
///
/// Bit `n` of the mask selects transaction type `n`. Install transactions
/// never trigger hooks regardless of the mask.
pub fn can_hook(tx_type: TxType, hook_on: u64) -> bool {
    if tx_type == TxType::HookSet {
        return false;
    }
    hook_on & (1u64 << (tx_type as u16 as u64)) != 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tx_type_roundtrip() {
        for v in 0u16..=22 {
            if let Some(tt) = TxType::from_u16(v) {
                assert_eq!(tt.as_u16(), v);
            }
        }
    }

    #[test]
    fn test_tx_type_unknown() {
        assert_eq!(TxType::from_u16(6), None); // retired nickname-set value
        assert_eq!(TxType::from_u16(9), None); // retired contract value
        assert_eq!(TxType::from_u16(999), None);
    }

    #[test]
    fn test_can_hook_mask_bit() {
        let mask = 1u64 << TxType::Payment.as_u16();
        assert!(can_hook(TxType::Payment, mask));
        assert!(!can_hook(TxType::TrustSet, mask));
    }

    #[test]
    fn test_can_hook_never_fires_on_install() {
        assert!(!can_hook(TxType::HookSet, u64::MAX));
    }
}
