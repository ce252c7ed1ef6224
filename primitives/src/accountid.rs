//! Base58 account-id codec.
//!
//! Addresses use the ripple base58 alphabet with a leading version byte
//! of zero and a 4-byte double-SHA-256 checksum.

use crate::error::HookReturnCode;
use crate::types::AccountId;

const ACCOUNT_ID_VERSION: u8 = 0x00;

/// Encode a 20-byte account id into its r-address form.
pub fn encode_raddr(account: &AccountId) -> String {
    bs58::encode(account)
        .with_alphabet(bs58::Alphabet::RIPPLE)
        .with_check_version(ACCOUNT_ID_VERSION)
        .into_string()
}

/// Decode an r-address back into a 20-byte account id.
pub fn decode_raddr(address: &str) -> Result<AccountId, HookReturnCode> {
    let bytes = bs58::decode(address)
        .with_alphabet(bs58::Alphabet::RIPPLE)
        .with_check(Some(ACCOUNT_ID_VERSION))
        .into_vec()
        .map_err(|_| HookReturnCode::InvalidAccount)?;
    // with_check keeps the version byte at the front
    if bytes.len() != 21 {
        return Err(HookReturnCode::InvalidAccount);
    }
    bytes[1..]
        .try_into()
        .map_err(|_| HookReturnCode::InvalidAccount)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_law() {
        for seed in [0u8, 1, 0x7F, 0xFF] {
            let account = [seed; 20];
            let addr = encode_raddr(&account);
            assert_eq!(decode_raddr(&addr).unwrap(), account);
        }
    }

    #[test]
    fn test_addresses_start_with_r() {
        // Version byte zero maps to 'r' in the ripple alphabet.
        let addr = encode_raddr(&[3u8; 20]);
        assert!(addr.starts_with('r'), "got {addr}");
    }

    #[test]
    fn test_decode_rejects_bad_checksum() {
        let mut addr = encode_raddr(&[5u8; 20]);
        let last = addr.pop().unwrap();
        addr.push(if last == 'r' { 'p' } else { 'r' });
        assert_eq!(decode_raddr(&addr), Err(HookReturnCode::InvalidAccount));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert_eq!(decode_raddr(""), Err(HookReturnCode::InvalidAccount));
        assert_eq!(decode_raddr("0OIl"), Err(HookReturnCode::InvalidAccount));
        assert_eq!(decode_raddr("rrrr"), Err(HookReturnCode::InvalidAccount));
    }
}
