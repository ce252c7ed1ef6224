//! Cryptographic helpers for the hook execution core.
//!
//! All hashing in the core is SHA-512/256 half: the first 32 bytes of a
//! SHA-512 digest. Signature verification dispatches on the public-key
//! prefix: `0xED` selects Ed25519, `0x02`/`0x03` selects secp256k1 ECDSA.
//! Everything here is deterministic.

use sha2::{Digest, Sha512};

use crate::types::Hash256;

/// First half of SHA-512 over the input.
pub fn sha512h(data: &[u8]) -> Hash256 {
    let digest = Sha512::digest(data);
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest[..32]);
    out
}

/// First half of SHA-512 over the concatenation of several parts.
pub fn sha512h_concat(parts: &[&[u8]]) -> Hash256 {
    let mut hasher = Sha512::new();
    for p in parts {
        hasher.update(p);
    }
    let digest = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest[..32]);
    out
}

/// Verify a signature over `message` with a prefixed public key.
///
/// Returns `false` for malformed keys or signatures; never panics.
pub fn verify(message: &[u8], signature: &[u8], public_key: &[u8]) -> bool {
    match public_key.first() {
        Some(0xED) if public_key.len() == 33 => {
            use ed25519_dalek::{Signature, Verifier, VerifyingKey};
            let Ok(key_bytes) = <[u8; 32]>::try_from(&public_key[1..]) else {
                return false;
            };
            let Ok(vk) = VerifyingKey::from_bytes(&key_bytes) else {
                return false;
            };
            let Ok(sig_bytes) = <[u8; 64]>::try_from(signature) else {
                return false;
            };
            let sig = Signature::from_bytes(&sig_bytes);
            vk.verify(message, &sig).is_ok()
        }
        Some(0x02 | 0x03) if public_key.len() == 33 => {
            use k256::ecdsa::signature::Verifier;
            use k256::ecdsa::{Signature, VerifyingKey};
            let Ok(vk) = VerifyingKey::from_sec1_bytes(public_key) else {
                return false;
            };
            let sig = match Signature::from_der(signature) {
                Ok(s) => s,
                Err(_) => match Signature::from_slice(signature) {
                    Ok(s) => s,
                    Err(_) => return false,
                },
            };
            vk.verify(message, &sig).is_ok()
        }
        _ => false,
    }
}
