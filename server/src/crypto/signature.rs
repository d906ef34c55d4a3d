//! Wallet signature verification
//!
//! Verifies EIP-191 `personal_sign` signatures: Keccak-256 over the
//! prefixed message, secp256k1 public key recovery from the 65-byte
//! r||s||v signature, then the recovered key's EVM address is compared
//! case-insensitively against the claimed address.
//!
//! Everything here is total: malformed signatures, bad recovery ids and
//! failed recoveries all yield `false`/`None`. Attacker-controlled input
//! must never produce an error path the login handler has to interpret.

use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use sha3::{Digest, Keccak256};

/// EIP-191 personal message digest.
///
/// `keccak256("\x19Ethereum Signed Message:\n" + len(message) + message)`
pub fn eip191_digest(message: &str) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(b"\x19Ethereum Signed Message:\n");
    hasher.update(message.len().to_string().as_bytes());
    hasher.update(message.as_bytes());
    hasher.finalize().into()
}

/// Derive the 0x-prefixed lowercase EVM address from a verifying key.
fn address_of(key: &VerifyingKey) -> String {
    let point = key.to_encoded_point(false);
    // Skip the 0x04 uncompressed-point tag
    let hash = Keccak256::digest(&point.as_bytes()[1..]);
    format!("0x{}", hex::encode(&hash[12..]))
}

/// Recover the signing address from a 65-byte r||s||v signature over the
/// given message. Returns `None` on any malformed input.
pub fn recover_signer(signature: &[u8], message: &str) -> Option<String> {
    if signature.len() != 65 {
        return None;
    }

    let sig = Signature::from_slice(&signature[..64]).ok()?;

    // Wallets emit v as 27/28; raw recovery ids are 0/1
    let v = signature[64];
    let recovery_byte = if v >= 27 { v - 27 } else { v };
    let recovery_id = RecoveryId::from_byte(recovery_byte)?;

    let digest = eip191_digest(message);
    let key = VerifyingKey::recover_from_prehash(&digest, &sig, recovery_id).ok()?;

    Some(address_of(&key))
}

/// Check that `signature_hex` is a valid signature over `message` by the
/// key controlling `claimed_address`.
///
/// Pure and deterministic; returns `false` for any malformed input.
pub fn verify_wallet_signature(signature_hex: &str, message: &str, claimed_address: &str) -> bool {
    let stripped = signature_hex.strip_prefix("0x").unwrap_or(signature_hex);
    let bytes = match hex::decode(stripped) {
        Ok(b) => b,
        Err(_) => return false,
    };

    match recover_signer(&bytes, message) {
        Some(recovered) => recovered.eq_ignore_ascii_case(claimed_address),
        None => false,
    }
}
