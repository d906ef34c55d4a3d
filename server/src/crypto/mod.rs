//! Cryptographic primitives for wallet authentication

pub mod signature;

pub use signature::{eip191_digest, recover_signer, verify_wallet_signature};
