//! Input validation at the API boundary
//!
//! Hex-shape checks for wallet addresses and escrow handles. These run
//! before any store access; a malformed identifier never reaches the
//! state machine.

use crate::error::ApiError;

/// Validate and normalize an EVM wallet address.
///
/// Accepts `0x` + exactly 40 hex characters in any case; returns the
/// lowercase form used as the canonical key everywhere in the store.
pub fn normalize_address(address: &str) -> Result<String, ApiError> {
    let hex_part = address
        .strip_prefix("0x")
        .ok_or_else(|| ApiError::BadRequest("Address must start with 0x".to_string()))?;

    if hex_part.len() != 40 || !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ApiError::BadRequest(
            "Address must be 0x followed by 40 hex characters".to_string(),
        ));
    }

    Ok(address.to_ascii_lowercase())
}

/// Validate an escrow handle: `0x` + exactly 64 hex characters (32 bytes).
pub fn validate_escrow_id(escrow_id: &str) -> Result<String, ApiError> {
    let hex_part = escrow_id
        .strip_prefix("0x")
        .ok_or_else(|| ApiError::BadRequest("Escrow id must start with 0x".to_string()))?;

    if hex_part.len() != 64 || !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ApiError::BadRequest(
            "Escrow id must be 0x followed by 64 hex characters".to_string(),
        ));
    }

    Ok(escrow_id.to_ascii_lowercase())
}
