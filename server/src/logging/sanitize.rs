//! Log sanitization
//!
//! Wallet addresses and escrow handles are pseudonymous but correlatable;
//! logs keep only enough of each identifier to debug with.

/// Sanitize an EVM address for logs.
///
/// Format: "0xab...f01" (prefix + first 2 + last 3 hex chars)
pub fn sanitize_address(address: &str) -> String {
    if address.len() < 8 {
        return "<invalid-address>".to_string();
    }
    format!("{}...{}", &address[..4], &address[address.len() - 3..])
}

/// Sanitize a 32-byte escrow handle for logs.
///
/// Format: "0xdead...beef" (prefix + first 4 + last 4 hex chars)
pub fn sanitize_escrow_id(escrow_id: &str) -> String {
    if escrow_id.len() < 16 {
        return "<invalid-escrow-id>".to_string();
    }
    format!("{}...{}", &escrow_id[..6], &escrow_id[escrow_id.len() - 4..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_is_truncated() {
        let s = sanitize_address("0xabcdef0123456789abcdef0123456789abcdef01");
        assert_eq!(s, "0xab...f01");
    }

    #[test]
    fn escrow_id_is_truncated() {
        let id = format!("0x{}", "ab".repeat(32));
        let s = sanitize_escrow_id(&id);
        assert_eq!(s, "0xabab...abab");
    }

    #[test]
    fn short_inputs_do_not_panic() {
        assert_eq!(sanitize_address("0x1"), "<invalid-address>");
        assert_eq!(sanitize_escrow_id("0x1"), "<invalid-escrow-id>");
    }
}
