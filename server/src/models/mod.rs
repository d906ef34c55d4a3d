//! Database models
//!
//! Each model owns its table's queries; all writes to escrow/dispute rows
//! go through the dispute service, never directly through handlers.

pub mod audit_event;
pub mod dispute;
pub mod escrow;
pub mod nonce;
pub mod notification;
pub mod role;

/// RFC3339 timestamp at second precision, the canonical stored form.
pub fn now_rfc3339() -> String {
    chrono::Utc::now()
        .to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}
