//! Role definitions for the role registry
//!
//! Roles are append-only grants recorded per wallet address. The server
//! re-reads them from the registry on every privileged check, so these
//! values never act as trusted token claims.

use serde::{Deserialize, Serialize};

/// A role held by a wallet address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Default role granted on first login
    User,
    /// May claim, escalate and resolve disputes
    Arbitrator,
    /// May grant roles and inspect the audit trail
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Arbitrator => "ARBITRATOR",
            Role::Admin => "ADMIN",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "USER" => Some(Role::User),
            "ARBITRATOR" => Some(Role::Arbitrator),
            "ADMIN" => Some(Role::Admin),
            _ => None,
        }
    }

    /// Roles allowed to act on any escrow regardless of participation.
    pub fn is_privileged(&self) -> bool {
        matches!(self, Role::Arbitrator | Role::Admin)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
