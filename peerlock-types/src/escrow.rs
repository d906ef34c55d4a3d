//! Escrow lifecycle states
//!
//! The on-chain contract is the source of truth for funding and release;
//! the backend mirrors those states via the indexer and only drives the
//! dispute-related transitions itself.

use serde::{Deserialize, Serialize};

/// Mirrored escrow state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EscrowState {
    /// Offer published by the seller, no counterparty yet
    Created,
    /// A buyer took the offer
    Taken,
    /// Both sides locked funds on chain
    Funded,
    /// Buyer marked the fiat payment as sent
    PaymentConfirmed,
    /// A dispute is open on this escrow
    Disputed,
    /// Settled, either by release or by arbitration
    Resolved,
    /// Cancelled before completion
    Cancelled,
}

impl EscrowState {
    pub fn as_str(&self) -> &'static str {
        match self {
            EscrowState::Created => "CREATED",
            EscrowState::Taken => "TAKEN",
            EscrowState::Funded => "FUNDED",
            EscrowState::PaymentConfirmed => "PAYMENT_CONFIRMED",
            EscrowState::Disputed => "DISPUTED",
            EscrowState::Resolved => "RESOLVED",
            EscrowState::Cancelled => "CANCELLED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "CREATED" => Some(EscrowState::Created),
            "TAKEN" => Some(EscrowState::Taken),
            "FUNDED" => Some(EscrowState::Funded),
            "PAYMENT_CONFIRMED" => Some(EscrowState::PaymentConfirmed),
            "DISPUTED" => Some(EscrowState::Disputed),
            "RESOLVED" => Some(EscrowState::Resolved),
            "CANCELLED" => Some(EscrowState::Cancelled),
            _ => None,
        }
    }

    /// States from which a dispute may be opened.
    pub fn is_disputable(&self) -> bool {
        matches!(self, EscrowState::Funded | EscrowState::PaymentConfirmed)
    }
}

impl std::fmt::Display for EscrowState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
