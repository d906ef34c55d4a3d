//! Dispute lifecycle types
//!
//! Dispute status is a closed set: escalation may move a dispute to
//! `Escalated` but cannot invent free-form statuses, and `Resolved` is
//! terminal.

use serde::{Deserialize, Serialize};

/// Dispute status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DisputeStatus {
    /// Opened by a participant, waiting for an arbitrator
    Open,
    /// Claimed by an arbitrator
    InProgress,
    /// An arbitrator posted a settlement recommendation
    Recommended,
    /// Escalated to a higher review tier
    Escalated,
    /// Terminal: outcome recorded
    Resolved,
}

impl DisputeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisputeStatus::Open => "OPEN",
            DisputeStatus::InProgress => "IN_PROGRESS",
            DisputeStatus::Recommended => "RECOMMENDED",
            DisputeStatus::Escalated => "ESCALATED",
            DisputeStatus::Resolved => "RESOLVED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "OPEN" => Some(DisputeStatus::Open),
            "IN_PROGRESS" => Some(DisputeStatus::InProgress),
            "RECOMMENDED" => Some(DisputeStatus::Recommended),
            "ESCALATED" => Some(DisputeStatus::Escalated),
            "RESOLVED" => Some(DisputeStatus::Resolved),
            _ => None,
        }
    }
}

impl std::fmt::Display for DisputeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final arbitration outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DisputeOutcome {
    BuyerWins,
    SellerWins,
}

impl DisputeOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisputeOutcome::BuyerWins => "BUYER_WINS",
            DisputeOutcome::SellerWins => "SELLER_WINS",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "BUYER_WINS" => Some(DisputeOutcome::BuyerWins),
            "SELLER_WINS" => Some(DisputeOutcome::SellerWins),
            _ => None,
        }
    }
}

impl std::fmt::Display for DisputeOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque, versioned analysis document attached to a dispute.
///
/// Stored as JSON text; the server never interprets the body, only the
/// schema tag, so storage and retrieval stay total functions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisDocument {
    /// Schema identifier, e.g. "dispute-analysis/v1"
    pub schema: String,
    /// Raw document body, uninterpreted
    pub body: String,
}
