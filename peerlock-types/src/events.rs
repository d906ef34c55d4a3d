//! Notification event types
//!
//! Events consumed fire-and-forget by the external notification
//! dispatcher. The string form doubles as the webhook `event_type` field.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationEventType {
    DisputeOpened,
    DisputeClaimed,
    DisputeEscalated,
    DisputeRecommended,
    DisputeResolved,
}

impl NotificationEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationEventType::DisputeOpened => "dispute.opened",
            NotificationEventType::DisputeClaimed => "dispute.claimed",
            NotificationEventType::DisputeEscalated => "dispute.escalated",
            NotificationEventType::DisputeRecommended => "dispute.recommended",
            NotificationEventType::DisputeResolved => "dispute.resolved",
        }
    }
}

impl std::fmt::Display for NotificationEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
