//! Notification sink configuration
//!
//! The dispatcher posts signed events to a single configured sink URL.
//! With no URL configured, events are still persisted and logged but
//! nothing leaves the process.

use anyhow::{bail, Result};

#[derive(Debug, Clone)]
pub struct NotifierConfig {
    /// Sink endpoint for fire-and-forget event delivery
    pub sink_url: Option<String>,
    /// HMAC-SHA256 signing secret for delivered payloads
    pub signing_secret: Option<String>,
}

impl NotifierConfig {
    /// Load from environment.
    ///
    /// Environment variables:
    /// - `NOTIFY_SINK_URL` (optional)
    /// - `NOTIFY_SIGNING_SECRET` (required when sink URL is set)
    pub fn from_env() -> Result<Self> {
        let sink_url = std::env::var("NOTIFY_SINK_URL").ok().filter(|s| !s.is_empty());
        let signing_secret = std::env::var("NOTIFY_SIGNING_SECRET")
            .ok()
            .filter(|s| !s.is_empty());

        if sink_url.is_some() && signing_secret.is_none() {
            bail!("NOTIFY_SIGNING_SECRET must be set when NOTIFY_SINK_URL is configured");
        }

        Ok(Self {
            sink_url,
            signing_secret,
        })
    }

    /// Delivery disabled; persistence only.
    pub fn disabled() -> Self {
        Self {
            sink_url: None,
            signing_secret: None,
        }
    }
}
