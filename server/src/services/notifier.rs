//! Notification dispatcher
//!
//! Fire-and-forget event delivery to an external sink, signed with
//! HMAC-SHA256. Events are persisted per recipient before any delivery
//! attempt; the state machine never waits on, or fails because of, the
//! sink.
//!
//! Headers sent with each delivery:
//! - X-Peerlock-Signature: sha256=<hex(HMAC(secret, timestamp.payload))>
//! - X-Peerlock-Timestamp: Unix timestamp
//! - X-Peerlock-Event: event type (e.g. "dispute.opened")
//! - X-Peerlock-Delivery: unique delivery id

use hmac::{Hmac, Mac};
use peerlock_types::NotificationEventType;
use reqwest::Client;
use sha2::Sha256;
use std::time::Duration;
use uuid::Uuid;

use crate::config::NotifierConfig;
use crate::db::DbPool;
use crate::models::notification::Notification;

const DELIVERY_TIMEOUT_SECS: u64 = 10;

/// Wire payload delivered to the sink.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct EventPayload {
    #[serde(rename = "type")]
    pub event_type: String,
    pub escrow_id: String,
    pub sender: String,
    pub recipient: String,
    pub payload: serde_json::Value,
}

pub struct NotificationDispatcher {
    pool: DbPool,
    client: Client,
    config: NotifierConfig,
}

impl NotificationDispatcher {
    pub fn new(pool: DbPool, config: NotifierConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(DELIVERY_TIMEOUT_SECS))
            .user_agent("Peerlock-Notify/1.0")
            .build()
            .unwrap_or_default();

        Self {
            pool,
            client,
            config,
        }
    }

    /// Persist one notification per recipient, then deliver each in the
    /// background. Recipients with no address are skipped by the caller.
    ///
    /// Persistence runs on the blocking pool; only the delivery attempts
    /// are fire-and-forget.
    pub async fn dispatch(
        &self,
        event_type: NotificationEventType,
        escrow_id: &str,
        sender: &str,
        recipients: &[String],
        payload: serde_json::Value,
    ) {
        let pool = self.pool.clone();
        let escrow_id_owned = escrow_id.to_string();
        let sender_owned = sender.to_string();
        let recipients_owned = recipients.to_vec();
        let payload_owned = payload.clone();

        let persisted = actix_web::web::block(move || {
            let mut conn = match pool.get() {
                Ok(c) => c,
                Err(e) => {
                    tracing::error!("Notification persist failed, no connection: {e}");
                    return Vec::new();
                }
            };

            let mut stored = Vec::with_capacity(recipients_owned.len());
            for recipient in &recipients_owned {
                match Notification::insert(
                    &mut conn,
                    event_type,
                    &escrow_id_owned,
                    &sender_owned,
                    recipient,
                    &payload_owned,
                ) {
                    Ok(_) => stored.push(recipient.clone()),
                    Err(e) => tracing::error!(
                        escrow_id = %crate::logging::sanitize::sanitize_escrow_id(&escrow_id_owned),
                        "Failed to persist notification: {e}"
                    ),
                }
            }
            stored
        })
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Notification persist task failed: {e}");
            Vec::new()
        });

        for recipient in persisted {
            let event = EventPayload {
                event_type: event_type.as_str().to_string(),
                escrow_id: escrow_id.to_string(),
                sender: sender.to_string(),
                recipient,
                payload: payload.clone(),
            };
            self.deliver_async(event);
        }
    }

    fn deliver_async(&self, event: EventPayload) {
        let (sink_url, secret) = match (&self.config.sink_url, &self.config.signing_secret) {
            (Some(url), Some(secret)) => (url.clone(), secret.clone()),
            _ => {
                tracing::debug!(event_type = %event.event_type, "No notification sink configured");
                return;
            }
        };

        let client = self.client.clone();

        tokio::spawn(async move {
            let body = match serde_json::to_string(&event) {
                Ok(b) => b,
                Err(e) => {
                    tracing::error!("Failed to serialize notification payload: {e}");
                    return;
                }
            };

            let timestamp = chrono::Utc::now().timestamp().to_string();
            let signature = sign_payload(&secret, &timestamp, &body);
            let delivery_id = Uuid::new_v4().to_string();

            let result = client
                .post(&sink_url)
                .header("Content-Type", "application/json")
                .header("X-Peerlock-Signature", format!("sha256={signature}"))
                .header("X-Peerlock-Timestamp", &timestamp)
                .header("X-Peerlock-Event", &event.event_type)
                .header("X-Peerlock-Delivery", &delivery_id)
                .body(body)
                .send()
                .await;

            match result {
                Ok(resp) if resp.status().is_success() => {
                    tracing::debug!(
                        event_type = %event.event_type,
                        delivery_id = %delivery_id,
                        "Notification delivered"
                    );
                }
                Ok(resp) => {
                    tracing::warn!(
                        event_type = %event.event_type,
                        status = %resp.status(),
                        "Notification sink rejected delivery"
                    );
                }
                Err(e) => {
                    tracing::warn!(event_type = %event.event_type, "Notification delivery failed: {e}");
                }
            }
        });
    }
}

/// `hex(HMAC-SHA256(secret, "{timestamp}.{payload}"))`
fn sign_payload(secret: &str, timestamp: &str, payload: &str) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}
