//! Audit service
//!
//! Centralized append-only audit logging with hash chaining. The chain
//! head is held behind a mutex so concurrent writers link correctly.
//! Nothing in the authorization path ever reads what this writes.

use actix_web::HttpRequest;
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::db::DbPool;
use crate::models::audit_event::{AuditEvent, AuditEventBuilder};

#[derive(Clone)]
pub struct AuditService {
    pool: DbPool,
    /// Chain head; serialized across writers
    last_hash: Arc<Mutex<Option<String>>>,
}

/// Chain verification result.
#[derive(Debug, serde::Serialize)]
pub struct IntegrityReport {
    pub is_valid: bool,
    pub broken_links: Vec<String>,
    pub checked_at: String,
}

impl AuditService {
    pub fn new(pool: DbPool) -> Self {
        Self {
            pool,
            last_hash: Arc::new(Mutex::new(None)),
        }
    }

    /// Load the chain head from the store. Call once at startup.
    pub async fn initialize(&self) -> Result<()> {
        let mut conn = self.pool.get().context("Failed to get DB connection")?;
        let hash = AuditEvent::last_hash(&mut conn)?;
        let mut last_hash = self.last_hash.lock().await;
        *last_hash = hash;
        Ok(())
    }

    /// Append an event, linking it to the current chain head.
    pub async fn log(&self, builder: AuditEventBuilder) -> Result<AuditEvent> {
        let mut conn = self.pool.get().context("Failed to get DB connection")?;
        let mut last_hash = self.last_hash.lock().await;

        let event = builder.build(&mut conn, last_hash.clone())?;
        *last_hash = Some(event.record_hash.clone());

        Ok(event)
    }

    /// Fire-and-forget append for non-critical events (logout and the
    /// like); failures are logged, never surfaced.
    pub fn log_async(&self, builder: AuditEventBuilder) {
        let pool = self.pool.clone();
        let last_hash = self.last_hash.clone();

        tokio::spawn(async move {
            let result = async {
                let mut conn = pool.get().context("Failed to get DB connection")?;
                let mut hash_guard = last_hash.lock().await;
                let event = builder.build(&mut conn, hash_guard.clone())?;
                *hash_guard = Some(event.record_hash.clone());
                Ok::<_, anyhow::Error>(())
            }
            .await;

            if let Err(e) = result {
                tracing::error!("Failed to log audit event: {e:#}");
            }
        });
    }

    /// X-Request-ID from the incoming request, if any.
    pub fn extract_request_id(req: &HttpRequest) -> Option<String> {
        req.headers()
            .get("x-request-id")
            .and_then(|h| h.to_str().ok())
            .map(|s| s.to_string())
    }

    /// Verify audit chain integrity.
    pub async fn verify_integrity(&self) -> Result<IntegrityReport> {
        let mut conn = self.pool.get().context("Failed to get DB connection")?;
        let broken_links = AuditEvent::verify_chain_integrity(&mut conn)?;

        Ok(IntegrityReport {
            is_valid: broken_links.is_empty(),
            broken_links,
            checked_at: crate::models::now_rfc3339(),
        })
    }
}
