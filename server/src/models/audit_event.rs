//! Audit event model
//!
//! Tamper-evident, append-only audit trail with hash chaining: each
//! record hashes its own fields plus the previous record's hash, so any
//! edit or deletion breaks the chain. Authorization logic never reads
//! this table; it exists for forensic reconstruction only.

use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::models::now_rfc3339;
use crate::schema::audit_events;

/// Who performed the action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorType {
    /// Authenticated wallet
    Wallet,
    /// System/automated process
    System,
    /// Unauthenticated caller
    Anonymous,
}

impl ActorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActorType::Wallet => "wallet",
            ActorType::System => "system",
            ActorType::Anonymous => "anonymous",
        }
    }
}

/// Audited action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Login,
    LoginFailed,
    Logout,
    RoleAssign,
    DisputeOpen,
    DisputeClaim,
    DisputeEscalate,
    DisputeRecommend,
    DisputeResolve,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Login => "login",
            AuditAction::LoginFailed => "login_failed",
            AuditAction::Logout => "logout",
            AuditAction::RoleAssign => "role_assign",
            AuditAction::DisputeOpen => "dispute_open",
            AuditAction::DisputeClaim => "dispute_claim",
            AuditAction::DisputeEscalate => "dispute_escalate",
            AuditAction::DisputeRecommend => "dispute_recommend",
            AuditAction::DisputeResolve => "dispute_resolve",
        }
    }
}

#[derive(Debug, Clone, Queryable, Serialize)]
#[diesel(table_name = audit_events)]
pub struct AuditEvent {
    pub id: String,
    pub timestamp: String,
    pub event_type: String,
    pub actor_address: Option<String>,
    pub actor_type: String,
    pub resource_type: Option<String>,
    pub resource_id: Option<String>,
    pub action: String,
    pub request_id: Option<String>,
    pub metadata: Option<String>,
    pub prev_hash: Option<String>,
    pub record_hash: String,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = audit_events)]
pub struct NewAuditEvent {
    pub id: String,
    pub timestamp: String,
    pub event_type: String,
    pub actor_address: Option<String>,
    pub actor_type: String,
    pub resource_type: Option<String>,
    pub resource_id: Option<String>,
    pub action: String,
    pub request_id: Option<String>,
    pub metadata: Option<String>,
    pub prev_hash: Option<String>,
    pub record_hash: String,
}

/// Builder for audit events.
#[derive(Debug, Clone)]
pub struct AuditEventBuilder {
    action: AuditAction,
    actor_address: Option<String>,
    actor_type: ActorType,
    resource_type: Option<String>,
    resource_id: Option<String>,
    request_id: Option<String>,
    metadata: Option<serde_json::Value>,
}

impl AuditEventBuilder {
    pub fn new(action: AuditAction) -> Self {
        Self {
            action,
            actor_address: None,
            actor_type: ActorType::Anonymous,
            resource_type: None,
            resource_id: None,
            request_id: None,
            metadata: None,
        }
    }

    pub fn actor(mut self, address: &str) -> Self {
        self.actor_address = Some(address.to_string());
        self.actor_type = ActorType::Wallet;
        self
    }

    pub fn system_actor(mut self) -> Self {
        self.actor_address = None;
        self.actor_type = ActorType::System;
        self
    }

    pub fn resource(mut self, resource_type: &str, resource_id: &str) -> Self {
        self.resource_type = Some(resource_type.to_string());
        self.resource_id = Some(resource_id.to_string());
        self
    }

    pub fn request_id(mut self, request_id: Option<String>) -> Self {
        self.request_id = request_id;
        self
    }

    pub fn metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Persist with chain linkage to `prev_hash`.
    pub fn build(
        self,
        conn: &mut SqliteConnection,
        prev_hash: Option<String>,
    ) -> QueryResult<AuditEvent> {
        let id = Uuid::new_v4().to_string();
        let timestamp = now_rfc3339();
        let metadata = self.metadata.map(|m| m.to_string());

        let record_hash = compute_record_hash(
            &id,
            &timestamp,
            self.action.as_str(),
            self.actor_address.as_deref(),
            self.resource_id.as_deref(),
            metadata.as_deref(),
            prev_hash.as_deref(),
        );

        let record = NewAuditEvent {
            id: id.clone(),
            timestamp,
            event_type: format!("audit.{}", self.action.as_str()),
            actor_address: self.actor_address,
            actor_type: self.actor_type.as_str().to_string(),
            resource_type: self.resource_type,
            resource_id: self.resource_id,
            action: self.action.as_str().to_string(),
            request_id: self.request_id,
            metadata,
            prev_hash,
            record_hash,
        };

        diesel::insert_into(audit_events::table)
            .values(&record)
            .execute(conn)?;

        audit_events::table.filter(audit_events::id.eq(&id)).first(conn)
    }
}

fn compute_record_hash(
    id: &str,
    timestamp: &str,
    action: &str,
    actor: Option<&str>,
    resource_id: Option<&str>,
    metadata: Option<&str>,
    prev_hash: Option<&str>,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(id.as_bytes());
    hasher.update(b"|");
    hasher.update(timestamp.as_bytes());
    hasher.update(b"|");
    hasher.update(action.as_bytes());
    hasher.update(b"|");
    hasher.update(actor.unwrap_or("").as_bytes());
    hasher.update(b"|");
    hasher.update(resource_id.unwrap_or("").as_bytes());
    hasher.update(b"|");
    hasher.update(metadata.unwrap_or("").as_bytes());
    hasher.update(b"|");
    hasher.update(prev_hash.unwrap_or("").as_bytes());
    hex::encode(hasher.finalize())
}

impl AuditEvent {
    /// Hash of the newest record, the chain head.
    pub fn last_hash(conn: &mut SqliteConnection) -> QueryResult<Option<String>> {
        audit_events::table
            .order(audit_events::timestamp.desc())
            .select(audit_events::record_hash)
            .first(conn)
            .optional()
    }

    /// Most recent events, newest first.
    pub fn recent(conn: &mut SqliteConnection, limit: i64) -> QueryResult<Vec<AuditEvent>> {
        audit_events::table
            .order(audit_events::timestamp.desc())
            .limit(limit)
            .load(conn)
    }

    pub fn count(conn: &mut SqliteConnection) -> QueryResult<i64> {
        use diesel::dsl::count_star;
        audit_events::table.select(count_star()).first(conn)
    }

    /// Walk the chain oldest-first and report ids whose stored hash does
    /// not recompute, or whose prev link is broken.
    pub fn verify_chain_integrity(conn: &mut SqliteConnection) -> QueryResult<Vec<String>> {
        let events: Vec<AuditEvent> = audit_events::table
            .order(audit_events::timestamp.asc())
            .load(conn)?;

        let mut broken = Vec::new();
        let mut expected_prev: Option<String> = None;

        for event in &events {
            let recomputed = compute_record_hash(
                &event.id,
                &event.timestamp,
                &event.action,
                event.actor_address.as_deref(),
                event.resource_id.as_deref(),
                event.metadata.as_deref(),
                event.prev_hash.as_deref(),
            );

            if recomputed != event.record_hash || event.prev_hash != expected_prev {
                broken.push(event.id.clone());
            }
            expected_prev = Some(event.record_hash.clone());
        }

        Ok(broken)
    }
}
