//! Escrow/dispute state machine
//!
//! The sole writer path for dispute records and dispute-driven escrow
//! state changes. Every mutating operation runs the same sequence:
//! load the current records, authorize the caller against them with a
//! fresh role read, check the transition precondition, persist through a
//! conditional write, then audit and notify. A call rejected at the
//! authorization or precondition step leaves no audit entry and emits no
//! notification.
//!
//! Concurrency is settled by the store: `claim` races on
//! `arbitrator IS NULL`, escalation races on the level guard, and nonce
//! handling elsewhere follows the same conditional-update discipline.

use actix_web::web;
use peerlock_types::{
    AnalysisDocument, DisputeOutcome, DisputeStatus, EscrowState, NotificationEventType, Role,
};
use std::sync::Arc;

use crate::db::DbPool;
use crate::error::ApiError;
use crate::logging::sanitize::{sanitize_address, sanitize_escrow_id};
use crate::models::audit_event::{AuditAction, AuditEventBuilder};
use crate::models::dispute::Dispute;
use crate::models::escrow::Escrow;
use crate::models::role::RoleAssignment;
use crate::services::{AuditService, NotificationDispatcher};

/// Caller of a state-machine operation.
#[derive(Debug, Clone)]
pub struct Actor {
    /// Normalized lowercase wallet address
    pub address: String,
    /// Correlation id for the audit trail
    pub request_id: Option<String>,
}

#[derive(Clone)]
pub struct DisputeService {
    pool: DbPool,
    audit: AuditService,
    notifier: Arc<NotificationDispatcher>,
}

impl DisputeService {
    pub fn new(pool: DbPool, audit: AuditService, notifier: Arc<NotificationDispatcher>) -> Self {
        Self {
            pool,
            audit,
            notifier,
        }
    }

    /// Participant-or-privileged read of an escrow.
    pub async fn get_escrow(&self, escrow_id: &str, actor: &Actor) -> Result<Escrow, ApiError> {
        let pool = self.pool.clone();
        let escrow_id = escrow_id.to_string();
        let caller = actor.address.clone();

        web::block(move || {
            let mut conn = pool.get()?;
            let escrow = Escrow::find(&mut conn, &escrow_id)?
                .ok_or_else(|| ApiError::NotFound("Escrow not found".to_string()))?;
            let roles = RoleAssignment::roles_of(&mut conn, &caller)?;
            ensure_escrow_access(&escrow, &caller, &roles)?;
            Ok::<_, ApiError>(escrow)
        })
        .await?
    }

    /// Participant-or-privileged read of a dispute.
    pub async fn get_dispute(&self, escrow_id: &str, actor: &Actor) -> Result<Dispute, ApiError> {
        let pool = self.pool.clone();
        let escrow_id = escrow_id.to_string();
        let caller = actor.address.clone();

        web::block(move || {
            let mut conn = pool.get()?;
            let escrow = Escrow::find(&mut conn, &escrow_id)?
                .ok_or_else(|| ApiError::NotFound("Escrow not found".to_string()))?;
            let roles = RoleAssignment::roles_of(&mut conn, &caller)?;
            ensure_escrow_access(&escrow, &caller, &roles)?;
            Dispute::find(&mut conn, &escrow_id)?
                .ok_or_else(|| ApiError::NotFound("No dispute for this escrow".to_string()))
        })
        .await?
    }

    /// All disputes. Route-gated to ARBITRATOR|ADMIN.
    pub async fn list_disputes(&self) -> Result<Vec<Dispute>, ApiError> {
        let pool = self.pool.clone();
        web::block(move || {
            let mut conn = pool.get()?;
            Dispute::list(&mut conn).map_err(ApiError::from)
        })
        .await?
    }

    /// Open (or re-open) a dispute on a funded escrow.
    ///
    /// Forces escrow state to DISPUTED; the only other in-scope escrow
    /// mutation is the RESOLVED force in `resolve_dispute`.
    pub async fn open_dispute(
        &self,
        escrow_id: &str,
        reason_code: Option<String>,
        summary: Option<String>,
        actor: &Actor,
    ) -> Result<Dispute, ApiError> {
        let pool = self.pool.clone();
        let escrow_id_owned = escrow_id.to_string();
        let caller = actor.address.clone();
        let reason = reason_code.clone();
        let summ = summary.clone();

        let (dispute, escrow) = web::block(move || {
            let mut conn = pool.get()?;

            let escrow = Escrow::find(&mut conn, &escrow_id_owned)?
                .ok_or_else(|| ApiError::NotFound("Escrow not found".to_string()))?;

            let roles = RoleAssignment::roles_of(&mut conn, &caller)?;
            ensure_escrow_access(&escrow, &caller, &roles)?;

            // DISPUTED is accepted so a participant can amend an open
            // dispute; the upsert overwrites reason/summary
            let state = escrow
                .current_state()
                .ok_or_else(|| ApiError::Internal("Unknown escrow state".to_string()))?;
            if !state.is_disputable() && state != EscrowState::Disputed {
                return Err(ApiError::InvalidState(format!(
                    "Cannot open dispute while escrow is {state}"
                )));
            }

            use diesel::Connection;
            let dispute = conn.transaction::<_, ApiError, _>(|conn| {
                let forced = Escrow::set_state_if(
                    conn,
                    &escrow_id_owned,
                    &[
                        EscrowState::Funded,
                        EscrowState::PaymentConfirmed,
                        EscrowState::Disputed,
                    ],
                    EscrowState::Disputed,
                )?;
                if !forced {
                    // Raced with an external state change since the load
                    return Err(ApiError::InvalidState(
                        "Escrow left a disputable state".to_string(),
                    ));
                }
                Dispute::upsert_open(
                    conn,
                    &escrow_id_owned,
                    &caller,
                    reason.as_deref(),
                    summ.as_deref(),
                )?
                .ok_or_else(|| ApiError::InvalidState("Dispute already resolved".to_string()))
            })?;

            Ok::<_, ApiError>((dispute, escrow))
        })
        .await??;

        self.audit
            .log(
                AuditEventBuilder::new(AuditAction::DisputeOpen)
                    .actor(&actor.address)
                    .resource("escrow", escrow_id)
                    .request_id(actor.request_id.clone())
                    .metadata(serde_json::json!({
                        "reason_code": reason_code,
                        "status": dispute.status.clone(),
                    })),
            )
            .await?;

        // A privileged non-participant opener notifies both sides
        let recipients = match escrow.counterparty_of(&actor.address) {
            Some(counterparty) => vec![counterparty],
            None => escrow.participants(),
        };
        self.notifier
            .dispatch(
                NotificationEventType::DisputeOpened,
                escrow_id,
                &actor.address,
                &recipients,
                serde_json::json!({
                    "reason_code": reason_code,
                    "summary": summary,
                    "status": dispute.status.clone(),
                }),
            )
            .await;

        tracing::info!(
            escrow_id = %sanitize_escrow_id(escrow_id),
            opened_by = %sanitize_address(&actor.address),
            "Dispute opened"
        );

        Ok(dispute)
    }

    /// Claim an unassigned dispute. First claim wins.
    pub async fn claim_dispute(&self, escrow_id: &str, actor: &Actor) -> Result<Dispute, ApiError> {
        let pool = self.pool.clone();
        let escrow_id_owned = escrow_id.to_string();
        let caller = actor.address.clone();

        let (dispute, escrow) = web::block(move || {
            let mut conn = pool.get()?;

            let roles = RoleAssignment::roles_of(&mut conn, &caller)?;
            if !roles.contains(&Role::Arbitrator) {
                return Err(ApiError::Forbidden(
                    "Only arbitrators can claim disputes".to_string(),
                ));
            }

            let escrow = Escrow::find(&mut conn, &escrow_id_owned)?
                .ok_or_else(|| ApiError::NotFound("Escrow not found".to_string()))?;
            let existing = Dispute::find(&mut conn, &escrow_id_owned)?
                .ok_or_else(|| ApiError::NotFound("No dispute for this escrow".to_string()))?;
            if existing.arbitrator.is_some() {
                return Err(ApiError::AlreadyAssigned(
                    "Dispute already assigned to an arbitrator".to_string(),
                ));
            }

            let won = Dispute::claim(&mut conn, &escrow_id_owned, &caller)?;
            if !won {
                // Another arbitrator got there between the load and the update
                return Err(ApiError::AlreadyAssigned(
                    "Dispute already assigned to an arbitrator".to_string(),
                ));
            }

            let dispute = Dispute::find(&mut conn, &escrow_id_owned)?
                .ok_or_else(|| ApiError::Internal("Dispute vanished after claim".to_string()))?;
            Ok::<_, ApiError>((dispute, escrow))
        })
        .await??;

        self.audit
            .log(
                AuditEventBuilder::new(AuditAction::DisputeClaim)
                    .actor(&actor.address)
                    .resource("dispute", escrow_id)
                    .request_id(actor.request_id.clone()),
            )
            .await?;

        self.notifier
            .dispatch(
                NotificationEventType::DisputeClaimed,
                escrow_id,
                &actor.address,
                &escrow.participants(),
                serde_json::json!({ "status": dispute.status.clone() }),
            )
            .await;

        tracing::info!(
            escrow_id = %sanitize_escrow_id(escrow_id),
            arbitrator = %sanitize_address(&actor.address),
            "Dispute claimed"
        );

        Ok(dispute)
    }

    /// Escalate to a strictly higher review level.
    pub async fn escalate_dispute(
        &self,
        escrow_id: &str,
        new_level: i32,
        new_status: DisputeStatus,
        analysis: Option<AnalysisDocument>,
        actor: &Actor,
    ) -> Result<Dispute, ApiError> {
        let pool = self.pool.clone();
        let escrow_id_owned = escrow_id.to_string();
        let caller = actor.address.clone();
        let analysis_owned = analysis.clone();

        let (dispute, escrow) = web::block(move || {
            let mut conn = pool.get()?;

            let roles = RoleAssignment::roles_of(&mut conn, &caller)?;
            if !roles.iter().any(Role::is_privileged) {
                return Err(ApiError::Forbidden(
                    "Only arbitrators or admins can escalate disputes".to_string(),
                ));
            }

            let escrow = Escrow::find(&mut conn, &escrow_id_owned)?
                .ok_or_else(|| ApiError::NotFound("Escrow not found".to_string()))?;
            let existing = Dispute::find(&mut conn, &escrow_id_owned)?
                .ok_or_else(|| ApiError::NotFound("No dispute for this escrow".to_string()))?;
            if new_level <= existing.escalation_level {
                return Err(ApiError::InvalidEscalation(format!(
                    "Escalation level must exceed {}",
                    existing.escalation_level
                )));
            }

            let applied = Dispute::escalate(
                &mut conn,
                &escrow_id_owned,
                new_level,
                new_status,
                analysis_owned.as_ref(),
            )?;
            if !applied {
                return Err(ApiError::InvalidEscalation(
                    "Escalation level was raised concurrently".to_string(),
                ));
            }

            let dispute = Dispute::find(&mut conn, &escrow_id_owned)?.ok_or_else(|| {
                ApiError::Internal("Dispute vanished after escalation".to_string())
            })?;
            Ok::<_, ApiError>((dispute, escrow))
        })
        .await??;

        self.audit
            .log(
                AuditEventBuilder::new(AuditAction::DisputeEscalate)
                    .actor(&actor.address)
                    .resource("dispute", escrow_id)
                    .request_id(actor.request_id.clone())
                    .metadata(serde_json::json!({
                        "level": new_level,
                        "status": new_status.as_str(),
                    })),
            )
            .await?;

        self.notifier
            .dispatch(
                NotificationEventType::DisputeEscalated,
                escrow_id,
                &actor.address,
                &escrow.participants(),
                serde_json::json!({
                    "level": new_level,
                    "status": new_status.as_str(),
                }),
            )
            .await;

        tracing::info!(
            escrow_id = %sanitize_escrow_id(escrow_id),
            level = new_level,
            "Dispute escalated"
        );

        Ok(dispute)
    }

    /// Post a settlement recommendation. Leaves escrow state untouched.
    pub async fn add_recommendation(
        &self,
        escrow_id: &str,
        summary: String,
        note: Option<String>,
        actor: &Actor,
    ) -> Result<Dispute, ApiError> {
        let pool = self.pool.clone();
        let escrow_id_owned = escrow_id.to_string();
        let caller = actor.address.clone();
        let summary_owned = summary.clone();
        let note_owned = note.clone();

        let (dispute, escrow) = web::block(move || {
            let mut conn = pool.get()?;

            let roles = RoleAssignment::roles_of(&mut conn, &caller)?;
            if !roles.iter().any(Role::is_privileged) {
                return Err(ApiError::Forbidden(
                    "Only arbitrators or admins can post recommendations".to_string(),
                ));
            }

            let escrow = Escrow::find(&mut conn, &escrow_id_owned)?
                .ok_or_else(|| ApiError::NotFound("Escrow not found".to_string()))?;
            let existing = Dispute::find(&mut conn, &escrow_id_owned)?
                .ok_or_else(|| ApiError::NotFound("No dispute for this escrow".to_string()))?;

            // Non-destructive append onto whatever summary exists
            let mut combined = match existing.summary.as_deref() {
                Some(prior) if !prior.is_empty() => format!("{prior}\n\n{summary_owned}"),
                _ => summary_owned.clone(),
            };
            if let Some(note) = note_owned.as_deref() {
                combined.push_str("\nNote: ");
                combined.push_str(note);
            }

            let applied = Dispute::set_recommendation(&mut conn, &escrow_id_owned, &combined)?;
            if !applied {
                return Err(ApiError::InvalidState(
                    "Dispute already resolved".to_string(),
                ));
            }

            let dispute = Dispute::find(&mut conn, &escrow_id_owned)?.ok_or_else(|| {
                ApiError::Internal("Dispute vanished after recommendation".to_string())
            })?;
            Ok::<_, ApiError>((dispute, escrow))
        })
        .await??;

        self.audit
            .log(
                AuditEventBuilder::new(AuditAction::DisputeRecommend)
                    .actor(&actor.address)
                    .resource("dispute", escrow_id)
                    .request_id(actor.request_id.clone()),
            )
            .await?;

        self.notifier
            .dispatch(
                NotificationEventType::DisputeRecommended,
                escrow_id,
                &actor.address,
                &escrow.participants(),
                serde_json::json!({ "summary": dispute.summary.clone() }),
            )
            .await;

        Ok(dispute)
    }

    /// Resolve a dispute with a final outcome. Terminal for the dispute;
    /// forces the escrow projection to RESOLVED.
    pub async fn resolve_dispute(
        &self,
        escrow_id: &str,
        outcome: DisputeOutcome,
        resolution_ref: Option<String>,
        actor: &Actor,
    ) -> Result<Dispute, ApiError> {
        let pool = self.pool.clone();
        let escrow_id_owned = escrow_id.to_string();
        let caller = actor.address.clone();
        let ref_owned = resolution_ref.clone();

        let (dispute, escrow) = web::block(move || {
            let mut conn = pool.get()?;

            let roles = RoleAssignment::roles_of(&mut conn, &caller)?;
            if !roles.contains(&Role::Arbitrator) {
                return Err(ApiError::Forbidden(
                    "Only arbitrators can resolve disputes".to_string(),
                ));
            }

            let escrow = Escrow::find(&mut conn, &escrow_id_owned)?
                .ok_or_else(|| ApiError::NotFound("Escrow not found".to_string()))?;
            Dispute::find(&mut conn, &escrow_id_owned)?
                .ok_or_else(|| ApiError::NotFound("No dispute for this escrow".to_string()))?;

            use diesel::Connection;
            let dispute = conn.transaction::<_, ApiError, _>(|conn| {
                let applied = Dispute::resolve(
                    conn,
                    &escrow_id_owned,
                    outcome,
                    &caller,
                    ref_owned.as_deref(),
                )?;
                if !applied {
                    return Err(ApiError::InvalidState(
                        "Dispute already resolved".to_string(),
                    ));
                }
                Escrow::force_state(conn, &escrow_id_owned, EscrowState::Resolved)?;
                Dispute::find(conn, &escrow_id_owned)?.ok_or_else(|| {
                    ApiError::Internal("Dispute vanished after resolution".to_string())
                })
            })?;

            Ok::<_, ApiError>((dispute, escrow))
        })
        .await??;

        self.audit
            .log(
                AuditEventBuilder::new(AuditAction::DisputeResolve)
                    .actor(&actor.address)
                    .resource("dispute", escrow_id)
                    .request_id(actor.request_id.clone())
                    .metadata(serde_json::json!({
                        "outcome": outcome.as_str(),
                        "resolution_ref": resolution_ref,
                    })),
            )
            .await?;

        self.notifier
            .dispatch(
                NotificationEventType::DisputeResolved,
                escrow_id,
                &actor.address,
                &escrow.participants(),
                serde_json::json!({
                    "outcome": outcome.as_str(),
                    "resolution_ref": resolution_ref,
                }),
            )
            .await;

        tracing::info!(
            escrow_id = %sanitize_escrow_id(escrow_id),
            outcome = %outcome,
            "Dispute resolved"
        );

        Ok(dispute)
    }
}

/// Resource-level access: seller, buyer, or a privileged role.
///
/// Runs against the loaded record with freshly read roles, independent
/// of whatever route-level gate admitted the request.
pub fn ensure_escrow_access(
    escrow: &Escrow,
    caller: &str,
    fresh_roles: &[Role],
) -> Result<(), ApiError> {
    if escrow.is_participant(caller) || fresh_roles.iter().any(Role::is_privileged) {
        return Ok(());
    }

    Err(ApiError::Forbidden(
        "Not a participant in this escrow".to_string(),
    ))
}
