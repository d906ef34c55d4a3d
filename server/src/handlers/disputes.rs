//! Dispute lifecycle handlers
//!
//! Plain async functions (no attribute macros) so routes can be wired
//! with per-resource `RequireRole` wraps in `main.rs`. The route-level
//! gate is a cheap first filter; the dispute service re-checks
//! authorization against the loaded records before any mutation.

use actix_web::{web, HttpMessage, HttpRequest, HttpResponse};
use peerlock_types::{AnalysisDocument, DisputeOutcome, DisputeStatus};
use serde::Deserialize;
use validator::Validate;

use crate::error::ApiError;
use crate::middleware::{AuthIdentity, RequestId};
use crate::services::dispute::{Actor, DisputeService};
use crate::validation::validate_escrow_id;

pub(crate) fn actor_from(http_req: &HttpRequest) -> Result<Actor, ApiError> {
    let identity = http_req
        .extensions()
        .get::<AuthIdentity>()
        .cloned()
        .ok_or_else(|| ApiError::Unauthorized("Authentication required".to_string()))?;
    let request_id = http_req
        .extensions()
        .get::<RequestId>()
        .map(|id| id.0.clone());

    Ok(Actor {
        address: identity.address,
        request_id,
    })
}

#[derive(Debug, Validate, Deserialize)]
pub struct OpenDisputeRequest {
    #[validate(length(max = 64))]
    pub reason_code: Option<String>,
    #[validate(length(max = 4096))]
    pub summary: Option<String>,
}

#[derive(Debug, Validate, Deserialize)]
pub struct EscalateRequest {
    pub level: i32,
    pub status: DisputeStatus,
    pub analysis: Option<AnalysisDocument>,
}

#[derive(Debug, Validate, Deserialize)]
pub struct RecommendationRequest {
    #[validate(length(min = 1, max = 4096))]
    pub summary: String,
    #[validate(length(max = 4096))]
    pub note: Option<String>,
}

#[derive(Debug, Validate, Deserialize)]
pub struct ResolveRequest {
    pub outcome: DisputeOutcome,
    #[validate(length(max = 128))]
    pub resolution_ref: Option<String>,
}

/// POST /api/escrows/{escrow_id}/dispute/open
pub async fn open_dispute(
    disputes: web::Data<DisputeService>,
    path: web::Path<String>,
    body: web::Json<OpenDisputeRequest>,
    http_req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let escrow_id = validate_escrow_id(path.as_str())?;
    body.validate()?;
    let actor = actor_from(&http_req)?;

    let dispute = disputes
        .open_dispute(
            &escrow_id,
            body.reason_code.clone(),
            body.summary.clone(),
            &actor,
        )
        .await?;

    Ok(HttpResponse::Created().json(dispute))
}

/// GET /api/disputes
pub async fn list_disputes(
    disputes: web::Data<DisputeService>,
) -> Result<HttpResponse, ApiError> {
    let all = disputes.list_disputes().await?;
    Ok(HttpResponse::Ok().json(all))
}

/// GET /api/disputes/{escrow_id}
pub async fn get_dispute(
    disputes: web::Data<DisputeService>,
    path: web::Path<String>,
    http_req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let escrow_id = validate_escrow_id(path.as_str())?;
    let actor = actor_from(&http_req)?;

    let dispute = disputes.get_dispute(&escrow_id, &actor).await?;
    Ok(HttpResponse::Ok().json(dispute))
}

/// POST /api/disputes/{escrow_id}/claim
pub async fn claim_dispute(
    disputes: web::Data<DisputeService>,
    path: web::Path<String>,
    http_req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let escrow_id = validate_escrow_id(path.as_str())?;
    let actor = actor_from(&http_req)?;

    let dispute = disputes.claim_dispute(&escrow_id, &actor).await?;
    Ok(HttpResponse::Ok().json(dispute))
}

/// POST /api/disputes/{escrow_id}/escalate
pub async fn escalate_dispute(
    disputes: web::Data<DisputeService>,
    path: web::Path<String>,
    body: web::Json<EscalateRequest>,
    http_req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let escrow_id = validate_escrow_id(path.as_str())?;
    body.validate()?;
    let actor = actor_from(&http_req)?;

    if body.level < 1 {
        return Err(ApiError::BadRequest(
            "Escalation level must be positive".to_string(),
        ));
    }

    let dispute = disputes
        .escalate_dispute(
            &escrow_id,
            body.level,
            body.status,
            body.analysis.clone(),
            &actor,
        )
        .await?;

    Ok(HttpResponse::Ok().json(dispute))
}

/// POST /api/disputes/{escrow_id}/recommendation
pub async fn add_recommendation(
    disputes: web::Data<DisputeService>,
    path: web::Path<String>,
    body: web::Json<RecommendationRequest>,
    http_req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let escrow_id = validate_escrow_id(path.as_str())?;
    body.validate()?;
    let actor = actor_from(&http_req)?;

    let dispute = disputes
        .add_recommendation(&escrow_id, body.summary.clone(), body.note.clone(), &actor)
        .await?;

    Ok(HttpResponse::Ok().json(dispute))
}

/// POST /api/disputes/{escrow_id}/resolve
pub async fn resolve_dispute(
    disputes: web::Data<DisputeService>,
    path: web::Path<String>,
    body: web::Json<ResolveRequest>,
    http_req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let escrow_id = validate_escrow_id(path.as_str())?;
    body.validate()?;
    let actor = actor_from(&http_req)?;

    let dispute = disputes
        .resolve_dispute(
            &escrow_id,
            body.outcome,
            body.resolution_ref.clone(),
            &actor,
        )
        .await?;

    Ok(HttpResponse::Ok().json(dispute))
}
