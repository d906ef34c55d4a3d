//! Admin handlers
//!
//! Role assignment and audit-trail inspection. Routes are gated with
//! `RequireRole::new(&[Role::Admin])`; the registry read happens inside
//! the middleware on every request.

use actix_web::{web, HttpMessage, HttpRequest, HttpResponse};
use peerlock_types::Role;
use serde::Deserialize;
use tracing::info;
use validator::Validate;

use crate::db::DbPool;
use crate::error::ApiError;
use crate::logging::sanitize::sanitize_address;
use crate::middleware::AuthIdentity;
use crate::models::audit_event::{AuditAction, AuditEvent, AuditEventBuilder};
use crate::models::role::RoleAssignment;
use crate::services::AuditService;
use crate::validation::normalize_address;

const DEFAULT_AUDIT_PAGE: i64 = 50;
const MAX_AUDIT_PAGE: i64 = 500;

#[derive(Debug, Validate, Deserialize)]
pub struct AssignRoleRequest {
    #[validate(length(min = 42, max = 42))]
    pub address: String,
    /// "USER", "ARBITRATOR" or "ADMIN"
    pub role: String,
}

#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    pub limit: Option<i64>,
}

/// POST /api/admin/roles
pub async fn assign_role(
    pool: web::Data<DbPool>,
    audit: web::Data<AuditService>,
    body: web::Json<AssignRoleRequest>,
    http_req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    body.validate()?;
    let identity = http_req
        .extensions()
        .get::<AuthIdentity>()
        .cloned()
        .ok_or_else(|| ApiError::Unauthorized("Authentication required".to_string()))?;

    let address = normalize_address(&body.address)?;
    let role = Role::from_str(&body.role)
        .ok_or_else(|| ApiError::BadRequest(format!("Unknown role: {}", body.role)))?;

    let assignment = {
        let pool = pool.clone();
        let address = address.clone();
        let grantor = identity.address.clone();
        web::block(move || {
            let mut conn = pool.get().map_err(ApiError::from)?;
            RoleAssignment::assign(&mut conn, &address, role, &grantor).map_err(ApiError::from)
        })
        .await??
    };

    audit
        .log(
            AuditEventBuilder::new(AuditAction::RoleAssign)
                .actor(&identity.address)
                .resource("role_assignment", &assignment.id)
                .request_id(AuditService::extract_request_id(&http_req))
                .metadata(serde_json::json!({
                    "grantee": address,
                    "role": role.as_str(),
                })),
        )
        .await?;

    info!(
        grantee = %sanitize_address(&address),
        role = %role,
        granted_by = %sanitize_address(&identity.address),
        "Role assigned"
    );

    Ok(HttpResponse::Created().json(assignment))
}

/// GET /api/admin/audit
pub async fn recent_audit_events(
    pool: web::Data<DbPool>,
    query: web::Query<AuditQuery>,
) -> Result<HttpResponse, ApiError> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_AUDIT_PAGE)
        .clamp(1, MAX_AUDIT_PAGE);

    let events = web::block(move || {
        let mut conn = pool.get().map_err(ApiError::from)?;
        AuditEvent::recent(&mut conn, limit).map_err(ApiError::from)
    })
    .await??;

    Ok(HttpResponse::Ok().json(events))
}

/// GET /api/admin/audit/integrity
pub async fn audit_integrity(audit: web::Data<AuditService>) -> Result<HttpResponse, ApiError> {
    let report = audit.verify_integrity().await?;
    Ok(HttpResponse::Ok().json(report))
}
