//! Wallet authentication handlers
//!
//! Challenge-response login: the client requests a nonce, signs the
//! canonical message with its wallet key, and exchanges the signature
//! for a time-boxed session token. No passwords, no accounts; the wallet
//! address is the identity.
//!
//! Every login failure returns a uniform 401. The response never reveals
//! whether the nonce was unknown, used, expired, or the signature bad —
//! specific causes go to the logs only.

use actix_web::{post, web, HttpMessage, HttpRequest, HttpResponse};
use peerlock_types::Role;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use validator::Validate;

use crate::crypto::signature::verify_wallet_signature;
use crate::db::DbPool;
use crate::error::ApiError;
use crate::logging::sanitize::sanitize_address;
use crate::middleware::AuthIdentity;
use crate::models::audit_event::{AuditAction, AuditEventBuilder};
use crate::models::role::RoleAssignment;
use crate::services::challenge::{build_challenge_message, NONCE_REJECTED};
use crate::services::{AuditService, ChallengeService, SessionIssuer};
use crate::validation::normalize_address;

#[derive(Debug, Validate, Deserialize)]
pub struct NonceRequest {
    #[validate(length(min = 42, max = 42))]
    pub address: String,
    pub chain_id: i64,
    #[validate(length(max = 128))]
    pub domain: Option<String>,
}

#[derive(Debug, Validate, Deserialize)]
pub struct LoginRequest {
    #[validate(length(min = 42, max = 42))]
    pub address: String,
    #[validate(length(min = 1, max = 128))]
    pub nonce: String,
    /// 65-byte r||s||v signature, hex, optionally 0x-prefixed
    #[validate(length(min = 130, max = 132))]
    pub signature: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub expires_at: String,
    pub address: String,
    pub roles: Vec<String>,
}

/// Issue a single-use login challenge.
#[post("/nonce")]
pub async fn request_nonce(
    challenges: web::Data<ChallengeService>,
    body: web::Json<NonceRequest>,
) -> Result<HttpResponse, ApiError> {
    body.validate()?;

    let challenge = challenges
        .issue(&body.address, body.chain_id, body.domain.as_deref())
        .await?;

    Ok(HttpResponse::Ok().json(challenge))
}

/// Exchange a signed challenge for a session token.
#[post("/login")]
pub async fn login(
    pool: web::Data<DbPool>,
    challenges: web::Data<ChallengeService>,
    issuer: web::Data<SessionIssuer>,
    audit: web::Data<AuditService>,
    body: web::Json<LoginRequest>,
    http_req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    body.validate()?;
    let address = normalize_address(&body.address)?;
    let request_id = AuditService::extract_request_id(&http_req);

    // Locate the live challenge; absent/used/expired all fail uniformly
    let record = challenges.find_valid(&address, &body.nonce).await?;

    // Rebuild the exact message the wallet was asked to sign
    let message = build_challenge_message(
        &record.domain,
        &record.address,
        record.chain_id,
        &body.nonce,
        &record.issued_at,
        &record.expires_at,
    );

    if !verify_wallet_signature(&body.signature, &message, &address) {
        warn!(
            address = %sanitize_address(&address),
            "Login signature verification failed"
        );
        audit.log_async(
            AuditEventBuilder::new(AuditAction::LoginFailed)
                .actor(&address)
                .request_id(request_id),
        );
        return Err(ApiError::Unauthorized(NONCE_REJECTED.to_string()));
    }

    // Signature is good; burn the nonce. Exactly one concurrent login
    // with the same nonce can pass this point.
    challenges.consume(&address, &body.nonce).await?;

    let roles = {
        let pool = pool.clone();
        let address = address.clone();
        web::block(move || {
            let mut conn = pool.get().map_err(ApiError::from)?;
            // Every authenticated wallet holds at least USER; the grant
            // is idempotent so repeat logins are a no-op
            RoleAssignment::assign(&mut conn, &address, Role::User, "system")
                .map_err(ApiError::from)?;
            RoleAssignment::roles_of(&mut conn, &address).map_err(ApiError::from)
        })
        .await??
    };

    let (token, expires_at) = issuer
        .mint(&address, &roles)
        .map_err(|e| ApiError::Internal(format!("Token minting failed: {e}")))?;

    audit
        .log(
            AuditEventBuilder::new(AuditAction::Login)
                .actor(&address)
                .request_id(request_id),
        )
        .await?;

    info!(address = %sanitize_address(&address), "Wallet login succeeded");

    Ok(HttpResponse::Ok().json(LoginResponse {
        access_token: token,
        expires_at: expires_at.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        address,
        roles: roles.iter().map(|r| r.as_str().to_string()).collect(),
    }))
}

/// POST /api/auth/logout
///
/// Audited logout. Tokens are stateless, so the client discards its copy;
/// the server records that the session ended. Wired as a plain fn so the
/// route can carry a `RequireAuth` wrap.
pub async fn logout(
    audit: web::Data<AuditService>,
    http_req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let identity = http_req
        .extensions()
        .get::<AuthIdentity>()
        .cloned()
        .ok_or_else(|| ApiError::Unauthorized("Authentication required".to_string()))?;

    audit.log_async(
        AuditEventBuilder::new(AuditAction::Logout)
            .actor(&identity.address)
            .request_id(AuditService::extract_request_id(&http_req)),
    );

    Ok(HttpResponse::Ok().json(serde_json::json!({ "logged_out": true })))
}

/// GET /api/auth/me — current identity with freshly read roles.
pub async fn me(pool: web::Data<DbPool>, http_req: HttpRequest) -> Result<HttpResponse, ApiError> {
    let identity = http_req
        .extensions()
        .get::<AuthIdentity>()
        .cloned()
        .ok_or_else(|| ApiError::Unauthorized("Authentication required".to_string()))?;

    let roles: Vec<Role> = {
        let pool = pool.clone();
        let address = identity.address.clone();
        web::block(move || {
            let mut conn = pool.get().map_err(ApiError::from)?;
            RoleAssignment::roles_of(&mut conn, &address).map_err(ApiError::from)
        })
        .await??
    };

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "address": identity.address,
        "roles": roles.iter().map(|r| r.as_str()).collect::<Vec<_>>(),
    })))
}
