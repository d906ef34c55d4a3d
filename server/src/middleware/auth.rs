//! Authentication and role-gating middleware
//!
//! `RequireAuth` decodes the bearer token and attaches the caller's
//! identity to request extensions. `RequireRole` additionally re-queries
//! the role registry on every request: a role revoked after token
//! issuance is honored immediately, the token's role claims are never
//! trusted for privileged checks.
//!
//! # Usage
//! ```ignore
//! web::scope("/api/disputes")
//!     .service(
//!         web::resource("/{escrow_id}/resolve")
//!             .wrap(RequireRole::new(&[Role::Arbitrator]))
//!             .route(web::post().to(resolve_dispute)),
//!     )
//! ```

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    web, Error, HttpMessage,
};
use futures_util::future::LocalBoxFuture;
use peerlock_types::Role;
use std::future::{ready, Ready};
use std::rc::Rc;
use tracing::warn;

use crate::db::DbPool;
use crate::error::ApiError;
use crate::models::role::RoleAssignment;
use crate::services::SessionIssuer;

/// Authenticated caller, attached to request extensions.
#[derive(Debug, Clone)]
pub struct AuthIdentity {
    /// Normalized lowercase wallet address
    pub address: String,
    /// Roles as claimed in the token at issuance. Display only; the
    /// role-gated paths re-read the registry.
    pub token_roles: Vec<Role>,
}

/// Extract and decode the bearer token from the Authorization header.
fn identity_from_request(req: &ServiceRequest) -> Result<AuthIdentity, ApiError> {
    let header = req
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("Authentication required".to_string()))?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::Unauthorized("Malformed Authorization header".to_string()))?;

    let issuer = req
        .app_data::<web::Data<SessionIssuer>>()
        .ok_or_else(|| {
            warn!("Session issuer not found in app data");
            ApiError::Internal("Authentication configuration error".to_string())
        })?;

    let claims = issuer
        .decode(token)
        .ok_or_else(|| ApiError::Unauthorized("Invalid or expired session".to_string()))?;

    Ok(AuthIdentity {
        address: claims.address.to_ascii_lowercase(),
        token_roles: claims.claimed_roles(),
    })
}

/// Middleware requiring a valid, unexpired session token.
pub struct RequireAuth;

impl<S, B> Transform<S, ServiceRequest> for RequireAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = RequireAuthMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequireAuthMiddleware {
            service: Rc::new(service),
        }))
    }
}

pub struct RequireAuthMiddleware<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for RequireAuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let svc = self.service.clone();

        Box::pin(async move {
            let identity = identity_from_request(&req)?;
            req.extensions_mut().insert(identity);
            svc.call(req).await
        })
    }
}

/// Middleware requiring a valid token whose address currently holds at
/// least one of the required roles.
pub struct RequireRole {
    required: Vec<Role>,
}

impl RequireRole {
    pub fn new(required: &[Role]) -> Self {
        Self {
            required: required.to_vec(),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RequireRole
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = RequireRoleMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequireRoleMiddleware {
            service: Rc::new(service),
            required: self.required.clone(),
        }))
    }
}

pub struct RequireRoleMiddleware<S> {
    service: Rc<S>,
    required: Vec<Role>,
}

impl<S, B> Service<ServiceRequest> for RequireRoleMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let svc = self.service.clone();
        let required = self.required.clone();

        Box::pin(async move {
            let identity = identity_from_request(&req)?;

            let pool = req.app_data::<web::Data<DbPool>>().ok_or_else(|| {
                warn!("Database pool not found in app data");
                ApiError::Internal("Database configuration error".to_string())
            })?;

            // Fresh read of the registry; token claims are not trusted here
            let pool = pool.clone();
            let address = identity.address.clone();
            let current_roles = web::block(move || {
                let mut conn = pool.get().map_err(ApiError::from)?;
                RoleAssignment::roles_of(&mut conn, &address).map_err(ApiError::from)
            })
            .await
            .map_err(ApiError::from)??;

            if !required.iter().any(|r| current_roles.contains(r)) {
                warn!(
                    address = %crate::logging::sanitize::sanitize_address(&identity.address),
                    required = ?required,
                    "Insufficient role for gated route"
                );
                return Err(ApiError::Forbidden("Insufficient role".to_string()).into());
            }

            req.extensions_mut().insert(identity);
            svc.call(req).await
        })
    }
}
