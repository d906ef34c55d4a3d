//! API error taxonomy
//!
//! Every failure that crosses the transport boundary is an `ApiError`;
//! handlers return `Result<HttpResponse, ApiError>` and the
//! `ResponseError` impl maps each variant to its status code.
//!
//! `Unauthorized` means the credential itself is missing, expired or
//! garbage (retry after re-authenticating); `Forbidden` means the
//! credential is fine but the privilege is not (not retryable).

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed address, escrow id or enum value
    #[error("{0}")]
    BadRequest(String),

    /// Missing, invalid or expired credential
    #[error("{0}")]
    Unauthorized(String),

    /// Valid credential, insufficient role or ownership
    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    /// Precondition on the resource's current state not met
    #[error("{0}")]
    InvalidState(String),

    /// Escalation level must strictly increase
    #[error("{0}")]
    InvalidEscalation(String),

    /// Dispute already claimed by another arbitrator
    #[error("{0}")]
    AlreadyAssigned(String),

    /// Lost a concurrent-mutation race; safe to retry after refetch
    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Internal(String),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InvalidState(_)
            | ApiError::InvalidEscalation(_)
            | ApiError::AlreadyAssigned(_)
            | ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        // Internal details never leak to the client
        let message = match self {
            ApiError::Internal(detail) => {
                tracing::error!(error = %detail, "Internal server error");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "error": message,
        }))
    }
}

impl From<actix_web::error::BlockingError> for ApiError {
    fn from(e: actix_web::error::BlockingError) -> Self {
        ApiError::Internal(format!("Blocking task failed: {e}"))
    }
}

impl From<diesel::result::Error> for ApiError {
    fn from(e: diesel::result::Error) -> Self {
        match e {
            diesel::result::Error::NotFound => ApiError::NotFound("Record not found".to_string()),
            diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::UniqueViolation,
                _,
            ) => ApiError::Conflict("Concurrent write conflict".to_string()),
            other => ApiError::Internal(format!("Database error: {other}")),
        }
    }
}

impl From<diesel::r2d2::PoolError> for ApiError {
    fn from(e: diesel::r2d2::PoolError) -> Self {
        ApiError::Internal(format!("Connection pool error: {e}"))
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(e: validator::ValidationErrors) -> Self {
        ApiError::BadRequest(format!("Validation failed: {e}"))
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        ApiError::Internal(format!("{e:#}"))
    }
}
