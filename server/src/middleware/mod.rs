//! Middleware for the Peerlock API
//!
//! - Authentication (RequireAuth for protected endpoints)
//! - Role gating (RequireRole with fresh role registry reads)
//! - Request ID tracing (X-Request-ID per request)

pub mod auth;
pub mod request_id;

pub use auth::{AuthIdentity, RequireAuth, RequireRole};
pub use request_id::{RequestId, RequestIdMiddleware};
