//! Authentication configuration
//!
//! Nonce and session lifetimes plus the token signing secret. The secret
//! is required: there is no insecure default, startup fails without it.

use anyhow::{bail, Context, Result};

/// Default nonce TTL: 10 minutes
const DEFAULT_NONCE_TTL_SECS: i64 = 600;

/// Default session TTL: 15 minutes
const DEFAULT_SESSION_TTL_SECS: i64 = 900;

/// Clock skew tolerated when validating session tokens
pub const SESSION_CLOCK_LEEWAY_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Challenge domain embedded in the sign-in message
    pub challenge_domain: String,
    /// Lifetime of an issued nonce, in seconds
    pub nonce_ttl_secs: i64,
    /// Lifetime of a minted session token, in seconds
    pub session_ttl_secs: i64,
    /// HMAC secret for session token signing
    pub session_secret: String,
}

impl AuthConfig {
    /// Load configuration from environment.
    ///
    /// Environment variables:
    /// - `AUTH_CHALLENGE_DOMAIN` (default "peerlock.app")
    /// - `AUTH_NONCE_TTL_SECS` (default 600)
    /// - `AUTH_SESSION_TTL_SECS` (default 900)
    /// - `AUTH_SESSION_SECRET` (required, min 32 bytes)
    pub fn from_env() -> Result<Self> {
        let challenge_domain = std::env::var("AUTH_CHALLENGE_DOMAIN")
            .unwrap_or_else(|_| "peerlock.app".to_string());

        let nonce_ttl_secs = std::env::var("AUTH_NONCE_TTL_SECS")
            .ok()
            .map(|s| s.parse::<i64>())
            .transpose()
            .context("AUTH_NONCE_TTL_SECS must be an integer")?
            .unwrap_or(DEFAULT_NONCE_TTL_SECS);

        let session_ttl_secs = std::env::var("AUTH_SESSION_TTL_SECS")
            .ok()
            .map(|s| s.parse::<i64>())
            .transpose()
            .context("AUTH_SESSION_TTL_SECS must be an integer")?
            .unwrap_or(DEFAULT_SESSION_TTL_SECS);

        let session_secret =
            std::env::var("AUTH_SESSION_SECRET").context("AUTH_SESSION_SECRET must be set")?;

        if session_secret.len() < 32 {
            bail!("AUTH_SESSION_SECRET must be at least 32 bytes");
        }

        if nonce_ttl_secs <= 0 || session_ttl_secs <= 0 {
            bail!("Auth TTLs must be positive");
        }

        Ok(Self {
            challenge_domain,
            nonce_ttl_secs,
            session_ttl_secs,
            session_secret,
        })
    }

    /// Fixed configuration for tests.
    pub fn for_tests() -> Self {
        Self {
            challenge_domain: "test.peerlock.app".to_string(),
            nonce_ttl_secs: DEFAULT_NONCE_TTL_SECS,
            session_ttl_secs: DEFAULT_SESSION_TTL_SECS,
            session_secret: "0123456789abcdef0123456789abcdef".to_string(),
        }
    }
}
