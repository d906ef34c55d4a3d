//! Session token issuance and verification
//!
//! Time-boxed HS256 tokens carrying the authenticated address and the
//! roles it held at login. Role claims in the token are display hints
//! only; privileged checks re-read the role registry.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use peerlock_types::Role;
use serde::{Deserialize, Serialize};

use crate::config::auth::SESSION_CLOCK_LEEWAY_SECS;
use crate::config::AuthConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject: the authenticated wallet address
    pub sub: String,
    pub address: String,
    pub roles: Vec<String>,
    pub iat: i64,
    pub exp: i64,
}

impl SessionClaims {
    /// Roles as claimed at issuance. Display only, never a privilege.
    pub fn claimed_roles(&self) -> Vec<Role> {
        self.roles.iter().filter_map(|r| Role::from_str(r)).collect()
    }
}

/// Mints and decodes session tokens.
#[derive(Clone)]
pub struct SessionIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl_secs: i64,
}

impl SessionIssuer {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.session_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.session_secret.as_bytes()),
            ttl_secs: config.session_ttl_secs,
        }
    }

    /// Mint a token for an authenticated address.
    pub fn mint(
        &self,
        address: &str,
        roles: &[Role],
    ) -> Result<(String, DateTime<Utc>), jsonwebtoken::errors::Error> {
        let now = Utc::now();
        let expires_at = now + Duration::seconds(self.ttl_secs);

        let claims = SessionClaims {
            sub: address.to_string(),
            address: address.to_string(),
            roles: roles.iter().map(|r| r.as_str().to_string()).collect(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?;
        Ok((token, expires_at))
    }

    /// Decode a presented token; fails closed.
    ///
    /// Signature mismatch, malformed structure and past expiry all yield
    /// `None` — never a partial payload.
    pub fn decode(&self, token: &str) -> Option<SessionClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = SESSION_CLOCK_LEEWAY_SECS;

        decode::<SessionClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .ok()
    }
}
