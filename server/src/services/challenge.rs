//! Login challenge issuance and consumption
//!
//! Issues single-use nonces and builds the canonical message the wallet
//! signs. The message is rebuilt at login time from the stored record
//! plus the presented raw nonce, so construction must stay byte-stable:
//! do not reorder or reformat lines here without invalidating every
//! in-flight challenge.

use actix_web::web;
use chrono::{Duration, SecondsFormat, Utc};
use rand::RngCore;
use serde::Serialize;

use crate::config::AuthConfig;
use crate::db::DbPool;
use crate::error::ApiError;
use crate::models::nonce::AuthNonce;

/// Raw nonce entropy in bytes (hex-encoded on the wire).
const NONCE_ENTROPY_BYTES: usize = 16;

/// Uniform client-facing failure for every nonce problem: absent, used,
/// expired, wrong address. Specific causes are logged, never returned.
pub const NONCE_REJECTED: &str = "Invalid or missing nonce";

#[derive(Debug, Clone, Serialize)]
pub struct IssuedChallenge {
    pub nonce: String,
    pub message: String,
    pub issued_at: String,
    pub expires_at: String,
    pub domain: String,
    pub chain_id: i64,
}

/// Canonical sign-in message. Byte-stable between issuance and login.
pub fn build_challenge_message(
    domain: &str,
    address: &str,
    chain_id: i64,
    nonce: &str,
    issued_at: &str,
    expires_at: &str,
) -> String {
    format!(
        "{domain} wants you to sign in with your wallet:\n\
         {address}\n\
         \n\
         Chain ID: {chain_id}\n\
         Nonce: {nonce}\n\
         Issued At: {issued_at}\n\
         Expires At: {expires_at}"
    )
}

#[derive(Clone)]
pub struct ChallengeService {
    pool: DbPool,
    config: AuthConfig,
}

impl ChallengeService {
    pub fn new(pool: DbPool, config: AuthConfig) -> Self {
        Self { pool, config }
    }

    pub fn domain(&self) -> &str {
        &self.config.challenge_domain
    }

    /// Issue a fresh challenge for an address.
    ///
    /// Only the hash of the nonce is stored; the raw value is returned
    /// once and never again.
    pub async fn issue(
        &self,
        address: &str,
        chain_id: i64,
        domain: Option<&str>,
    ) -> Result<IssuedChallenge, ApiError> {
        let address = crate::validation::normalize_address(address)?;
        let domain = domain
            .unwrap_or(&self.config.challenge_domain)
            .to_string();

        let mut entropy = [0u8; NONCE_ENTROPY_BYTES];
        rand::rngs::OsRng.fill_bytes(&mut entropy);
        let raw_nonce = hex::encode(entropy);

        let issued_at = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        let expires_at = (Utc::now() + Duration::seconds(self.config.nonce_ttl_secs))
            .to_rfc3339_opts(SecondsFormat::Secs, true);

        let message = build_challenge_message(
            &domain, &address, chain_id, &raw_nonce, &issued_at, &expires_at,
        );

        let pool = self.pool.clone();
        {
            let address = address.clone();
            let raw_nonce = raw_nonce.clone();
            let domain = domain.clone();
            let issued_at = issued_at.clone();
            let expires_at = expires_at.clone();
            web::block(move || {
                let mut conn = pool.get()?;
                AuthNonce::insert(
                    &mut conn, &address, &raw_nonce, chain_id, &domain, &issued_at, &expires_at,
                )
                .map_err(ApiError::from)
            })
            .await??;
        }

        tracing::debug!(
            address = %crate::logging::sanitize::sanitize_address(&address),
            chain_id,
            "Issued login challenge"
        );

        Ok(IssuedChallenge {
            nonce: raw_nonce,
            message,
            issued_at,
            expires_at,
            domain,
            chain_id,
        })
    }

    /// Find the live challenge for (address, raw nonce) without consuming
    /// it. Absent, already-used and expired all fail with the uniform
    /// rejection message.
    pub async fn find_valid(&self, address: &str, raw_nonce: &str) -> Result<AuthNonce, ApiError> {
        let pool = self.pool.clone();
        let address_owned = address.to_string();
        let raw = raw_nonce.to_string();

        let record = web::block(move || {
            let mut conn = pool.get()?;
            AuthNonce::find_unused(&mut conn, &address_owned, &raw).map_err(ApiError::from)
        })
        .await??;

        let record = record.ok_or_else(|| {
            tracing::warn!(
                address = %crate::logging::sanitize::sanitize_address(address),
                "Login attempt with unknown or consumed nonce"
            );
            ApiError::Unauthorized(NONCE_REJECTED.to_string())
        })?;

        if record.is_expired(Utc::now()) {
            tracing::warn!(
                address = %crate::logging::sanitize::sanitize_address(address),
                "Login attempt with expired nonce"
            );
            return Err(ApiError::Unauthorized(NONCE_REJECTED.to_string()));
        }

        Ok(record)
    }

    /// Consume the challenge. Exactly one concurrent caller wins; the
    /// loser gets the uniform rejection.
    pub async fn consume(&self, address: &str, raw_nonce: &str) -> Result<(), ApiError> {
        let pool = self.pool.clone();
        let address_owned = address.to_string();
        let raw = raw_nonce.to_string();

        let won = web::block(move || {
            let mut conn = pool.get()?;
            AuthNonce::mark_used(&mut conn, &address_owned, &raw).map_err(ApiError::from)
        })
        .await??;

        if !won {
            tracing::warn!(
                address = %crate::logging::sanitize::sanitize_address(address),
                "Lost nonce-consumption race"
            );
            return Err(ApiError::Unauthorized(NONCE_REJECTED.to_string()));
        }

        Ok(())
    }
}
