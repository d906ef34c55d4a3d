//! Authentication nonce store
//!
//! Single-use login challenges. Only the SHA-256 hash of the raw nonce is
//! stored; the raw value travels to the wallet and comes back with the
//! login request. Rows are never deleted, a consumed nonce stays behind
//! as replay-detection evidence.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::models::now_rfc3339;
use crate::schema::auth_nonces;

#[derive(Debug, Clone, Queryable, Serialize, Deserialize)]
#[diesel(table_name = auth_nonces)]
pub struct AuthNonce {
    pub id: String,
    pub address: String,
    pub nonce_hash: String,
    pub chain_id: i64,
    pub domain: String,
    pub issued_at: String,
    pub expires_at: String,
    pub used: bool,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = auth_nonces)]
pub struct NewAuthNonce {
    pub id: String,
    pub address: String,
    pub nonce_hash: String,
    pub chain_id: i64,
    pub domain: String,
    pub issued_at: String,
    pub expires_at: String,
    pub used: bool,
}

/// SHA-256 hex of a raw nonce. The store never sees the raw value.
pub fn hash_nonce(raw: &str) -> String {
    hex::encode(Sha256::digest(raw.as_bytes()))
}

impl AuthNonce {
    /// Store a freshly issued challenge.
    pub fn insert(
        conn: &mut SqliteConnection,
        address: &str,
        raw_nonce: &str,
        chain_id: i64,
        domain: &str,
        issued_at: &str,
        expires_at: &str,
    ) -> QueryResult<AuthNonce> {
        let record = NewAuthNonce {
            id: Uuid::new_v4().to_string(),
            address: address.to_string(),
            nonce_hash: hash_nonce(raw_nonce),
            chain_id,
            domain: domain.to_string(),
            issued_at: issued_at.to_string(),
            expires_at: expires_at.to_string(),
            used: false,
        };

        diesel::insert_into(auth_nonces::table)
            .values(&record)
            .execute(conn)?;

        auth_nonces::table
            .filter(auth_nonces::id.eq(&record.id))
            .first(conn)
    }

    /// Look up the unused challenge matching (address, raw nonce).
    pub fn find_unused(
        conn: &mut SqliteConnection,
        address: &str,
        raw_nonce: &str,
    ) -> QueryResult<Option<AuthNonce>> {
        auth_nonces::table
            .filter(auth_nonces::address.eq(address))
            .filter(auth_nonces::nonce_hash.eq(hash_nonce(raw_nonce)))
            .filter(auth_nonces::used.eq(false))
            .first(conn)
            .optional()
    }

    /// Atomically flip `used`; returns true if this caller won the race.
    ///
    /// The `used = false` guard makes concurrent logins with the same
    /// nonce yield exactly one winner.
    pub fn mark_used(
        conn: &mut SqliteConnection,
        address: &str,
        raw_nonce: &str,
    ) -> QueryResult<bool> {
        let updated = diesel::update(
            auth_nonces::table
                .filter(auth_nonces::address.eq(address))
                .filter(auth_nonces::nonce_hash.eq(hash_nonce(raw_nonce)))
                .filter(auth_nonces::used.eq(false)),
        )
        .set(auth_nonces::used.eq(true))
        .execute(conn)?;

        Ok(updated == 1)
    }

    /// Whether the challenge has passed its expiry.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match DateTime::parse_from_rfc3339(&self.expires_at) {
            Ok(expires) => now > expires,
            // Unparseable expiry fails closed
            Err(_) => true,
        }
    }
}
