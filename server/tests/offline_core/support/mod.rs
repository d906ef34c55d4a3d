//! Shared fixtures for the offline suite

use k256::ecdsa::SigningKey;
use peerlock_types::{EscrowState, Role};
use sha3::{Digest, Keccak256};
use std::sync::Arc;

use server::config::{AuthConfig, NotifierConfig};
use server::crypto::signature::eip191_digest;
use server::db::{create_test_pool, DbPool};
use server::models::escrow::{Escrow, NewEscrow};
use server::models::now_rfc3339;
use server::models::role::RoleAssignment;
use server::services::dispute::Actor;
use server::services::{
    AuditService, ChallengeService, DisputeService, NotificationDispatcher, SessionIssuer,
};

pub const CHAIN_ID: i64 = 97;

/// Deterministic wallet for signing login challenges.
pub struct TestWallet {
    key: SigningKey,
}

impl TestWallet {
    /// Wallet derived from a fixed seed byte, so addresses are stable
    /// across runs.
    pub fn new(seed: u8) -> Self {
        let mut bytes = [seed; 32];
        // Keep the scalar in range for any seed
        bytes[0] = 0x01;
        Self {
            key: SigningKey::from_slice(&bytes).expect("valid signing key"),
        }
    }

    pub fn address(&self) -> String {
        let point = self.key.verifying_key().to_encoded_point(false);
        let hash = Keccak256::digest(&point.as_bytes()[1..]);
        format!("0x{}", hex::encode(&hash[12..]))
    }

    /// EIP-191 personal_sign over `message`, 65-byte r||s||v hex.
    pub fn sign(&self, message: &str) -> String {
        let digest = eip191_digest(message);
        let (sig, recid) = self
            .key
            .sign_prehash_recoverable(&digest)
            .expect("signing never fails");
        let mut out = sig.to_bytes().to_vec();
        out.push(recid.to_byte() + 27);
        format!("0x{}", hex::encode(out))
    }
}

/// Everything a test needs, wired over one in-memory database.
pub struct TestEnv {
    pub pool: DbPool,
    pub challenges: ChallengeService,
    pub issuer: SessionIssuer,
    pub audit: AuditService,
    pub disputes: DisputeService,
}

impl TestEnv {
    pub fn new() -> Self {
        let pool = create_test_pool();
        let auth_config = AuthConfig::for_tests();

        let challenges = ChallengeService::new(pool.clone(), auth_config.clone());
        let issuer = SessionIssuer::new(&auth_config);
        let audit = AuditService::new(pool.clone());
        let notifier = Arc::new(NotificationDispatcher::new(
            pool.clone(),
            NotifierConfig::disabled(),
        ));
        let disputes = DisputeService::new(pool.clone(), audit.clone(), notifier);

        Self {
            pool,
            challenges,
            issuer,
            audit,
            disputes,
        }
    }

    pub fn grant(&self, address: &str, role: Role) {
        let mut conn = self.pool.get().unwrap();
        RoleAssignment::assign(&mut conn, address, role, "test-setup").unwrap();
    }

    /// Seed an escrow projection as the indexer would.
    pub fn seed_escrow(&self, escrow_id: &str, state: EscrowState, seller: &str, buyer: &str) {
        let record = NewEscrow {
            id: escrow_id.to_string(),
            chain_id: CHAIN_ID,
            token_key: "USDT".to_string(),
            amount: "1000000000000000000".to_string(),
            fee_amount: "10000000000000000".to_string(),
            seller_bond: "50000000000000000".to_string(),
            buyer_bond: "50000000000000000".to_string(),
            seller: seller.to_string(),
            buyer: Some(buyer.to_string()),
            state: state.as_str().to_string(),
            updated_at_block: 100,
            created_at: now_rfc3339(),
            updated_at: now_rfc3339(),
        };

        let mut conn = self.pool.get().unwrap();
        Escrow::upsert_projection(&mut conn, &record).unwrap();
    }

    pub fn escrow_state(&self, escrow_id: &str) -> Option<EscrowState> {
        let mut conn = self.pool.get().unwrap();
        Escrow::find(&mut conn, escrow_id)
            .unwrap()
            .and_then(|e| e.current_state())
    }
}

pub fn actor(address: &str) -> Actor {
    Actor {
        address: address.to_string(),
        request_id: None,
    }
}

pub fn escrow_id(n: u8) -> String {
    format!("0x{}", hex::encode([n; 32]))
}
