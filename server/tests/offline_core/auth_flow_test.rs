//! Challenge-response login flow
//!
//! Exercises the full offline path: issue a challenge, sign the
//! canonical message with a real secp256k1 key, verify, and burn the
//! nonce. No HTTP layer; the services are driven directly.

use actix_web::{test, web, App};
use chrono::{Duration, Utc};
use peerlock_types::Role;
use server::crypto::signature::verify_wallet_signature;
use server::handlers::auth;
use server::models::nonce::AuthNonce;
use server::models::role::RoleAssignment;
use server::services::challenge::{build_challenge_message, NONCE_REJECTED};

use crate::support::{TestEnv, TestWallet, CHAIN_ID};

#[actix_web::test]
async fn full_login_round_trip() {
    let env = TestEnv::new();
    let wallet = TestWallet::new(7);
    let address = wallet.address();

    let challenge = env.challenges.issue(&address, CHAIN_ID, None).await.unwrap();
    assert_eq!(challenge.chain_id, CHAIN_ID);
    assert_eq!(challenge.domain, "test.peerlock.app");

    // The wallet signs exactly the message the server issued
    let signature = wallet.sign(&challenge.message);

    // Server side: locate the stored challenge and rebuild the message
    let record = env
        .challenges
        .find_valid(&address, &challenge.nonce)
        .await
        .unwrap();
    let rebuilt = build_challenge_message(
        &record.domain,
        &record.address,
        record.chain_id,
        &challenge.nonce,
        &record.issued_at,
        &record.expires_at,
    );
    assert_eq!(rebuilt, challenge.message);

    assert!(verify_wallet_signature(&signature, &rebuilt, &address));
    env.challenges.consume(&address, &challenge.nonce).await.unwrap();
}

#[actix_web::test]
async fn nonce_is_single_use() {
    let env = TestEnv::new();
    let wallet = TestWallet::new(8);
    let address = wallet.address();

    let challenge = env.challenges.issue(&address, CHAIN_ID, None).await.unwrap();
    env.challenges.consume(&address, &challenge.nonce).await.unwrap();

    // Second consumption loses, with the uniform rejection message
    let err = env
        .challenges
        .consume(&address, &challenge.nonce)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), NONCE_REJECTED);

    // And the challenge is no longer findable either
    let err = env
        .challenges
        .find_valid(&address, &challenge.nonce)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), NONCE_REJECTED);
}

#[actix_web::test]
async fn unknown_nonce_rejected_uniformly() {
    let env = TestEnv::new();
    let wallet = TestWallet::new(9);

    let err = env
        .challenges
        .find_valid(&wallet.address(), "deadbeefdeadbeef")
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), NONCE_REJECTED);
}

#[actix_web::test]
async fn expired_nonce_rejected() {
    let env = TestEnv::new();
    let wallet = TestWallet::new(10);
    let address = wallet.address();

    // Insert a challenge that expired a minute ago
    let issued = (Utc::now() - Duration::seconds(700)).to_rfc3339();
    let expired = (Utc::now() - Duration::seconds(60)).to_rfc3339();
    {
        let mut conn = env.pool.get().unwrap();
        AuthNonce::insert(
            &mut conn,
            &address,
            "cafebabecafebabe",
            CHAIN_ID,
            "test.peerlock.app",
            &issued,
            &expired,
        )
        .unwrap();
    }

    let err = env
        .challenges
        .find_valid(&address, "cafebabecafebabe")
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), NONCE_REJECTED);
}

#[actix_web::test]
async fn challenge_is_address_scoped() {
    let env = TestEnv::new();
    let alice = TestWallet::new(11);
    let mallory = TestWallet::new(12);

    let challenge = env
        .challenges
        .issue(&alice.address(), CHAIN_ID, None)
        .await
        .unwrap();

    // Mallory cannot present Alice's nonce under her own address
    let err = env
        .challenges
        .find_valid(&mallory.address(), &challenge.nonce)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), NONCE_REJECTED);
}

#[actix_web::test]
async fn wrong_wallet_signature_fails_verification() {
    let env = TestEnv::new();
    let alice = TestWallet::new(13);
    let mallory = TestWallet::new(14);
    let address = alice.address();

    let challenge = env.challenges.issue(&address, CHAIN_ID, None).await.unwrap();

    // Mallory signs Alice's challenge; recovery yields Mallory's address
    let forged = mallory.sign(&challenge.message);
    assert!(!verify_wallet_signature(&forged, &challenge.message, &address));

    // The nonce is still live: a failed signature must not burn it
    assert!(env
        .challenges
        .find_valid(&address, &challenge.nonce)
        .await
        .is_ok());
}

#[actix_web::test]
async fn first_login_grants_default_user_role() {
    let env = TestEnv::new();
    let wallet = TestWallet::new(16);
    let address = wallet.address();

    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(env.pool.clone()))
            .app_data(web::Data::new(env.challenges.clone()))
            .app_data(web::Data::new(env.issuer.clone()))
            .app_data(web::Data::new(env.audit.clone()))
            .service(auth::request_nonce)
            .service(auth::login),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/nonce")
        .set_json(serde_json::json!({ "address": address.clone(), "chain_id": CHAIN_ID }))
        .to_request();
    let challenge: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    let message = challenge["message"].as_str().unwrap();
    let nonce = challenge["nonce"].as_str().unwrap();

    let req = test::TestRequest::post()
        .uri("/login")
        .set_json(serde_json::json!({
            "address": address.clone(),
            "nonce": nonce,
            "signature": wallet.sign(message),
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    // A fresh wallet comes out of its first login holding USER
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["roles"], serde_json::json!(["USER"]));

    // The grant lives in the registry, not just the token
    let mut conn = env.pool.get().unwrap();
    let roles = RoleAssignment::roles_of(&mut conn, &address).unwrap();
    assert_eq!(roles, vec![Role::User]);
    drop(conn);

    // A second login does not duplicate the grant
    let challenge = env.challenges.issue(&address, CHAIN_ID, None).await.unwrap();
    let req = test::TestRequest::post()
        .uri("/login")
        .set_json(serde_json::json!({
            "address": address.clone(),
            "nonce": challenge.nonce,
            "signature": wallet.sign(&challenge.message),
        }))
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["roles"], serde_json::json!(["USER"]));
}

#[actix_web::test]
async fn session_token_mints_and_decodes() {
    let env = TestEnv::new();
    let wallet = TestWallet::new(15);
    let address = wallet.address();

    let (token, _expires_at) = env.issuer.mint(&address, &[]).unwrap();
    let claims = env.issuer.decode(&token).unwrap();
    assert_eq!(claims.address, address);
    assert!(claims.roles.is_empty());
}
