//! Role freshness
//!
//! A session token carries the roles held at login, but privileged
//! checks always re-read the registry. These tests pin that down at two
//! levels: the `RequireRole` middleware on a route, and the dispute
//! service's own authorization.

use actix_web::http::StatusCode;
use actix_web::{test, web, App, HttpResponse, ResponseError};
use peerlock_types::{DisputeOutcome, EscrowState, Role};
use server::error::ApiError;
use server::middleware::RequireRole;
use server::services::SessionIssuer;

use crate::support::{actor, escrow_id, TestEnv, TestWallet};

async fn ok_handler() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "ok": true }))
}

#[actix_web::test]
async fn token_role_claims_are_not_trusted() {
    let env = TestEnv::new();
    let wallet = TestWallet::new(20);
    let address = wallet.address();

    // Token claims ARBITRATOR, the registry says otherwise
    let (stale_token, _) = env.issuer.mint(&address, &[Role::Arbitrator]).unwrap();

    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(env.pool.clone()))
            .app_data(web::Data::new(env.issuer.clone()))
            .service(
                web::resource("/gated")
                    .wrap(RequireRole::new(&[Role::Arbitrator]))
                    .route(web::get().to(ok_handler)),
            ),
    )
    .await;

    // The gate rejects at the service level before the handler runs
    let req = test::TestRequest::get()
        .uri("/gated")
        .insert_header(("Authorization", format!("Bearer {stale_token}")))
        .to_request();
    let err = test::try_call_service(&app, req).await.unwrap_err();
    assert_eq!(err.as_response_error().status_code(), StatusCode::FORBIDDEN);

    // Grant the role; the very same token now passes
    env.grant(&address, Role::Arbitrator);

    let req = test::TestRequest::get()
        .uri("/gated")
        .insert_header(("Authorization", format!("Bearer {stale_token}")))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
}

#[actix_web::test]
async fn missing_or_garbage_token_is_unauthorized() {
    let env = TestEnv::new();

    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(env.pool.clone()))
            .app_data(web::Data::new(env.issuer.clone()))
            .service(
                web::resource("/gated")
                    .wrap(RequireRole::new(&[Role::Admin]))
                    .route(web::get().to(ok_handler)),
            ),
    )
    .await;

    let req = test::TestRequest::get().uri("/gated").to_request();
    let err = test::try_call_service(&app, req).await.unwrap_err();
    assert_eq!(
        err.as_response_error().status_code(),
        StatusCode::UNAUTHORIZED
    );

    let req = test::TestRequest::get()
        .uri("/gated")
        .insert_header(("Authorization", "Bearer not.a.jwt"))
        .to_request();
    let err = test::try_call_service(&app, req).await.unwrap_err();
    assert_eq!(
        err.as_response_error().status_code(),
        StatusCode::UNAUTHORIZED
    );
}

#[actix_web::test]
async fn tokens_from_another_secret_are_rejected() {
    let env = TestEnv::new();
    let wallet = TestWallet::new(21);

    let mut other_config = server::config::AuthConfig::for_tests();
    other_config.session_secret = "ffffffffffffffffffffffffffffffff".to_string();
    let forged = SessionIssuer::new(&other_config)
        .mint(&wallet.address(), &[Role::Admin])
        .unwrap()
        .0;

    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(env.pool.clone()))
            .app_data(web::Data::new(env.issuer.clone()))
            .service(
                web::resource("/gated")
                    .wrap(RequireRole::new(&[Role::Admin]))
                    .route(web::get().to(ok_handler)),
            ),
    )
    .await;

    let req = test::TestRequest::get()
        .uri("/gated")
        .insert_header(("Authorization", format!("Bearer {forged}")))
        .to_request();
    let err = test::try_call_service(&app, req).await.unwrap_err();
    assert_eq!(
        err.as_response_error().status_code(),
        StatusCode::UNAUTHORIZED
    );
}

#[actix_web::test]
async fn service_authorization_tracks_registry_changes() {
    let env = TestEnv::new();
    let (seller, buyer) = (TestWallet::new(1).address(), TestWallet::new(2).address());
    let hopeful = TestWallet::new(22).address();

    let id = escrow_id(30);
    env.seed_escrow(&id, EscrowState::Funded, &seller, &buyer);
    env.disputes
        .open_dispute(&id, None, None, &actor(&buyer))
        .await
        .unwrap();

    // No role yet
    let err = env
        .disputes
        .resolve_dispute(&id, DisputeOutcome::BuyerWins, None, &actor(&hopeful))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Forbidden(_)));

    // Granting ARBITRATOR takes effect on the next call, no re-login
    env.grant(&hopeful, Role::Arbitrator);
    env.disputes
        .resolve_dispute(&id, DisputeOutcome::BuyerWins, None, &actor(&hopeful))
        .await
        .unwrap();
}
