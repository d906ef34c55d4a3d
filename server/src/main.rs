use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use anyhow::{Context, Result};
use peerlock_types::Role;
use std::sync::Arc;
use tracing::info;

use server::config::{AuthConfig, NotifierConfig, ServerConfig};
use server::db::{create_pool, run_migrations};
use server::handlers::{admin, auth, disputes, escrows, health};
use server::middleware::{RequestIdMiddleware, RequireAuth, RequireRole};
use server::models::role::RoleAssignment;
use server::services::{
    AuditService, ChallengeService, DisputeService, NotificationDispatcher, SessionIssuer,
};

#[actix_web::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    server::telemetry::init_telemetry().context("Failed to initialize telemetry")?;

    info!("Starting Peerlock coordination server");

    let server_config = ServerConfig::from_env().context("Failed to load server config")?;
    let auth_config = AuthConfig::from_env().context("Failed to load auth config")?;
    let notifier_config = NotifierConfig::from_env().context("Failed to load notifier config")?;

    let pool = create_pool(&server_config.database_url)
        .context("Failed to create database connection pool")?;
    run_migrations(&pool).context("Failed to run database migrations")?;
    info!("Database ready at {}", server_config.database_url);

    // Seed the role registry so role-gated routes are reachable on a
    // fresh deployment
    if let Some(admin_address) = &server_config.bootstrap_admin {
        let mut conn = pool.get().context("Failed to get connection for bootstrap")?;
        RoleAssignment::assign(&mut conn, admin_address, Role::Admin, "bootstrap")
            .context("Failed to bootstrap admin role")?;
        info!(
            admin = %server::logging::sanitize::sanitize_address(admin_address),
            "Bootstrap admin role ensured"
        );
    }

    let session_issuer = SessionIssuer::new(&auth_config);
    let challenge_service = ChallengeService::new(pool.clone(), auth_config.clone());
    let audit_service = AuditService::new(pool.clone());
    audit_service
        .initialize()
        .await
        .context("Failed to load audit chain head")?;
    let notifier = Arc::new(NotificationDispatcher::new(pool.clone(), notifier_config));
    let dispute_service =
        DisputeService::new(pool.clone(), audit_service.clone(), notifier.clone());

    let bind_addr = server_config.bind_addr.clone();
    info!("Listening on {bind_addr}");

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allowed_methods(vec!["GET", "POST"])
            .allowed_headers(vec!["authorization", "content-type", "x-request-id"])
            .max_age(3600);

        App::new()
            .wrap(cors)
            .wrap(RequestIdMiddleware)
            .app_data(web::Data::new(pool.clone()))
            .app_data(web::Data::new(session_issuer.clone()))
            .app_data(web::Data::new(challenge_service.clone()))
            .app_data(web::Data::new(audit_service.clone()))
            .app_data(web::Data::new(dispute_service.clone()))
            .service(health::health_check)
            .service(
                web::scope("/api/auth")
                    .service(auth::request_nonce)
                    .service(auth::login)
                    .service(
                        web::resource("/logout")
                            .wrap(RequireAuth)
                            .route(web::post().to(auth::logout)),
                    )
                    .service(
                        web::resource("/me")
                            .wrap(RequireAuth)
                            .route(web::get().to(auth::me)),
                    ),
            )
            .service(
                web::scope("/api/escrows")
                    .service(
                        web::resource("/{escrow_id}/dispute/open")
                            .wrap(RequireAuth)
                            .route(web::post().to(disputes::open_dispute)),
                    )
                    .service(
                        web::resource("/{escrow_id}")
                            .wrap(RequireAuth)
                            .route(web::get().to(escrows::get_escrow)),
                    ),
            )
            .service(
                web::scope("/api/disputes")
                    .service(
                        web::resource("")
                            .wrap(RequireRole::new(&[Role::Arbitrator, Role::Admin]))
                            .route(web::get().to(disputes::list_disputes)),
                    )
                    .service(
                        web::resource("/{escrow_id}/claim")
                            .wrap(RequireRole::new(&[Role::Arbitrator]))
                            .route(web::post().to(disputes::claim_dispute)),
                    )
                    .service(
                        web::resource("/{escrow_id}/escalate")
                            .wrap(RequireRole::new(&[Role::Arbitrator, Role::Admin]))
                            .route(web::post().to(disputes::escalate_dispute)),
                    )
                    .service(
                        web::resource("/{escrow_id}/recommendation")
                            .wrap(RequireRole::new(&[Role::Arbitrator, Role::Admin]))
                            .route(web::post().to(disputes::add_recommendation)),
                    )
                    .service(
                        web::resource("/{escrow_id}/resolve")
                            .wrap(RequireRole::new(&[Role::Arbitrator]))
                            .route(web::post().to(disputes::resolve_dispute)),
                    )
                    .service(
                        web::resource("/{escrow_id}")
                            .wrap(RequireAuth)
                            .route(web::get().to(disputes::get_dispute)),
                    ),
            )
            .service(
                web::scope("/api/admin")
                    .wrap(RequireRole::new(&[Role::Admin]))
                    .service(web::resource("/roles").route(web::post().to(admin::assign_role)))
                    .service(
                        web::resource("/audit/integrity")
                            .route(web::get().to(admin::audit_integrity)),
                    )
                    .service(
                        web::resource("/audit").route(web::get().to(admin::recent_audit_events)),
                    ),
            )
    })
    .bind(&bind_addr)
    .with_context(|| format!("Failed to bind {bind_addr}"))?
    .run()
    .await
    .context("Server terminated with error")
}
