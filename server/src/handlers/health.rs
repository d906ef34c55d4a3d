//! Health check endpoint

use actix_web::{get, web, HttpResponse, Responder};
use serde::Serialize;
use std::time::Instant;

use crate::db::DbPool;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub database: ComponentHealth,
}

#[derive(Serialize)]
pub struct ComponentHealth {
    pub status: &'static str,
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// GET /health — liveness plus a round trip through the database.
#[get("/health")]
pub async fn health_check(pool: web::Data<DbPool>) -> impl Responder {
    let database = check_database(&pool).await;
    let healthy = database.status == "healthy";

    let response = HealthResponse {
        status: if healthy { "healthy" } else { "unhealthy" },
        service: "peerlock",
        version: env!("CARGO_PKG_VERSION"),
        database,
    };

    if healthy {
        HttpResponse::Ok().json(response)
    } else {
        HttpResponse::ServiceUnavailable().json(response)
    }
}

async fn check_database(pool: &DbPool) -> ComponentHealth {
    let start = Instant::now();

    match pool.get() {
        Ok(mut conn) => {
            let result = web::block(move || {
                use diesel::prelude::*;
                diesel::sql_query("SELECT 1 AS val").execute(&mut conn)
            })
            .await;

            match result {
                Ok(Ok(_)) => ComponentHealth {
                    status: "healthy",
                    latency_ms: Some(start.elapsed().as_millis() as u64),
                    error: None,
                },
                Ok(Err(e)) => ComponentHealth {
                    status: "unhealthy",
                    latency_ms: None,
                    error: Some(format!("Query failed: {e}")),
                },
                Err(e) => ComponentHealth {
                    status: "unhealthy",
                    latency_ms: None,
                    error: Some(format!("Block error: {e}")),
                },
            }
        }
        Err(e) => ComponentHealth {
            status: "unhealthy",
            latency_ms: None,
            error: Some(format!("Connection failed: {e}")),
        },
    }
}
