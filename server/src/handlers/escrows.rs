//! Escrow read handlers
//!
//! The escrow projection is written by the external indexer; the API
//! only exposes ownership-checked reads. Dispute-driven state forcing
//! happens inside the dispute service.

use actix_web::{web, HttpRequest, HttpResponse};

use crate::error::ApiError;
use crate::handlers::disputes::actor_from;
use crate::services::DisputeService;
use crate::validation::validate_escrow_id;

/// GET /api/escrows/{escrow_id}
pub async fn get_escrow(
    disputes: web::Data<DisputeService>,
    path: web::Path<String>,
    http_req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let escrow_id = validate_escrow_id(path.as_str())?;
    let actor = actor_from(&http_req)?;

    let escrow = disputes.get_escrow(&escrow_id, &actor).await?;
    Ok(HttpResponse::Ok().json(escrow))
}
