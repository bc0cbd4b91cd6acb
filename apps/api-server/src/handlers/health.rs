//! Health check endpoint.

use actix_web::HttpResponse;
use larder_shared::ApiResponse;
use larder_shared::dto::HealthDto;

/// Health check endpoint - returns server status.
///
/// GET /api/health
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(ApiResponse::ok(HealthDto {
        status: "ok".to_string(),
        service: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }))
}
