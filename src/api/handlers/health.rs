use crate::AppState;
use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;
use utoipa::ToSchema;

pub const SERVICE_NAME: &str = "fitlearn-backend";

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub service: String,
    /// `ok`, or `degraded` when the database cannot be reached
    pub status: String,
    pub database: String,
    pub version: String,
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service and database are up", body = HealthResponse),
        (status = 503, description = "Database unreachable", body = HealthResponse)
    ),
    tag = "system"
)]
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let database_up = match state.db.ping().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!("🩺 Health check: database ping failed: {}", e);
            false
        }
    };

    let (code, status, database) = if database_up {
        (StatusCode::OK, "ok", "connected")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded", "disconnected")
    };

    (
        code,
        Json(HealthResponse {
            service: SERVICE_NAME.to_string(),
            status: status.to_string(),
            database: database.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}
