use axum::Json;

use crate::api::types::HealthResponse;
use crate::config::APP_VERSION;

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: APP_VERSION,
    })
}
