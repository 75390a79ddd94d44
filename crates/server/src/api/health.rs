use axum::Json;

use super::schemas::{HealthResponse, VersionResponse};

/// `GET /health`
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
    })
}

/// `GET /version`
pub async fn version() -> Json<VersionResponse> {
    Json(VersionResponse {
        name: "brigade".into(),
        version: env!("CARGO_PKG_VERSION").into(),
    })
}
