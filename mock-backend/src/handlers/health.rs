//! Health check handler

use axum::Json;
use serde::Serialize;

use crate::model::MODEL_VERSION;

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
    timestamp: i64,
}

pub async fn check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: MODEL_VERSION,
        timestamp: chrono::Utc::now().timestamp(),
    })
}
