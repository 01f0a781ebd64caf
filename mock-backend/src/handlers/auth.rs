//! Authentication handlers

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::{AppError, AppResult, AppState};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user_id: String,
    pub expires_in: u64,
}

/// Login endpoint
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    if req.email.is_empty() || req.password.is_empty() {
        return Err(AppError::ValidationError("Missing email or password".to_string()));
    }

    if req.email != state.config.demo_email || req.password != state.config.demo_password {
        tracing::warn!("Failed login attempt for {}", req.email);
        return Err(AppError::InvalidCredentials);
    }

    let token = state.issue_token();
    tracing::info!("Issued session token for {}", req.email);

    Ok(Json(LoginResponse {
        token,
        user_id: "usr_demo".to_string(),
        expires_in: state.config.token_expires_in,
    }))
}
