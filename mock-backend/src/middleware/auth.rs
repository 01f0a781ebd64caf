//! Authentication middleware

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

use crate::{AppError, AppState};

/// Middleware: require a token issued by /auth/login
pub async fn require_token(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_bearer_token(&req);

    if state.config.require_auth {
        let token = token.as_deref().ok_or(AppError::Unauthorized)?;
        if !state.is_valid_token(token) {
            tracing::warn!("Rejected unknown or revoked token");
            return Err(AppError::TokenInvalid);
        }
    }

    Ok(next.run(req).await)
}

/// Extract bearer token from Authorization header
fn extract_bearer_token(req: &Request) -> Option<String> {
    let auth_header = req.headers().get(AUTHORIZATION)?.to_str().ok()?;
    auth_header.strip_prefix("Bearer ").map(|t| t.trim().to_string())
}
