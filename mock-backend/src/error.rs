//! Error handling

use axum::{
    response::{IntoResponse, Response},
    http::StatusCode,
    Json,
};
use serde_json::json;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub enum AppError {
    // Auth errors
    InvalidCredentials,
    TokenInvalid,
    Unauthorized,

    // Request errors
    BadRequest(String),
    ValidationError(String),

    // Scripted failure injected by a test
    Forced { status: u16, message: String },

    // Generic errors
    InternalError(String),
}

impl AppError {
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            AppError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "Invalid credentials".to_string()),
            AppError::TokenInvalid => (StatusCode::UNAUTHORIZED, "Invalid or expired token".to_string()),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "Authentication required".to_string()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::ValidationError(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.clone()),
            AppError::Forced { status, message } => (
                StatusCode::from_u16(*status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                message.clone(),
            ),
            AppError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();

        let body = Json(json!({
            "error": {
                "code": format!("PHISH-{}", status.as_u16()),
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forced_status_is_preserved() {
        let err = AppError::Forced { status: 503, message: "maintenance".to_string() };
        let (status, message) = err.status_and_message();
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(message, "maintenance");
    }

    #[test]
    fn test_invalid_forced_status_falls_back_to_500() {
        let err = AppError::Forced { status: 42, message: "bogus".to_string() };
        assert_eq!(err.status_and_message().0, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
