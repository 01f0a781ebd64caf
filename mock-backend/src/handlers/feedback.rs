//! Feedback handler

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use super::scripted_failure;
use crate::{AppError, AppResult, AppState, FeedbackRecord};

#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    #[serde(default)]
    pub scan_id: String,
    pub is_correct: bool,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FeedbackResponse {
    pub status: &'static str,
    pub message: &'static str,
}

pub async fn submit(
    State(state): State<AppState>,
    Json(req): Json<FeedbackRequest>,
) -> AppResult<Json<FeedbackResponse>> {
    scripted_failure(&state)?;

    if req.scan_id.is_empty() {
        return Err(AppError::ValidationError("Missing required field: scan_id".to_string()));
    }

    tracing::info!("Feedback for {}: correct={}", req.scan_id, req.is_correct);
    state.inner.feedback.write().push(FeedbackRecord {
        scan_id: req.scan_id,
        is_correct: req.is_correct,
        comment: req.comment.unwrap_or_default(),
    });

    Ok(Json(FeedbackResponse {
        status: "received",
        message: "Feedback recorded",
    }))
}
