//! Prediction handler

use std::sync::atomic::Ordering;

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use super::scripted_failure;
use crate::model;
use crate::{AppError, AppResult, AppState};

#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    pub url: Option<String>,
    pub email_content: Option<String>,
    #[serde(default)]
    pub scan_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub prediction: String,
    pub confidence: f64,
    pub scan_id: String,
    pub scan_time: String,
    pub features_analyzed: Vec<String>,
}

fn validate(req: &PredictRequest) -> Vec<&'static str> {
    let mut errors = Vec::new();

    if req.url.is_none() && req.email_content.is_none() {
        errors.push("Missing required field: email_content or url");
    }
    if let Some(url) = &req.url {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            errors.push("Invalid URL format");
        }
    }
    if let Some(content) = &req.email_content {
        if content.trim().is_empty() {
            errors.push("Invalid or empty email content");
        }
    }

    errors
}

pub async fn predict(
    State(state): State<AppState>,
    Json(req): Json<PredictRequest>,
) -> AppResult<Json<PredictResponse>> {
    scripted_failure(&state)?;

    let errors = validate(&req);
    if !errors.is_empty() {
        return Err(AppError::ValidationError(errors.join("; ")));
    }

    let scan_type = req.scan_type.as_deref().unwrap_or("REGULAR");
    tracing::debug!("Predict request ({})", scan_type);

    let response = match state.behavior().verdict {
        Some(scripted) => PredictResponse {
            prediction: scripted.prediction,
            confidence: scripted.confidence,
            scan_id: scripted.scan_id.unwrap_or_else(new_scan_id),
            scan_time: scan_time(),
            features_analyzed: scripted.features_analyzed.unwrap_or_default(),
        },
        None => {
            let verdict = model::classify(req.url.as_deref(), req.email_content.as_deref());
            PredictResponse {
                prediction: verdict.prediction.to_string(),
                confidence: verdict.confidence,
                scan_id: new_scan_id(),
                scan_time: scan_time(),
                features_analyzed: verdict.features_analyzed,
            }
        }
    };

    state.inner.scans.fetch_add(1, Ordering::SeqCst);
    if response.prediction == "phishing" {
        state.inner.phishing.fetch_add(1, Ordering::SeqCst);
    }

    Ok(Json(response))
}

fn new_scan_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn scan_time() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_requires_a_target() {
        let req = PredictRequest { url: None, email_content: None, scan_type: None };
        assert_eq!(validate(&req), vec!["Missing required field: email_content or url"]);
    }

    #[test]
    fn test_validate_rejects_non_http_url() {
        let req = PredictRequest {
            url: Some("ftp://files.example.com".to_string()),
            email_content: None,
            scan_type: Some("REALTIME".to_string()),
        };
        assert_eq!(validate(&req), vec!["Invalid URL format"]);
    }
}
