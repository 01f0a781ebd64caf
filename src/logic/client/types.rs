//! API Client Types
//!
//! Scan requests and results plus the JSON bodies exchanged with the
//! classification backend.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::logic::error::{ErrorKind, PhishGuardError, PhishGuardResult};
use crate::logic::validators::{self, MAX_EMAIL_CONTENT_BYTES};

// ============================================================================
// SCAN REQUEST / RESULT
// ============================================================================

/// What to classify
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ScanRequest {
    Url(String),
    EmailContent(String),
}

impl ScanRequest {
    pub fn kind(&self) -> &'static str {
        match self {
            ScanRequest::Url(_) => "url",
            ScanRequest::EmailContent(_) => "email",
        }
    }

    /// Validate and return the sanitized request that may go on the wire
    pub fn sanitized(&self) -> PhishGuardResult<ScanRequest> {
        match self {
            ScanRequest::Url(url) => {
                if !validators::is_valid_url(url) {
                    return Err(PhishGuardError::invalid_url(
                        "expected an absolute http(s) URL",
                    ));
                }
                let clean = validators::sanitize_url(url);
                if !validators::is_valid_url(&clean) {
                    return Err(PhishGuardError::invalid_url("URL is empty after sanitization"));
                }
                Ok(ScanRequest::Url(clean))
            }
            ScanRequest::EmailContent(content) => {
                if content.trim().is_empty() {
                    return Err(PhishGuardError::invalid_email("content is empty"));
                }
                if !validators::is_valid_email_content(content) {
                    return Err(PhishGuardError::invalid_email(format!(
                        "content exceeds {} bytes",
                        MAX_EMAIL_CONTENT_BYTES
                    )));
                }
                let clean = validators::sanitize_email_content(content);
                if clean.is_empty() {
                    return Err(PhishGuardError::invalid_email(
                        "content is empty after sanitization",
                    ));
                }
                Ok(ScanRequest::EmailContent(clean))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Prediction {
    Phishing,
    Legitimate,
    Error,
}

impl Prediction {
    /// A real classification (as opposed to a failed scan)
    pub fn is_verdict(&self) -> bool {
        !matches!(self, Prediction::Error)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Prediction::Phishing => "phishing",
            Prediction::Legitimate => "legitimate",
            Prediction::Error => "error",
        }
    }
}

/// Outcome of one scan; `scan_id` joins it to later feedback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    pub prediction: Prediction,
    pub confidence: f64,
    pub scan_id: String,
    #[serde(rename = "scan_time")]
    pub scan_time_iso: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features_analyzed: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

impl ScanResult {
    /// Error result produced locally for a scan that never got a verdict
    pub fn failed(err: &PhishGuardError) -> Self {
        Self {
            prediction: Prediction::Error,
            confidence: 0.0,
            scan_id: format!("local-{}", uuid::Uuid::new_v4()),
            scan_time_iso: now_iso(),
            features_analyzed: None,
            error: Some(err.to_string()),
            error_kind: Some(err.kind()),
        }
    }

    pub fn is_phishing(&self) -> bool {
        self.prediction == Prediction::Phishing
    }

    /// Confidence as a whole percentage
    pub fn confidence_percent(&self) -> u32 {
        (self.confidence.clamp(0.0, 1.0) * 100.0).round() as u32
    }
}

pub(crate) fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

// ============================================================================
// HEALTH / FEEDBACK / LOGIN
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Online,
    Error,
    Timeout,
    Offline,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Backend acknowledgement of a feedback submission
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedbackAck {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Aggregate counters kept by the backend
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerStats {
    #[serde(default)]
    pub total_scans: u64,
    #[serde(default)]
    pub phishing_detected: u64,
    #[serde(default)]
    pub feedback_received: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub user_id: String,
    pub expires_in: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginOutcome {
    pub success: bool,
    pub session: SessionInfo,
}

// ============================================================================
// WIRE BODIES
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub(crate) struct HealthResponse {
    #[serde(default)]
    pub version: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct PredictRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_content: Option<&'a str>,
    pub scan_type: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PredictResponse {
    pub prediction: String,
    pub confidence: f64,
    pub scan_id: String,
    #[serde(default)]
    pub scan_time: Option<String>,
    #[serde(default)]
    pub features_analyzed: Option<Vec<String>>,
}

impl PredictResponse {
    pub fn into_result(self) -> Result<ScanResult, PhishGuardError> {
        let prediction = match self.prediction.to_ascii_lowercase().as_str() {
            "phishing" => Prediction::Phishing,
            "legitimate" => Prediction::Legitimate,
            "error" => Prediction::Error,
            other => {
                return Err(PhishGuardError::unknown(format!(
                    "unrecognized prediction '{}'",
                    other
                )))
            }
        };

        if self.scan_id.is_empty() {
            return Err(PhishGuardError::unknown("response is missing scan_id"));
        }

        let confidence = if self.confidence.is_finite() {
            self.confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };
        if (confidence - self.confidence).abs() > f64::EPSILON {
            log::warn!("Backend confidence {} out of range, clamped", self.confidence);
        }

        Ok(ScanResult {
            prediction,
            confidence,
            scan_id: self.scan_id,
            scan_time_iso: self.scan_time.unwrap_or_else(now_iso),
            features_analyzed: self.features_analyzed,
            error: None,
            error_kind: None,
        })
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct FeedbackRequest<'a> {
    pub scan_id: &'a str,
    pub is_correct: bool,
    pub comment: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginResponse {
    pub token: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub expires_in: u64,
}
