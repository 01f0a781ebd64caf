//! Persisted Records
//!
//! The flat records kept in local storage: extension state, usage
//! statistics, API configuration and the auth session. Field names follow the
//! keys the extension has always written (camelCase).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::client::types::Prediction;
use super::error::{PhishGuardError, PhishGuardResult};
use super::validators;
use crate::constants;

// ============================================================================
// EXTENSION STATE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExtensionState {
    pub enabled: bool,
    #[serde(alias = "lastScan")]
    pub last_scan_timestamp: Option<DateTime<Utc>>,
    pub detection_count: u64,
}

impl Default for ExtensionState {
    fn default() -> Self {
        Self {
            enabled: true,
            last_scan_timestamp: None,
            detection_count: 0,
        }
    }
}

impl ExtensionState {
    /// Fold a completed scan into the state. Returns false when the
    /// prediction is not a verdict and nothing changed.
    ///
    /// The detection counter only grows; the timestamp never moves backwards.
    pub fn record_scan(&mut self, prediction: Prediction, at: DateTime<Utc>) -> bool {
        if !prediction.is_verdict() {
            return false;
        }

        self.last_scan_timestamp = Some(match self.last_scan_timestamp {
            Some(previous) if previous > at => previous,
            _ => at,
        });

        if prediction == Prediction::Phishing {
            self.detection_count = self.detection_count.saturating_add(1);
        }
        true
    }
}

// ============================================================================
// USAGE STATISTICS
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UsageStats {
    pub scans_performed: u64,
    pub phishing_detected: u64,
    pub time_installed: Option<DateTime<Utc>>,
}

impl UsageStats {
    pub fn record_scan(&mut self, prediction: Prediction) {
        if !prediction.is_verdict() {
            return;
        }
        self.scans_performed = self.scans_performed.saturating_add(1);
        if prediction == Prediction::Phishing {
            self.phishing_detected = self.phishing_detected.saturating_add(1);
        }
    }

    /// Share of scans flagged as phishing, in percent
    pub fn detection_rate(&self) -> Option<f64> {
        if self.scans_performed == 0 {
            return None;
        }
        Some(self.phishing_detected as f64 / self.scans_performed as f64 * 100.0)
    }

    /// Whole days since install, rounded up
    pub fn days_active(&self, now: DateTime<Utc>) -> Option<i64> {
        let installed = self.time_installed?;
        let seconds = (now - installed).num_seconds().abs();
        Some((seconds + 86_399) / 86_400)
    }
}

// ============================================================================
// API CONFIGURATION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiConfig {
    #[serde(alias = "apiUrl")]
    pub base_url: String,
    #[serde(alias = "timeout")]
    pub timeout_ms: u64,
    /// Refuse to scan without a session token
    #[serde(default = "constants::is_session_required")]
    pub require_session: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: constants::get_api_url(),
            timeout_ms: constants::get_timeout_ms(),
            require_session: constants::is_session_required(),
        }
    }
}

impl ApiConfig {
    pub fn validate(&self) -> PhishGuardResult<()> {
        if !validators::is_valid_url(&self.base_url) {
            return Err(PhishGuardError::invalid_config(format!(
                "base URL must be an absolute http(s) URL, got '{}'",
                self.base_url
            )));
        }
        if self.timeout_ms == 0 {
            return Err(PhishGuardError::invalid_config("timeout must be greater than zero"));
        }
        Ok(())
    }
}

// ============================================================================
// AUTH SESSION
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthSession {
    pub token: Option<String>,
}

impl AuthSession {
    pub fn is_active(&self) -> bool {
        self.token.as_deref().map_or(false, |t| !t.is_empty())
    }
}

// ============================================================================
// TESTS
// ============================================================================
