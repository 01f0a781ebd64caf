//! API Client
//!
//! HTTP client for the PhishGuard classification backend: health check,
//! URL/email analysis, feedback, login and aggregate stats.
//!
//! Every call issues at most one request under the configured timeout and is
//! never retried here. Input is validated and sanitized before anything leaves
//! the process, and the session gate is checked before the network is touched.

pub mod types;

#[cfg(test)]
mod tests;

use std::time::Duration;

use parking_lot::RwLock;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;

pub use types::{
    FeedbackAck, HealthReport, HealthStatus, LoginOutcome, Prediction, ScanRequest, ScanResult,
    ServerStats, SessionInfo,
};
use types::{FeedbackRequest, HealthResponse, LoginRequest, LoginResponse, PredictRequest, PredictResponse};

use super::error::{PhishGuardError, PhishGuardResult};
use super::state::{ApiConfig, AuthSession};
use super::storage::StateStore;
use crate::constants::SCAN_TYPE_REALTIME;

/// Client for the classification backend
pub struct ApiClient {
    config: RwLock<ApiConfig>,
    session: RwLock<AuthSession>,
    store: StateStore,
    http_client: reqwest::Client,
}

impl ApiClient {
    /// Create a client from the persisted configuration and token. An
    /// unreadable record falls back to the defaults.
    pub fn new(store: StateStore) -> PhishGuardResult<Self> {
        let config = match store.load_config() {
            Ok(Some(config)) if config.validate().is_ok() => config,
            Ok(Some(_)) => {
                log::warn!("Stored API config is invalid, using defaults");
                ApiConfig::default()
            }
            Ok(None) => ApiConfig::default(),
            Err(e) => {
                log::warn!("Failed to load API config, using defaults: {}", e);
                ApiConfig::default()
            }
        };
        Self::with_config(store, config)
    }

    /// Create a client with an explicit configuration (not persisted)
    pub fn with_config(store: StateStore, config: ApiConfig) -> PhishGuardResult<Self> {
        config.validate()?;

        // Timeouts are applied per request so a config change takes effect
        // without rebuilding the client
        let http_client = reqwest::Client::builder()
            .user_agent(format!("phish-guard/{}", crate::constants::APP_VERSION))
            .build()
            .map_err(|e| PhishGuardError::unknown(format!("failed to build HTTP client: {}", e)))?;

        let token = store.load_token().unwrap_or_else(|e| {
            log::warn!("Failed to load session token: {}", e);
            None
        });
        log::debug!(
            "API client ready: {} (timeout {} ms, session {})",
            config.base_url,
            config.timeout_ms,
            if token.is_some() { "present" } else { "absent" }
        );

        Ok(Self {
            config: RwLock::new(config),
            session: RwLock::new(AuthSession { token }),
            store,
            http_client,
        })
    }

    // ========================================================================
    // CONFIG / SESSION
    // ========================================================================

    pub fn config(&self) -> ApiConfig {
        self.config.read().clone()
    }

    /// Validate, persist and apply a new configuration
    pub fn update_config(&self, config: ApiConfig) -> PhishGuardResult<()> {
        config.validate()?;
        self.store.save_config(&config)?;
        log::info!("API config updated: {} ({} ms)", config.base_url, config.timeout_ms);
        *self.config.write() = config;
        Ok(())
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.read().is_active()
    }

    /// Set the session token (persisted)
    fn set_token(&self, token: String) -> PhishGuardResult<()> {
        self.store.save_token(&token)?;
        self.session.write().token = Some(token);
        Ok(())
    }

    /// Drop the session locally
    pub fn logout(&self) -> PhishGuardResult<()> {
        self.session.write().token = None;
        self.store.clear_token()?;
        log::info!("Logged out");
        Ok(())
    }

    fn endpoint(&self, path: &str) -> (String, Duration) {
        let config = self.config.read();
        (
            format!("{}{}", config.base_url.trim_end_matches('/'), path),
            Duration::from_millis(config.timeout_ms),
        )
    }

    /// Token to send, or `AuthRequired` when the session policy demands one
    fn session_token(&self) -> PhishGuardResult<Option<String>> {
        let token = self.session.read().token.clone().filter(|t| !t.is_empty());
        if token.is_none() && self.config.read().require_session {
            return Err(PhishGuardError::AuthRequired);
        }
        Ok(token)
    }

    /// Clear the session after the backend rejected `rejected`. A token set
    /// by a newer login is left alone.
    fn invalidate_session(&self, rejected: &str) {
        {
            let mut session = self.session.write();
            if session.token.as_deref() != Some(rejected) {
                return;
            }
            session.token = None;
        }

        log::warn!("Session rejected by backend, token cleared");
        if let Err(e) = self.store.clear_token() {
            log::error!("Failed to clear stored token: {}", e);
        }
    }

    // ========================================================================
    // OPERATIONS
    // ========================================================================

    /// Check backend availability. Never fails; every outcome is a status.
    pub async fn check_health(&self) -> HealthReport {
        let (url, timeout) = self.endpoint("/health");

        let response = match self.http_client.get(&url).timeout(timeout).send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                return HealthReport {
                    status: HealthStatus::Timeout,
                    message: "API request timed out".to_string(),
                    version: None,
                }
            }
            Err(e) => {
                log::debug!("Health check failed: {}", e);
                return HealthReport {
                    status: HealthStatus::Offline,
                    message: format!("Could not connect to API: {}", e),
                    version: None,
                };
            }
        };

        let status = response.status();
        if !status.is_success() {
            return HealthReport {
                status: HealthStatus::Error,
                message: format!("API returned status {}", status.as_u16()),
                version: None,
            };
        }

        let body: HealthResponse = response.json().await.unwrap_or_default();
        HealthReport {
            status: HealthStatus::Online,
            message: "API is available".to_string(),
            version: Some(body.version.unwrap_or_else(|| "unknown".to_string())),
        }
    }

    pub async fn analyze_url(&self, url: &str) -> PhishGuardResult<ScanResult> {
        self.analyze(&ScanRequest::Url(url.to_string())).await
    }

    pub async fn analyze_email(&self, content: &str) -> PhishGuardResult<ScanResult> {
        self.analyze(&ScanRequest::EmailContent(content.to_string())).await
    }

    /// Classify a URL or a block of content
    pub async fn analyze(&self, request: &ScanRequest) -> PhishGuardResult<ScanResult> {
        let request = request.sanitized()?;
        let token = self.session_token()?;
        let (url, timeout) = self.endpoint("/predict");

        let body = match &request {
            ScanRequest::Url(target) => PredictRequest {
                url: Some(target.as_str()),
                email_content: None,
                scan_type: SCAN_TYPE_REALTIME,
            },
            ScanRequest::EmailContent(content) => PredictRequest {
                url: None,
                email_content: Some(content.as_str()),
                scan_type: SCAN_TYPE_REALTIME,
            },
        };

        log::debug!("Requesting {} classification", request.kind());

        let builder = self.http_client.post(&url).json(&body);
        let response = self.send(builder, token.as_deref(), timeout).await?;
        let raw: PredictResponse = read_json(response).await?;
        let result = raw.into_result()?;

        log::info!(
            "Scan {}: {} ({}%)",
            result.scan_id,
            result.prediction.as_str(),
            result.confidence_percent()
        );
        Ok(result)
    }

    /// Report whether a scan verdict was correct. The scan id is checked by
    /// the backend only.
    pub async fn submit_feedback(
        &self,
        scan_id: &str,
        is_correct: bool,
        comment: &str,
    ) -> PhishGuardResult<FeedbackAck> {
        let token = self.session_token()?;
        let (url, timeout) = self.endpoint("/feedback");

        let body = FeedbackRequest { scan_id, is_correct, comment };
        let builder = self.http_client.post(&url).json(&body);
        let response = self.send(builder, token.as_deref(), timeout).await?;

        // Any 2xx is an acknowledgement, whatever the body holds
        let ack = response.json::<FeedbackAck>().await.unwrap_or_default();
        log::info!("Feedback submitted for {} (correct: {})", scan_id, is_correct);
        Ok(ack)
    }

    /// Log in and persist the returned token
    pub async fn login(&self, email: &str, password: &str) -> PhishGuardResult<LoginOutcome> {
        let (url, timeout) = self.endpoint("/auth/login");

        let response = self
            .http_client
            .post(&url)
            .json(&LoginRequest { email, password })
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    PhishGuardError::Timeout
                } else {
                    PhishGuardError::unknown(e.to_string())
                }
            })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            let message = error_message(status, &response.text().await.unwrap_or_default());
            log::warn!("Login rejected for {}", email);
            return Err(PhishGuardError::AuthFailed(message));
        }
        if !status.is_success() {
            let message = error_message(status, &response.text().await.unwrap_or_default());
            return Err(PhishGuardError::unknown(message));
        }

        let body: LoginResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                PhishGuardError::Timeout
            } else {
                PhishGuardError::unknown(format!("invalid login response: {}", e))
            }
        })?;

        if body.token.is_empty() {
            return Err(PhishGuardError::unknown("login response carried no token"));
        }

        self.set_token(body.token)?;
        log::info!("Logged in as {}", body.user_id);

        Ok(LoginOutcome {
            success: true,
            session: SessionInfo {
                user_id: body.user_id,
                expires_in: body.expires_in,
            },
        })
    }

    /// Fetch the backend's aggregate counters
    pub async fn fetch_server_stats(&self) -> PhishGuardResult<ServerStats> {
        let token = self.session_token()?;
        let (url, timeout) = self.endpoint("/stats");

        let builder = self.http_client.get(&url);
        let response = self.send(builder, token.as_deref(), timeout).await?;
        read_json(response).await
    }

    // ========================================================================
    // TRANSPORT
    // ========================================================================

    /// Send one request and map every non-2xx outcome onto the error taxonomy
    async fn send(
        &self,
        builder: RequestBuilder,
        token: Option<&str>,
        timeout: Duration,
    ) -> PhishGuardResult<Response> {
        let mut builder = builder.timeout(timeout);
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await.map_err(transport_error)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::UNAUTHORIZED {
            return match token {
                Some(token) => {
                    self.invalidate_session(token);
                    Err(PhishGuardError::AuthExpired)
                }
                None => Err(PhishGuardError::AuthRequired),
            };
        }

        let message = error_message(status, &response.text().await.unwrap_or_default());
        log::error!("Backend returned {}: {}", status.as_u16(), message);
        Err(PhishGuardError::server(status.as_u16(), message))
    }
}

fn transport_error(e: reqwest::Error) -> PhishGuardError {
    if e.is_timeout() {
        PhishGuardError::Timeout
    } else {
        PhishGuardError::network(e.to_string())
    }
}

async fn read_json<T: DeserializeOwned>(response: Response) -> PhishGuardResult<T> {
    response.json().await.map_err(|e| {
        if e.is_timeout() {
            PhishGuardError::Timeout
        } else if e.is_decode() {
            PhishGuardError::unknown(format!("invalid response body: {}", e))
        } else {
            transport_error(e)
        }
    })
}

/// Message from `{"error": {"message": ..}}`, `{"error": ".."}` or
/// `{"message": ..}`, else a generic one built from the status
fn error_message(status: StatusCode, body: &str) -> String {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    parsed
        .as_ref()
        .and_then(|v| {
            v.pointer("/error/message")
                .or_else(|| v.get("error").filter(|e| e.is_string()))
                .or_else(|| v.get("message"))
        })
        .and_then(Value::as_str)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("API error: {}", status.as_u16()))
}
