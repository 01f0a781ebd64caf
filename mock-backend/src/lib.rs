//! PhishGuard Mock Classification Backend
//!
//! Speaks the HTTP surface the PhishGuard client consumes:
//!
//! ```text
//! GET  /health      -> {status, version}
//! POST /predict     -> {prediction, confidence, scan_id, scan_time, features_analyzed}
//! POST /feedback    -> {status, message}
//! POST /auth/login  -> {token, user_id, expires_in}
//! GET  /stats       -> {total_scans, phishing_detected, feedback_received}
//! ```
//!
//! Behaviour can be scripted at runtime (latency, forced status codes, fixed
//! verdicts, token revocation) so client tests can drive every failure path.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod model;

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use parking_lot::RwLock;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub use config::Config;
pub use error::{AppError, AppResult};

/// Fixed verdict returned by /predict instead of the stub model
#[derive(Debug, Clone)]
pub struct ScriptedVerdict {
    pub prediction: String,
    pub confidence: f64,
    pub scan_id: Option<String>,
    pub features_analyzed: Option<Vec<String>>,
}

impl ScriptedVerdict {
    pub fn new(prediction: &str, confidence: f64) -> Self {
        Self {
            prediction: prediction.to_string(),
            confidence,
            scan_id: None,
            features_analyzed: None,
        }
    }

    pub fn with_scan_id(mut self, scan_id: &str) -> Self {
        self.scan_id = Some(scan_id.to_string());
        self
    }
}

/// Runtime-scriptable behaviour
#[derive(Debug, Clone, Default)]
pub struct MockBehavior {
    /// Extra delay before any request is handled
    pub latency: Duration,
    /// Force /predict and /feedback to answer with this status
    pub fail_with: Option<u16>,
    /// Message carried by a forced failure
    pub fail_message: Option<String>,
    /// Fixed verdict for /predict
    pub verdict: Option<ScriptedVerdict>,
}

/// Feedback submission as received by the backend
#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackRecord {
    pub scan_id: String,
    pub is_correct: bool,
    pub comment: String,
}

/// Mutable backend state shared by all handlers
#[derive(Default)]
pub struct MockInner {
    pub behavior: RwLock<MockBehavior>,
    pub tokens: RwLock<HashSet<String>>,
    pub feedback: RwLock<Vec<FeedbackRecord>>,
    pub requests: AtomicU64,
    pub scans: AtomicU64,
    pub phishing: AtomicU64,
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub inner: Arc<MockInner>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            inner: Arc::new(MockInner::default()),
        }
    }

    /// Issue and remember a fresh bearer token
    pub fn issue_token(&self) -> String {
        let token = format!("tok-{}", uuid::Uuid::new_v4().simple());
        self.inner.tokens.write().insert(token.clone());
        token
    }

    pub fn is_valid_token(&self, token: &str) -> bool {
        self.inner.tokens.read().contains(token)
    }

    pub fn behavior(&self) -> MockBehavior {
        self.inner.behavior.read().clone()
    }
}

/// Create the router with all routes (no prefix)
pub fn create_router(state: AppState) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(handlers::health::check))
        .route("/auth/login", post(handlers::auth::login));

    // Token-protected routes
    let protected_routes = Router::new()
        .route("/predict", post(handlers::predict::predict))
        .route("/feedback", post(handlers::feedback::submit))
        .route("/stats", get(handlers::stats::summary))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_token,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::traffic::count_and_delay,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// A running backend bound to an ephemeral local port
pub struct MockServer {
    addr: SocketAddr,
    state: AppState,
    handle: tokio::task::JoinHandle<()>,
}

impl MockServer {
    /// Start the backend on 127.0.0.1 with a random port
    pub async fn start(config: Config) -> std::io::Result<Self> {
        let state = AppState::new(config);
        let app = create_router(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!("Mock backend stopped: {}", e);
            }
        });

        tracing::debug!("Mock backend listening on http://{}", addr);
        Ok(Self { addr, state, handle })
    }

    /// Base URL to hand to a client (routes are served without prefix)
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn issue_token(&self) -> String {
        self.state.issue_token()
    }

    pub fn revoke_all_tokens(&self) {
        self.state.inner.tokens.write().clear();
    }

    pub fn set_behavior(&self, behavior: MockBehavior) {
        *self.state.inner.behavior.write() = behavior;
    }

    /// Total requests that reached the backend
    pub fn request_count(&self) -> u64 {
        self.state.inner.requests.load(Ordering::SeqCst)
    }

    pub fn feedback(&self) -> Vec<FeedbackRecord> {
        self.state.inner.feedback.read().clone()
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[tokio::test]
    async fn test_predict_requires_token() {
        let server = MockServer::start(Config::default()).await.unwrap();
        let client = reqwest::Client::new();

        let resp = client
            .post(format!("{}/predict", server.base_url()))
            .json(&json!({ "url": "https://example.com", "scan_type": "REALTIME" }))
            .send()
            .await
            .unwrap();

        assert_eq!(resp.status().as_u16(), 401);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["error"]["code"], "PHISH-401");
        assert_eq!(server.request_count(), 1);
    }

    #[tokio::test]
    async fn test_login_then_predict_with_scripted_verdict() {
        let server = MockServer::start(Config::default()).await.unwrap();
        let client = reqwest::Client::new();

        let login: Value = client
            .post(format!("{}/auth/login", server.base_url()))
            .json(&json!({ "email": "demo@phishguard.example.com", "password": "securePassword123" }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let token = login["token"].as_str().unwrap().to_string();
        assert_eq!(login["expires_in"], 1800);

        server.set_behavior(MockBehavior {
            verdict: Some(ScriptedVerdict::new("phishing", 0.92).with_scan_id("scan-1")),
            ..Default::default()
        });

        let body: Value = client
            .post(format!("{}/predict", server.base_url()))
            .bearer_auth(&token)
            .json(&json!({ "url": "http://example-bank-login.test/verify", "scan_type": "REALTIME" }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        assert_eq!(body["prediction"], "phishing");
        assert_eq!(body["scan_id"], "scan-1");
    }

    #[tokio::test]
    async fn test_forced_failure_on_feedback() {
        let server = MockServer::start(Config::default()).await.unwrap();
        let token = server.issue_token();
        server.set_behavior(MockBehavior {
            fail_with: Some(500),
            fail_message: Some("feedback store offline".to_string()),
            ..Default::default()
        });

        let resp = reqwest::Client::new()
            .post(format!("{}/feedback", server.base_url()))
            .bearer_auth(&token)
            .json(&json!({ "scan_id": "scan-1", "is_correct": true, "comment": "" }))
            .send()
            .await
            .unwrap();

        assert_eq!(resp.status().as_u16(), 500);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["error"]["message"], "feedback store offline");
        assert!(server.feedback().is_empty());
    }
}
