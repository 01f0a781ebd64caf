//! Commands - one entry point per user action
//!
//! Every command returns `Result<T, String>` with a serializable `T` so hosts
//! can hand results straight to a UI or print them.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::logic::client::{
    ApiClient, FeedbackAck, HealthReport, LoginOutcome, ScanResult, ServerStats,
};
use crate::logic::error::PhishGuardResult;
use crate::logic::popup::{PopupController, PopupView, ResultView, StatsView, TabProvider};
use crate::logic::state::ApiConfig;
use crate::logic::storage::StateStore;
use crate::logic::worker::{
    BackgroundWorker, LogBadge, NoopInjector, WorkerConfig, WorkerRequest,
};

// ============================================================================
// CONTEXT
// ============================================================================

/// Components wired over one state store
pub struct AppContext {
    pub store: StateStore,
    pub client: Arc<ApiClient>,
    pub worker: BackgroundWorker,
    pub popup: PopupController,
}

impl AppContext {
    pub fn new(store: StateStore, tabs: Arc<dyn TabProvider>) -> PhishGuardResult<Self> {
        let client = Arc::new(ApiClient::new(store.clone())?);
        let worker = BackgroundWorker::new(
            client.clone(),
            store.clone(),
            Arc::new(LogBadge),
            Arc::new(NoopInjector),
            WorkerConfig::default(),
        );
        let popup = PopupController::new(client.clone(), store.clone(), tabs);

        Ok(Self { store, client, worker, popup })
    }
}

// ============================================================================
// DATA STRUCTURES
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct StatusInfo {
    pub view: PopupView,
    pub authenticated: bool,
    pub api_url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatisticsInfo {
    pub local: StatsView,
    pub server: Option<ServerStats>,
}

/// Partial config update; unset fields keep their value
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigUpdate {
    pub api_url: Option<String>,
    pub timeout_ms: Option<u64>,
    pub require_session: Option<bool>,
}

// ============================================================================
// COMMANDS
// ============================================================================

pub fn get_status(ctx: &AppContext) -> StatusInfo {
    StatusInfo {
        view: ctx.popup.load(),
        authenticated: ctx.client.is_authenticated(),
        api_url: ctx.client.config().base_url,
    }
}

pub fn set_enabled(ctx: &AppContext, enabled: bool) -> Result<StatusInfo, String> {
    ctx.popup.set_enabled(enabled).map_err(|e| e.to_string())?;
    Ok(get_status(ctx))
}

pub async fn check_health(ctx: &AppContext) -> HealthReport {
    ctx.popup.check_api_health().await
}

pub async fn login(ctx: &AppContext, email: &str, password: &str) -> Result<LoginOutcome, String> {
    ctx.client.login(email, password).await.map_err(|e| e.to_string())
}

pub fn logout(ctx: &AppContext) -> Result<bool, String> {
    ctx.client.logout().map_err(|e| e.to_string())?;
    Ok(true)
}

/// Scan a URL through the background worker
pub async fn scan_url(ctx: &AppContext, url: &str) -> ScanResult {
    ctx.worker.handle(WorkerRequest::url(None, url)).await
}

/// Scan email or page text through the background worker
pub async fn scan_email(ctx: &AppContext, content: &str) -> ScanResult {
    ctx.worker.handle(WorkerRequest::email(None, content)).await
}

/// Scan the active tab the way the popup does
pub async fn scan_page(ctx: &AppContext) -> ResultView {
    ctx.popup.scan_active_tab().await
}

pub async fn submit_feedback(
    ctx: &AppContext,
    scan_id: &str,
    is_correct: bool,
    comment: &str,
) -> Result<FeedbackAck, String> {
    ctx.client
        .submit_feedback(scan_id, is_correct, comment)
        .await
        .map_err(|e| e.to_string())
}

pub async fn get_statistics(ctx: &AppContext) -> StatisticsInfo {
    StatisticsInfo {
        local: ctx.popup.statistics(),
        server: ctx.popup.server_statistics().await,
    }
}

pub fn get_config(ctx: &AppContext) -> ApiConfig {
    ctx.client.config()
}

pub fn update_config(ctx: &AppContext, update: ConfigUpdate) -> Result<ApiConfig, String> {
    let mut config = ctx.client.config();
    if let Some(url) = update.api_url {
        config.base_url = url;
    }
    if let Some(timeout_ms) = update.timeout_ms {
        config.timeout_ms = timeout_ms;
    }
    if let Some(require_session) = update.require_session {
        config.require_session = require_session;
    }

    ctx.client.update_config(config.clone()).map_err(|e| e.to_string())?;
    Ok(config)
}
