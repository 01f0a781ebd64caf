//! Popup Controller
//!
//! Orchestrates the popup: state and statistics view models, on-demand scans
//! of the active tab, result rendering and verdict feedback. Rendering itself
//! belongs to the host; everything here returns plain view structs.


use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;

use super::client::{ApiClient, FeedbackAck, HealthReport, HealthStatus, ScanResult, ServerStats};
use super::error::{PhishGuardError, PhishGuardResult};
use super::state::{ExtensionState, UsageStats};
use super::storage::StateStore;
use super::validators;
use super::worker::TabId;

pub const FEEDBACK_THANKS: &str = "Thank you for your feedback!";
pub const FEEDBACK_FAILED: &str = "Error submitting feedback. Please try again.";

// ============================================================================
// COLLABORATORS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveTab {
    pub id: TabId,
    pub url: String,
}

/// Access to the focused browser tab
#[async_trait]
pub trait TabProvider: Send + Sync {
    async fn active_tab(&self) -> anyhow::Result<ActiveTab>;

    /// Extracted page text, None when the content script cannot answer
    async fn page_content(&self, tab_id: TabId) -> anyhow::Result<Option<String>>;
}

// ============================================================================
// VIEW MODELS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum PopupView {
    /// No session while one is required
    Login,
    Main(MainView),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MainView {
    pub enabled: bool,
    pub status_label: &'static str,
    pub detection_count: u64,
    pub last_scan_label: String,
    pub scan_enabled: bool,
}

impl MainView {
    pub fn from_state(state: &ExtensionState, now: DateTime<Utc>) -> Self {
        Self {
            enabled: state.enabled,
            status_label: if state.enabled { "Active" } else { "Inactive" },
            detection_count: state.detection_count,
            last_scan_label: last_scan_label(state.last_scan_timestamp, now),
            scan_enabled: state.enabled,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultView {
    pub verdict: String,
    pub confidence: String,
    pub features: String,
    pub is_phishing: bool,
    pub is_error: bool,
    /// Feedback can reference this result
    pub scan_id: Option<String>,
}

impl ResultView {
    pub fn from_result(result: &ScanResult) -> Self {
        if !result.prediction.is_verdict() {
            return Self::error(result.error.as_deref().unwrap_or("Unknown error"));
        }

        let features = match &result.features_analyzed {
            Some(features) if !features.is_empty() => features.join(", "),
            _ => "Basic URL analysis".to_string(),
        };

        let verdict = if result.is_phishing() {
            "Likely Phishing"
        } else {
            "Likely Safe"
        };

        Self {
            verdict: verdict.to_string(),
            confidence: format!("{}%", result.confidence_percent()),
            features,
            is_phishing: result.is_phishing(),
            is_error: false,
            scan_id: Some(result.scan_id.clone()),
        }
    }

    pub fn error(message: &str) -> Self {
        Self {
            verdict: "Error".to_string(),
            confidence: "N/A".to_string(),
            features: message.to_string(),
            is_phishing: false,
            is_error: true,
            scan_id: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsView {
    pub total_scans: u64,
    pub phishing_detected: u64,
    pub detection_rate: String,
    pub days_active: String,
}

impl StatsView {
    pub fn from_stats(stats: &UsageStats, now: DateTime<Utc>) -> Self {
        Self {
            total_scans: stats.scans_performed,
            phishing_detected: stats.phishing_detected,
            detection_rate: stats
                .detection_rate()
                .map_or_else(|| "N/A".to_string(), |rate| format!("{:.1}%", rate)),
            days_active: stats
                .days_active(now)
                .map_or_else(|| "Unknown".to_string(), |days| days.to_string()),
        }
    }
}

/// Relative "last scan" label
pub fn last_scan_label(last_scan: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let last_scan = match last_scan {
        Some(ts) => ts,
        None => return "Never".to_string(),
    };

    let minutes = (now - last_scan).num_minutes();
    if minutes < 1 {
        return "Just now".to_string();
    }
    if minutes < 60 {
        return format!("{} minute{} ago", minutes, plural(minutes));
    }

    let hours = minutes / 60;
    if hours < 24 {
        return format!("{} hour{} ago", hours, plural(hours));
    }
    last_scan.format("%Y-%m-%d").to_string()
}

fn plural(n: i64) -> &'static str {
    if n == 1 { "" } else { "s" }
}

// ============================================================================
// FEEDBACK CONTROLS
// ============================================================================

/// Thumbs up/down availability, shared with the host UI
#[derive(Debug, Clone)]
pub struct FeedbackControls {
    enabled: Arc<AtomicBool>,
}

impl Default for FeedbackControls {
    fn default() -> Self {
        Self {
            enabled: Arc::new(AtomicBool::new(true)),
        }
    }
}

impl FeedbackControls {
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Disable until the returned guard drops; None if already disabled
    fn begin(&self) -> Option<InFlight<'_>> {
        self.enabled
            .compare_exchange(true, false, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| InFlight(&self.enabled))
    }
}

struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

// ============================================================================
// CONTROLLER
// ============================================================================

pub struct PopupController {
    client: Arc<ApiClient>,
    store: StateStore,
    tabs: Arc<dyn TabProvider>,
    last_result: Mutex<Option<ScanResult>>,
    feedback_controls: FeedbackControls,
    feedback_message: Mutex<Option<String>>,
}

impl PopupController {
    pub fn new(client: Arc<ApiClient>, store: StateStore, tabs: Arc<dyn TabProvider>) -> Self {
        Self {
            client,
            store,
            tabs,
            last_result: Mutex::new(None),
            feedback_controls: FeedbackControls::default(),
            feedback_message: Mutex::new(None),
        }
    }

    fn load_state(&self) -> ExtensionState {
        self.store.load_state().unwrap_or_else(|e| {
            log::error!("Failed to load state: {}", e);
            ExtensionState::default()
        })
    }

    /// Initial view: login gate, then the state panel
    pub fn load(&self) -> PopupView {
        if self.client.config().require_session && !self.client.is_authenticated() {
            return PopupView::Login;
        }
        PopupView::Main(MainView::from_state(&self.load_state(), Utc::now()))
    }

    pub fn set_enabled(&self, enabled: bool) -> PhishGuardResult<MainView> {
        let state = self.store.update_state(|state| state.enabled = enabled)?;
        log::info!("Protection {}", if enabled { "enabled" } else { "disabled" });
        Ok(MainView::from_state(&state, Utc::now()))
    }

    pub fn statistics(&self) -> StatsView {
        let stats = self.store.load_stats().unwrap_or_else(|e| {
            log::error!("Error loading statistics: {}", e);
            UsageStats::default()
        });
        StatsView::from_stats(&stats, Utc::now())
    }

    /// Backend-wide counters; None without a session or on failure
    pub async fn server_statistics(&self) -> Option<ServerStats> {
        if !self.client.is_authenticated() {
            return None;
        }
        match self.client.fetch_server_stats().await {
            Ok(stats) => Some(stats),
            Err(e) => {
                log::error!("Error fetching API statistics: {}", e);
                None
            }
        }
    }

    pub async fn check_api_health(&self) -> HealthReport {
        let report = self.client.check_health().await;
        if report.status == HealthStatus::Online {
            log::info!("API is online ({})", report.version.as_deref().unwrap_or("unknown"));
        } else {
            log::warn!("API health check failed: {}", report.message);
        }
        report
    }

    /// Scan the focused tab, preferring its extracted content over the URL
    pub async fn scan_active_tab(&self) -> ResultView {
        if !self.load_state().enabled {
            return ResultView::error("PhishGuard is disabled");
        }

        match self.run_scan().await {
            Ok(result) => {
                if let Err(e) = self.store.record_verdict(result.prediction, Utc::now()) {
                    log::error!("Failed to save state: {}", e);
                }
                let view = ResultView::from_result(&result);
                *self.last_result.lock() = Some(result);
                *self.feedback_message.lock() = None;
                view
            }
            Err(e) => {
                log::error!("Scan failed: {}", e);
                // Feedback must not fall through to an older verdict
                *self.last_result.lock() = None;
                *self.feedback_message.lock() = None;
                ResultView::error(&e.to_string())
            }
        }
    }

    async fn run_scan(&self) -> PhishGuardResult<ScanResult> {
        let tab = self
            .tabs
            .active_tab()
            .await
            .map_err(|e| PhishGuardError::unknown(format!("no active tab: {}", e)))?;

        if !validators::is_valid_url(&tab.url) {
            return Err(PhishGuardError::invalid_url("Can only scan web pages"));
        }

        match self.tabs.page_content(tab.id).await {
            Ok(Some(content)) if !content.trim().is_empty() => {
                self.client.analyze_email(&content).await
            }
            Ok(_) => self.client.analyze_url(&tab.url).await,
            Err(e) => {
                log::debug!("Content script unavailable on tab {}: {}", tab.id, e);
                self.client.analyze_url(&tab.url).await
            }
        }
    }

    pub fn last_result(&self) -> Option<ScanResult> {
        self.last_result.lock().clone()
    }

    pub fn feedback_controls(&self) -> FeedbackControls {
        self.feedback_controls.clone()
    }

    pub fn feedback_message(&self) -> Option<String> {
        self.feedback_message.lock().clone()
    }

    /// Report whether the last verdict was right. Controls stay disabled
    /// while the submission is in flight.
    pub async fn submit_feedback(
        &self,
        is_correct: bool,
        comment: &str,
    ) -> PhishGuardResult<FeedbackAck> {
        let scan_id = self
            .last_result
            .lock()
            .as_ref()
            .filter(|r| r.prediction.is_verdict())
            .map(|r| r.scan_id.clone())
            .ok_or_else(|| PhishGuardError::unknown("No scan result to submit feedback for"))?;

        let _in_flight = self
            .feedback_controls
            .begin()
            .ok_or_else(|| PhishGuardError::unknown("Feedback submission already in progress"))?;

        let outcome = self.client.submit_feedback(&scan_id, is_correct, comment).await;
        let message = match &outcome {
            Ok(_) => FEEDBACK_THANKS,
            Err(e) => {
                log::error!("Error submitting feedback: {}", e);
                FEEDBACK_FAILED
            }
        };
        *self.feedback_message.lock() = Some(message.to_string());
        outcome
    }
}
