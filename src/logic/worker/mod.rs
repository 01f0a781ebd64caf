//! Background Worker
//!
//! Reacts to navigation events and scan requests from any extension context.
//!
//! Per tab: `Idle -> Scanning -> {Completed, Failed}`, back to `Idle` once the
//! badge-reset delay expires. A phishing warning stays on the tab until the
//! next navigation or a later non-phishing result. Only a verdict touches
//! persisted state; failures are logged and answered with an error result.

pub mod badge;

#[cfg(test)]
mod tests;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};

pub use badge::{Badge, BadgeState, LogBadge, MemoryBadge, TabId};

use super::client::{ApiClient, ScanRequest, ScanResult};
use super::error::{ErrorKind, PhishGuardError};
use super::storage::StateStore;
use crate::constants::BADGE_RESET_DELAY_MS;

/// Content-extraction script injected into a freshly loaded page
#[async_trait]
pub trait ContentInjector: Send + Sync {
    async fn inject(&self, tab_id: TabId) -> anyhow::Result<()>;
}

/// Injector for hosts without content scripts
pub struct NoopInjector;

#[async_trait]
impl ContentInjector for NoopInjector {
    async fn inject(&self, _tab_id: TabId) -> anyhow::Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanPhase {
    Idle,
    Scanning,
    Completed,
    Failed,
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub badge_reset_delay: Duration,
    pub inject_content: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            badge_reset_delay: Duration::from_millis(BADGE_RESET_DELAY_MS),
            inject_content: true,
        }
    }
}

/// A scan request and the tab it came from, if any
#[derive(Debug, Clone)]
pub struct WorkerRequest {
    pub tab_id: Option<TabId>,
    pub request: ScanRequest,
}

impl WorkerRequest {
    pub fn url(tab_id: Option<TabId>, url: impl Into<String>) -> Self {
        Self { tab_id, request: ScanRequest::Url(url.into()) }
    }

    pub fn email(tab_id: Option<TabId>, content: impl Into<String>) -> Self {
        Self { tab_id, request: ScanRequest::EmailContent(content.into()) }
    }
}

/// Which badge states a scheduled clear may remove
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClearScope {
    /// Presentation timeout after navigation; leaves a warning in place
    KeepWarning,
    /// Non-phishing result; supersedes an earlier warning
    Any,
}

#[derive(Debug, Clone, Copy)]
struct TabEntry {
    phase: ScanPhase,
    badge: BadgeState,
    // Bumped on every badge change so stale scheduled clears are dropped
    generation: u64,
}

impl Default for TabEntry {
    fn default() -> Self {
        Self {
            phase: ScanPhase::Idle,
            badge: BadgeState::Clear,
            generation: 0,
        }
    }
}

struct WorkerInner {
    client: Arc<ApiClient>,
    store: StateStore,
    badge: Arc<dyn Badge>,
    injector: Arc<dyn ContentInjector>,
    config: WorkerConfig,
    tabs: Mutex<HashMap<TabId, TabEntry>>,
}

#[derive(Clone)]
pub struct BackgroundWorker {
    inner: Arc<WorkerInner>,
}

impl BackgroundWorker {
    pub fn new(
        client: Arc<ApiClient>,
        store: StateStore,
        badge: Arc<dyn Badge>,
        injector: Arc<dyn ContentInjector>,
        config: WorkerConfig,
    ) -> Self {
        if let Err(e) = store.initialize() {
            log::error!("Failed to initialize extension state: {}", e);
        }

        Self {
            inner: Arc::new(WorkerInner {
                client,
                store,
                badge,
                injector,
                config,
                tabs: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn phase(&self, tab_id: TabId) -> ScanPhase {
        self.inner
            .tabs
            .lock()
            .get(&tab_id)
            .map_or(ScanPhase::Idle, |entry| entry.phase)
    }

    fn is_enabled(&self) -> bool {
        match self.inner.store.load_state() {
            Ok(state) => state.enabled,
            Err(e) => {
                log::error!("Failed to load extension state: {}", e);
                false
            }
        }
    }

    // ========================================================================
    // EVENTS
    // ========================================================================

    /// A frame finished loading. Returns true when the tab entered `Scanning`.
    pub async fn on_navigation_completed(&self, tab_id: TabId, frame_id: u32) -> bool {
        if frame_id != 0 || !self.is_enabled() {
            return false;
        }

        self.set_tab(tab_id, ScanPhase::Scanning, BadgeState::Scanning);
        // Presentation timeout only; not tied to any scan finishing
        self.schedule_clear(tab_id, ClearScope::KeepWarning);

        if self.inner.config.inject_content {
            if let Err(e) = self.inner.injector.inject(tab_id).await {
                log::error!("Failed to inject content script into tab {}: {}", tab_id, e);
            }
        }
        true
    }

    /// A tab started loading a new page
    pub fn on_tab_loading(&self, tab_id: TabId) {
        self.set_tab(tab_id, ScanPhase::Idle, BadgeState::Clear);
    }

    /// A tab was closed. Pending clears for it become no-ops.
    pub fn on_tab_removed(&self, tab_id: TabId) {
        if self.inner.tabs.lock().remove(&tab_id).is_some() {
            log::debug!("Dropped state for closed tab {}", tab_id);
        }
    }

    pub fn tracked_tabs(&self) -> usize {
        self.inner.tabs.lock().len()
    }

    // ========================================================================
    // SCAN REQUESTS
    // ========================================================================

    /// Run one scan request to completion. Always produces a result.
    pub async fn handle(&self, request: WorkerRequest) -> ScanResult {
        // The client validates and sanitizes before touching the network
        let result = match self.inner.client.analyze(&request.request).await {
            Ok(result) => result,
            Err(e) if e.kind() == ErrorKind::InvalidInput => {
                log::warn!("Rejected {} scan request: {}", request.request.kind(), e);
                ScanResult::failed(&e)
            }
            Err(e) => {
                log::error!("{} scan failed: {}", request.request.kind(), e);
                ScanResult::failed(&e)
            }
        };

        if result.prediction.is_verdict() {
            self.record_verdict(&result);
        }
        if let Some(tab_id) = request.tab_id {
            self.show_result(tab_id, &result);
        }
        result
    }

    fn record_verdict(&self, result: &ScanResult) {
        if let Err(e) = self.inner.store.record_verdict(result.prediction, Utc::now()) {
            log::error!("Failed to persist scan outcome: {}", e);
        }
    }

    fn show_result(&self, tab_id: TabId, result: &ScanResult) {
        if result.is_phishing() {
            self.set_tab(tab_id, ScanPhase::Completed, BadgeState::Warning);
            return;
        }

        let phase = if result.prediction.is_verdict() {
            ScanPhase::Completed
        } else {
            ScanPhase::Failed
        };
        {
            let mut tabs = self.inner.tabs.lock();
            let entry = tabs.entry(tab_id).or_default();
            entry.phase = phase;
            entry.generation += 1;
        }
        self.schedule_clear(tab_id, ClearScope::Any);
    }

    // ========================================================================
    // BADGE
    // ========================================================================

    fn set_tab(&self, tab_id: TabId, phase: ScanPhase, badge: BadgeState) {
        {
            let mut tabs = self.inner.tabs.lock();
            let entry = tabs.entry(tab_id).or_default();
            entry.phase = phase;
            entry.badge = badge;
            entry.generation += 1;
        }
        self.inner.badge.set(tab_id, badge);
    }

    fn schedule_clear(&self, tab_id: TabId, scope: ClearScope) {
        let generation = match self.inner.tabs.lock().get(&tab_id) {
            Some(entry) => entry.generation,
            None => return,
        };

        let worker = self.clone();
        let delay = self.inner.config.badge_reset_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            worker.clear_if_current(tab_id, generation, scope);
        });
    }

    fn clear_if_current(&self, tab_id: TabId, generation: u64, scope: ClearScope) {
        {
            let mut tabs = self.inner.tabs.lock();
            let entry = match tabs.get_mut(&tab_id) {
                Some(entry) => entry,
                None => return,
            };
            if entry.generation != generation {
                return;
            }
            if scope == ClearScope::KeepWarning && entry.badge == BadgeState::Warning {
                return;
            }
            entry.phase = ScanPhase::Idle;
            entry.badge = BadgeState::Clear;
        }
        self.inner.badge.set(tab_id, BadgeState::Clear);
    }

    // ========================================================================
    // MESSAGE LOOP
    // ========================================================================

    /// Run the worker as a task fed through a channel. Each scan request
    /// gets exactly one reply, sent once its classification call resolves.
    pub fn spawn(self) -> WorkerHandle {
        let (tx, mut rx) = mpsc::channel::<WorkerMessage>(64);

        tokio::spawn(async move {
            log::info!("Background worker started");
            while let Some(message) = rx.recv().await {
                let worker = self.clone();
                match message {
                    WorkerMessage::Scan { request, reply } => {
                        // Scans overlap; a slow backend never blocks other events
                        tokio::spawn(async move {
                            let result = worker.handle(request).await;
                            if reply.send(result).is_err() {
                                log::debug!("Scan requester went away before the reply");
                            }
                        });
                    }
                    WorkerMessage::NavigationCompleted { tab_id, frame_id } => {
                        tokio::spawn(async move {
                            worker.on_navigation_completed(tab_id, frame_id).await;
                        });
                    }
                    WorkerMessage::TabLoading { tab_id } => worker.on_tab_loading(tab_id),
                    WorkerMessage::TabRemoved { tab_id } => worker.on_tab_removed(tab_id),
                }
            }
            log::info!("Background worker stopped");
        });

        WorkerHandle { tx }
    }
}

enum WorkerMessage {
    Scan {
        request: WorkerRequest,
        reply: oneshot::Sender<ScanResult>,
    },
    NavigationCompleted {
        tab_id: TabId,
        frame_id: u32,
    },
    TabLoading {
        tab_id: TabId,
    },
    TabRemoved {
        tab_id: TabId,
    },
}

/// Sender side of a running worker
#[derive(Clone)]
pub struct WorkerHandle {
    tx: mpsc::Sender<WorkerMessage>,
}

impl WorkerHandle {
    /// Send a scan request and wait for its reply
    pub async fn scan(&self, request: WorkerRequest) -> ScanResult {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(WorkerMessage::Scan { request, reply }).await.is_err() {
            return ScanResult::failed(&stopped());
        }
        rx.await.unwrap_or_else(|_| ScanResult::failed(&stopped()))
    }

    pub async fn navigation_completed(&self, tab_id: TabId, frame_id: u32) {
        self.notify(WorkerMessage::NavigationCompleted { tab_id, frame_id }).await;
    }

    pub async fn tab_loading(&self, tab_id: TabId) {
        self.notify(WorkerMessage::TabLoading { tab_id }).await;
    }

    pub async fn tab_removed(&self, tab_id: TabId) {
        self.notify(WorkerMessage::TabRemoved { tab_id }).await;
    }

    async fn notify(&self, message: WorkerMessage) {
        if self.tx.send(message).await.is_err() {
            log::warn!("Background worker is not running, event dropped");
        }
    }
}

fn stopped() -> PhishGuardError {
    PhishGuardError::unknown("background worker stopped")
}
