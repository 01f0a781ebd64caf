//! BackgroundWorker tests

use std::sync::atomic::{AtomicUsize, Ordering};

use phishguard_mock::{Config as MockConfig, MockBehavior, MockServer, ScriptedVerdict};

use super::*;
use crate::logic::client::Prediction;
use crate::logic::error::ErrorKind;
use crate::logic::state::{ApiConfig, ExtensionState};

const RESET: Duration = Duration::from_millis(100);

#[derive(Default)]
struct CountingInjector {
    calls: AtomicUsize,
    fail: bool,
}

#[async_trait]
impl ContentInjector for CountingInjector {
    async fn inject(&self, _tab_id: TabId) -> anyhow::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            anyhow::bail!("cannot access a chrome:// URL");
        }
        Ok(())
    }
}

struct Harness {
    worker: BackgroundWorker,
    badge: Arc<MemoryBadge>,
    injector: Arc<CountingInjector>,
    store: StateStore,
}

fn harness(base_url: String, timeout_ms: u64, token: Option<String>) -> Harness {
    harness_with(base_url, timeout_ms, token, CountingInjector::default())
}

fn harness_with(
    base_url: String,
    timeout_ms: u64,
    token: Option<String>,
    injector: CountingInjector,
) -> Harness {
    let store = StateStore::in_memory();
    if let Some(token) = token {
        store.save_token(&token).unwrap();
    }
    let config = ApiConfig {
        base_url,
        timeout_ms,
        require_session: true,
    };
    let client = Arc::new(ApiClient::with_config(store.clone(), config).unwrap());
    let badge = Arc::new(MemoryBadge::new());
    let injector = Arc::new(injector);

    let worker = BackgroundWorker::new(
        client,
        store.clone(),
        badge.clone(),
        injector.clone(),
        WorkerConfig {
            badge_reset_delay: RESET,
            inject_content: true,
        },
    );

    Harness { worker, badge, injector, store }
}

async fn after_reset() {
    tokio::time::sleep(RESET * 3).await;
}

#[tokio::test]
async fn test_phishing_scan_sets_warning_and_counts() {
    let server = MockServer::start(MockConfig::default()).await.unwrap();
    server.set_behavior(MockBehavior {
        verdict: Some(ScriptedVerdict::new("phishing", 0.92).with_scan_id("scan-1")),
        ..Default::default()
    });
    let h = harness(server.base_url(), 2000, Some(server.issue_token()));
    let before = h.store.load_state().unwrap().detection_count;

    let result = h
        .worker
        .handle(WorkerRequest::url(Some(7), "http://example-bank-login.test/verify"))
        .await;

    assert!(result.is_phishing());
    assert_eq!(result.scan_id, "scan-1");
    assert_eq!(h.badge.get(7), BadgeState::Warning);
    assert_eq!(h.worker.phase(7), ScanPhase::Completed);

    let state = h.store.load_state().unwrap();
    assert_eq!(state.detection_count, before + 1);
    assert!(state.last_scan_timestamp.is_some());
    let stats = h.store.load_stats().unwrap();
    assert_eq!((stats.scans_performed, stats.phishing_detected), (1, 1));

    // Warning survives the reset delay, cleared by the next navigation
    after_reset().await;
    assert_eq!(h.badge.get(7), BadgeState::Warning);
    h.worker.on_tab_loading(7);
    assert_eq!(h.badge.get(7), BadgeState::Clear);
    assert_eq!(h.worker.phase(7), ScanPhase::Idle);
}

#[tokio::test]
async fn test_legitimate_scan_does_not_count_detection() {
    let server = MockServer::start(MockConfig::default()).await.unwrap();
    server.set_behavior(MockBehavior {
        verdict: Some(ScriptedVerdict::new("legitimate", 0.97)),
        ..Default::default()
    });
    let h = harness(server.base_url(), 2000, Some(server.issue_token()));

    let result = h.worker.handle(WorkerRequest::url(Some(1), "https://example.com")).await;

    assert_eq!(result.prediction, Prediction::Legitimate);
    assert_eq!(h.store.load_state().unwrap().detection_count, 0);
    assert_eq!(h.store.load_stats().unwrap().scans_performed, 1);

    after_reset().await;
    assert_eq!(h.worker.phase(1), ScanPhase::Idle);
}

#[tokio::test]
async fn test_invalid_request_replies_with_error_and_no_network() {
    let server = MockServer::start(MockConfig::default()).await.unwrap();
    let h = harness(server.base_url(), 2000, Some(server.issue_token()));

    let result = h.worker.handle(WorkerRequest::url(Some(2), "not a url")).await;

    assert_eq!(result.prediction, Prediction::Error);
    assert_eq!(result.error_kind, Some(ErrorKind::InvalidInput));
    assert_eq!(server.request_count(), 0);
    assert_eq!(h.worker.phase(2), ScanPhase::Failed);
    assert_eq!(h.store.load_state().unwrap(), ExtensionState::default());
}

#[tokio::test]
async fn test_timeout_leaves_state_untouched() {
    let server = MockServer::start(MockConfig::default()).await.unwrap();
    server.set_behavior(MockBehavior {
        latency: Duration::from_millis(400),
        verdict: Some(ScriptedVerdict::new("phishing", 0.99)),
        ..Default::default()
    });
    let h = harness(server.base_url(), 80, Some(server.issue_token()));
    let before = h.store.load_state().unwrap();

    let result = h.worker.handle(WorkerRequest::url(Some(3), "https://example.com")).await;

    assert_eq!(result.error_kind, Some(ErrorKind::Timeout));
    assert_eq!(result.error.as_deref(), Some("API timeout"));
    assert_eq!(h.store.load_state().unwrap(), before);
    assert_eq!(h.store.load_stats().unwrap().scans_performed, 0);
    assert_ne!(h.badge.get(3), BadgeState::Warning);
}

#[tokio::test]
async fn test_navigation_scans_main_frame_when_enabled() {
    let h = harness("http://127.0.0.1:9/v1".to_string(), 500, None);

    assert!(!h.worker.on_navigation_completed(4, 2).await);
    assert_eq!(h.badge.get(4), BadgeState::Clear);

    assert!(h.worker.on_navigation_completed(4, 0).await);
    assert_eq!(h.badge.get(4), BadgeState::Scanning);
    assert_eq!(h.worker.phase(4), ScanPhase::Scanning);
    assert_eq!(h.injector.calls.load(Ordering::SeqCst), 1);

    after_reset().await;
    assert_eq!(h.badge.get(4), BadgeState::Clear);
    assert_eq!(h.worker.phase(4), ScanPhase::Idle);

    h.store.update_state(|s| s.enabled = false).unwrap();
    assert!(!h.worker.on_navigation_completed(4, 0).await);
    assert_eq!(h.injector.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_injection_failure_is_not_fatal() {
    let h = harness_with(
        "http://127.0.0.1:9/v1".to_string(),
        500,
        None,
        CountingInjector { fail: true, ..Default::default() },
    );

    assert!(h.worker.on_navigation_completed(5, 0).await);
    assert_eq!(h.badge.get(5), BadgeState::Scanning);
}

#[tokio::test]
async fn test_stale_clear_does_not_hide_new_scan() {
    let h = harness("http://127.0.0.1:9/v1".to_string(), 500, None);

    h.worker.on_navigation_completed(6, 0).await;
    tokio::time::sleep(RESET / 2).await;
    h.worker.on_tab_loading(6);
    h.worker.on_navigation_completed(6, 0).await;

    // First timer fires here but belongs to the old navigation
    tokio::time::sleep(RESET * 2 / 3).await;
    assert_eq!(h.badge.get(6), BadgeState::Scanning);
}

#[tokio::test]
async fn test_spawned_worker_replies_once_per_request() {
    let server = MockServer::start(MockConfig::default()).await.unwrap();
    server.set_behavior(MockBehavior {
        verdict: Some(ScriptedVerdict::new("phishing", 0.8)),
        ..Default::default()
    });
    let h = harness(server.base_url(), 2000, Some(server.issue_token()));
    let store = h.store.clone();
    let handle = h.worker.spawn();

    let (a, b, c) = tokio::join!(
        handle.scan(WorkerRequest::url(Some(1), "https://one.example.com")),
        handle.scan(WorkerRequest::email(None, "Verify your account password now")),
        handle.scan(WorkerRequest::email(Some(2), "")),
    );

    assert!(a.is_phishing());
    assert!(b.is_phishing());
    assert_eq!(c.error_kind, Some(ErrorKind::InvalidInput));
    assert_ne!(a.scan_id, b.scan_id);

    assert_eq!(store.load_stats().unwrap().phishing_detected, 2);
}

#[tokio::test]
async fn test_legitimate_result_supersedes_earlier_warning() {
    let server = MockServer::start(MockConfig::default()).await.unwrap();
    server.set_behavior(MockBehavior {
        verdict: Some(ScriptedVerdict::new("phishing", 0.95)),
        ..Default::default()
    });
    let h = harness(server.base_url(), 2000, Some(server.issue_token()));

    h.worker.handle(WorkerRequest::url(Some(9), "http://example-bank-login.test/")).await;
    assert_eq!(h.badge.get(9), BadgeState::Warning);

    server.set_behavior(MockBehavior {
        verdict: Some(ScriptedVerdict::new("legitimate", 0.9)),
        ..Default::default()
    });
    let result = h.worker.handle(WorkerRequest::url(Some(9), "https://example.com")).await;
    assert_eq!(result.prediction, Prediction::Legitimate);
    assert_eq!(h.worker.phase(9), ScanPhase::Completed);

    after_reset().await;
    assert_eq!(h.badge.get(9), BadgeState::Clear);
    assert_eq!(h.worker.phase(9), ScanPhase::Idle);
}

#[tokio::test]
async fn test_error_result_supersedes_earlier_warning() {
    let server = MockServer::start(MockConfig::default()).await.unwrap();
    server.set_behavior(MockBehavior {
        verdict: Some(ScriptedVerdict::new("phishing", 0.95)),
        ..Default::default()
    });
    let h = harness(server.base_url(), 2000, Some(server.issue_token()));

    h.worker.handle(WorkerRequest::url(Some(10), "http://example-bank-login.test/")).await;
    h.worker.handle(WorkerRequest::email(Some(10), "   ")).await;
    assert_eq!(h.worker.phase(10), ScanPhase::Failed);

    after_reset().await;
    assert_eq!(h.badge.get(10), BadgeState::Clear);
    assert_eq!(h.worker.phase(10), ScanPhase::Idle);
}

#[tokio::test]
async fn test_navigation_timer_keeps_later_warning() {
    let server = MockServer::start(MockConfig::default()).await.unwrap();
    server.set_behavior(MockBehavior {
        verdict: Some(ScriptedVerdict::new("phishing", 0.95)),
        ..Default::default()
    });
    let h = harness(server.base_url(), 2000, Some(server.issue_token()));

    h.worker.on_navigation_completed(12, 0).await;
    h.worker.handle(WorkerRequest::url(Some(12), "http://example-bank-login.test/")).await;

    after_reset().await;
    assert_eq!(h.badge.get(12), BadgeState::Warning);
}

#[tokio::test]
async fn test_removed_tab_is_forgotten() {
    let h = harness("http://127.0.0.1:9/v1".to_string(), 500, None);

    h.worker.on_navigation_completed(13, 0).await;
    h.worker.on_navigation_completed(14, 0).await;
    assert_eq!(h.worker.tracked_tabs(), 2);

    h.worker.on_tab_removed(13);
    assert_eq!(h.worker.tracked_tabs(), 1);
    assert_eq!(h.worker.phase(13), ScanPhase::Idle);

    // Pending clear for the closed tab finds nothing to do
    after_reset().await;
    assert_eq!(h.worker.tracked_tabs(), 1);
}

#[tokio::test]
async fn test_spawned_worker_handles_tab_events() {
    let h = harness("http://127.0.0.1:9/v1".to_string(), 500, None);
    let badge = h.badge.clone();
    let worker = h.worker.clone();
    let handle = h.worker.spawn();

    handle.navigation_completed(15, 0).await;
    tokio::time::sleep(RESET / 4).await;
    assert_eq!(badge.get(15), BadgeState::Scanning);

    handle.tab_loading(15).await;
    tokio::time::sleep(RESET / 4).await;
    assert_eq!(badge.get(15), BadgeState::Clear);
    assert_eq!(worker.phase(15), ScanPhase::Idle);

    handle.tab_removed(15).await;
    tokio::time::sleep(RESET / 4).await;
    assert_eq!(worker.tracked_tabs(), 0);
}
