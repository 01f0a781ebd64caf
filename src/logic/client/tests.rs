//! ApiClient tests against the in-process mock backend

use std::time::Duration;

use phishguard_mock::{Config as MockConfig, MockBehavior, MockServer, ScriptedVerdict};

use super::*;
use crate::logic::error::ErrorKind;

async fn start_server() -> MockServer {
    MockServer::start(MockConfig::default()).await.unwrap()
}

fn config_for(base_url: String, timeout_ms: u64) -> ApiConfig {
    ApiConfig {
        base_url,
        timeout_ms,
        require_session: true,
    }
}

/// Client with a valid session on `server`, plus its store
fn logged_in_client(server: &MockServer) -> (ApiClient, StateStore) {
    let store = StateStore::in_memory();
    store.save_token(&server.issue_token()).unwrap();
    let client = ApiClient::with_config(store.clone(), config_for(server.base_url(), 2000)).unwrap();
    (client, store)
}

/// Base URL of a port nothing listens on
fn unbound_base_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{}", port)
}

#[tokio::test]
async fn test_phishing_verdict() {
    let server = start_server().await;
    server.set_behavior(MockBehavior {
        verdict: Some(ScriptedVerdict::new("phishing", 0.92).with_scan_id("scan-1")),
        ..Default::default()
    });
    let (client, _) = logged_in_client(&server);

    let result = client
        .analyze_url("http://example-bank-login.test/verify")
        .await
        .unwrap();

    assert_eq!(result.prediction, Prediction::Phishing);
    assert_eq!(result.scan_id, "scan-1");
    assert_eq!(result.confidence_percent(), 92);
    assert!(result.error.is_none());
}

#[tokio::test]
async fn test_email_scan_uses_stub_model() {
    let server = start_server().await;
    let (client, _) = logged_in_client(&server);

    let result = client
        .analyze_email("Dear customer, your account is suspended. Verify your password now.")
        .await
        .unwrap();

    assert!(result.prediction.is_verdict());
    assert!((0.0..=1.0).contains(&result.confidence));
    assert!(!result.scan_id.is_empty());
}

#[tokio::test]
async fn test_expired_session_then_fail_fast() {
    let server = start_server().await;
    let (client, store) = logged_in_client(&server);
    server.revoke_all_tokens();

    let err = client.analyze_url("https://example.com").await.unwrap_err();
    assert_eq!(err, PhishGuardError::AuthExpired);
    assert!(!client.is_authenticated());
    assert_eq!(store.load_token().unwrap(), None);

    let requests = server.request_count();
    let err = client.analyze_url("https://example.com").await.unwrap_err();
    assert_eq!(err, PhishGuardError::AuthRequired);
    assert_eq!(server.request_count(), requests);
}

#[tokio::test]
async fn test_optional_session_sends_no_token() {
    let server = MockServer::start(MockConfig {
        require_auth: false,
        ..MockConfig::default()
    })
    .await
    .unwrap();

    let mut config = config_for(server.base_url(), 2000);
    config.require_session = false;
    let client = ApiClient::with_config(StateStore::in_memory(), config).unwrap();

    let result = client.analyze_url("https://example.com").await.unwrap();
    assert!(result.prediction.is_verdict());
}

#[tokio::test]
async fn test_timeout() {
    let server = start_server().await;
    server.set_behavior(MockBehavior {
        latency: Duration::from_millis(500),
        ..Default::default()
    });

    let store = StateStore::in_memory();
    store.save_token(&server.issue_token()).unwrap();
    let client = ApiClient::with_config(store, config_for(server.base_url(), 100)).unwrap();

    let err = client.analyze_url("https://example.com").await.unwrap_err();
    assert_eq!(err, PhishGuardError::Timeout);
    assert_eq!(err.kind(), ErrorKind::Timeout);

    // A timeout is not a rejected session
    assert!(client.is_authenticated());
}

#[tokio::test]
async fn test_offline_is_network_failure() {
    let store = StateStore::in_memory();
    store.save_token("tok-offline").unwrap();
    let client = ApiClient::with_config(store, config_for(unbound_base_url(), 1000)).unwrap();

    let err = client.submit_feedback("scan-1", true, "").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NetworkFailure);
}

#[tokio::test]
async fn test_invalid_input_never_reaches_network() {
    let server = start_server().await;
    let (client, _) = logged_in_client(&server);

    for url in ["", "example.com", "javascript:alert(1)", "ftp://files.example.com"] {
        let err = client.analyze_url(url).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput, "{url:?}");
    }
    let err = client.analyze_email("   ").await.unwrap_err();
    assert_eq!(err.code(), 1002);

    assert_eq!(server.request_count(), 0);
}

#[tokio::test]
async fn test_server_error_carries_message() {
    let server = start_server().await;
    server.set_behavior(MockBehavior {
        fail_with: Some(503),
        fail_message: Some("model warming up".to_string()),
        ..Default::default()
    });
    let (client, _) = logged_in_client(&server);

    let err = client.analyze_url("https://example.com").await.unwrap_err();
    assert_eq!(
        err,
        PhishGuardError::ServerError {
            status: 503,
            message: "model warming up".to_string()
        }
    );
    assert_eq!(err.to_string(), "Classification failed: model warming up");
}

#[tokio::test]
async fn test_health_statuses() {
    let server = start_server().await;
    let client =
        ApiClient::with_config(StateStore::in_memory(), config_for(server.base_url(), 100)).unwrap();

    let report = client.check_health().await;
    assert_eq!(report.status, HealthStatus::Online);
    assert_eq!(report.message, "API is available");
    assert_eq!(report.version.as_deref(), Some("1.0.0"));

    server.set_behavior(MockBehavior {
        latency: Duration::from_millis(400),
        ..Default::default()
    });
    let report = client.check_health().await;
    assert_eq!(report.status, HealthStatus::Timeout);
    assert_eq!(report.message, "API request timed out");

    let offline =
        ApiClient::with_config(StateStore::in_memory(), config_for(unbound_base_url(), 500)).unwrap();
    assert_eq!(offline.check_health().await.status, HealthStatus::Offline);

    // Unknown route answers 404
    let wrong_path = ApiClient::with_config(
        StateStore::in_memory(),
        config_for(format!("{}/v9", server.base_url()), 2000),
    )
    .unwrap();
    server.set_behavior(MockBehavior::default());
    let report = wrong_path.check_health().await;
    assert_eq!(report.status, HealthStatus::Error);
    assert_eq!(report.message, "API returned status 404");
}

#[tokio::test]
async fn test_login_persists_token() {
    let server = start_server().await;
    let store = StateStore::in_memory();
    let client = ApiClient::with_config(store.clone(), config_for(server.base_url(), 2000)).unwrap();

    let outcome = client
        .login("demo@phishguard.example.com", "securePassword123")
        .await
        .unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.session.expires_in, 1800);
    assert!(client.is_authenticated());

    let token = store.load_token().unwrap().unwrap();
    assert!(server.state().is_valid_token(&token));

    let stats = client.fetch_server_stats().await.unwrap();
    assert_eq!(stats.total_scans, 0);
}

#[tokio::test]
async fn test_login_rejected() {
    let server = start_server().await;
    let client =
        ApiClient::with_config(StateStore::in_memory(), config_for(server.base_url(), 2000)).unwrap();

    let err = client
        .login("demo@phishguard.example.com", "wrong")
        .await
        .unwrap_err();
    assert_eq!(err, PhishGuardError::AuthFailed("Invalid credentials".to_string()));

    let err = client.login("", "").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unknown);
    assert_eq!(err.to_string(), "Unknown error: Missing email or password");
    assert!(!client.is_authenticated());
}

#[tokio::test]
async fn test_feedback_reaches_backend() {
    let server = start_server().await;
    let (client, _) = logged_in_client(&server);

    let ack = client
        .submit_feedback("scan-1", false, "false positive on my bank")
        .await
        .unwrap();
    assert_eq!(ack.status.as_deref(), Some("received"));

    let received = server.feedback();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].scan_id, "scan-1");
    assert!(!received[0].is_correct);
}

#[tokio::test]
async fn test_update_config_persists() {
    let store = StateStore::in_memory();
    let client =
        ApiClient::with_config(store.clone(), config_for("http://127.0.0.1:5000/v1".into(), 5000))
            .unwrap();

    let bad = config_for("not a url".into(), 5000);
    assert_eq!(client.update_config(bad).unwrap_err().code(), 1003);
    assert_eq!(store.load_config().unwrap(), None);

    let good = config_for("https://api.example.com/v1".into(), 8000);
    client.update_config(good.clone()).unwrap();
    assert_eq!(client.config(), good);

    let reloaded = ApiClient::new(store).unwrap();
    assert_eq!(reloaded.config(), good);
}

#[test]
fn test_error_message_extraction() {
    let status = StatusCode::BAD_REQUEST;
    assert_eq!(
        error_message(status, r#"{"error":{"code":"PHISH-400","message":"bad url"}}"#),
        "bad url"
    );
    assert_eq!(error_message(status, r#"{"error":"flat message"}"#), "flat message");
    assert_eq!(error_message(status, r#"{"message":"plain"}"#), "plain");
    assert_eq!(error_message(status, "<html>oops</html>"), "API error: 400");
    assert_eq!(error_message(status, ""), "API error: 400");
}
