//! Central Configuration Constants
//!
//! Single source of truth for all configuration defaults.
//! Environment variables override the defaults; a persisted `ApiConfig`
//! overrides both.

use std::path::PathBuf;

/// Default classification backend URL
///
/// For development run `phishguard-mock`, which listens here.
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:5000/v1";

/// Default request timeout (milliseconds)
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

/// Delay before a scanning/clean badge is cleared (milliseconds)
pub const BADGE_RESET_DELAY_MS: u64 = 3000;

/// Scan type sent with every prediction request
pub const SCAN_TYPE_REALTIME: &str = "REALTIME";

/// Storage keys (flat records, last write wins)
pub mod keys {
    pub const STATE: &str = "phishguardState";
    pub const CONFIG: &str = "phishguardConfig";
    pub const AUTH_TOKEN: &str = "authToken";
    pub const STATS: &str = "phishguardStats";
}

/// App version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// App name
pub const APP_NAME: &str = "PhishGuard";

// ============================================
// Helper functions to read from env with fallback
// ============================================

/// Get API base URL from environment or use default
pub fn get_api_url() -> String {
    std::env::var("PHISHGUARD_API_URL")
        .unwrap_or_else(|_| DEFAULT_API_URL.to_string())
}

/// Get request timeout from environment or use default
pub fn get_timeout_ms() -> u64 {
    std::env::var("PHISHGUARD_API_TIMEOUT_MS")
        .ok()
        .and_then(|s| s.parse().ok())
        .filter(|ms| *ms > 0)
        .unwrap_or(DEFAULT_TIMEOUT_MS)
}

/// Check whether scans demand a logged-in session
pub fn is_session_required() -> bool {
    std::env::var("PHISHGUARD_REQUIRE_SESSION")
        .map(|s| s.to_lowercase() != "false" && s != "0")
        .unwrap_or(true)
}

/// Directory holding the local storage file
pub fn get_data_dir() -> PathBuf {
    std::env::var("PHISHGUARD_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("phish-guard")
        })
}
