//! Configuration module

use std::env;

/// Mock backend configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,

    /// Route prefix used by the standalone binary (clients default to `/v1`)
    pub route_prefix: String,

    /// Require a bearer token on /predict, /feedback and /stats
    pub require_auth: bool,

    /// Demo account accepted by /auth/login
    pub demo_email: String,
    pub demo_password: String,

    /// Lifetime reported for issued tokens (seconds)
    pub token_expires_in: u64,

    /// Artificial latency added to every request (milliseconds)
    pub latency_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 5000,
            route_prefix: "/v1".to_string(),
            require_auth: true,
            demo_email: "demo@phishguard.example.com".to_string(),
            demo_password: "securePassword123".to_string(),
            token_expires_in: 1800,
            latency_ms: 0,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),

            route_prefix: env::var("MOCK_ROUTE_PREFIX")
                .unwrap_or(defaults.route_prefix),

            require_auth: env::var("MOCK_REQUIRE_AUTH")
                .map(|s| s.to_lowercase() != "false" && s != "0")
                .unwrap_or(defaults.require_auth),

            demo_email: env::var("MOCK_DEMO_EMAIL")
                .unwrap_or(defaults.demo_email),

            demo_password: env::var("MOCK_DEMO_PASSWORD")
                .unwrap_or(defaults.demo_password),

            token_expires_in: env::var("MOCK_TOKEN_EXPIRES_IN")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.token_expires_in),

            latency_ms: env::var("MOCK_LATENCY_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.latency_ms),
        }
    }
}
