//! PhishGuard error taxonomy
//!
//! One closed enum for every failure a scan, feedback or login call can
//! surface. Each variant carries a stable numeric code so UI layers can map
//! errors without string matching.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Coarse error class, one per variant of [`PhishGuardError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidInput,
    Timeout,
    NetworkFailure,
    AuthRequired,
    AuthExpired,
    AuthFailed,
    ServerError,
    Unknown,
}

/// Which validator rejected the input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputField {
    Url,
    EmailContent,
    Config,
}

impl InputField {
    pub fn as_str(&self) -> &'static str {
        match self {
            InputField::Url => "url",
            InputField::EmailContent => "email content",
            InputField::Config => "configuration",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PhishGuardError {
    /// Rejected by a local validator, never sent to the backend
    #[error("Invalid {}: {message}", field.as_str())]
    InvalidInput { field: InputField, message: String },

    #[error("API timeout")]
    Timeout,

    #[error("Network failure: {0}")]
    NetworkFailure(String),

    /// Session policy demands a token and none is held
    #[error("Authentication required")]
    AuthRequired,

    /// The backend answered 401 to an authenticated call
    #[error("Authentication expired")]
    AuthExpired,

    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    #[error("Classification failed: {message}")]
    ServerError { status: u16, message: String },

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl PhishGuardError {
    pub fn invalid_url(message: impl Into<String>) -> Self {
        Self::InvalidInput { field: InputField::Url, message: message.into() }
    }

    pub fn invalid_email(message: impl Into<String>) -> Self {
        Self::InvalidInput { field: InputField::EmailContent, message: message.into() }
    }

    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidInput { field: InputField::Config, message: message.into() }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::NetworkFailure(message.into())
    }

    pub fn server(status: u16, message: impl Into<String>) -> Self {
        Self::ServerError { status, message: message.into() }
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::Unknown(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput { .. } => ErrorKind::InvalidInput,
            Self::Timeout => ErrorKind::Timeout,
            Self::NetworkFailure(_) => ErrorKind::NetworkFailure,
            Self::AuthRequired => ErrorKind::AuthRequired,
            Self::AuthExpired => ErrorKind::AuthExpired,
            Self::AuthFailed(_) => ErrorKind::AuthFailed,
            Self::ServerError { .. } => ErrorKind::ServerError,
            Self::Unknown(_) => ErrorKind::Unknown,
        }
    }

    /// Stable numeric code (1xxx input, 2xxx auth, 3xxx transport, 4xxx server)
    pub fn code(&self) -> u16 {
        match self {
            Self::InvalidInput { field: InputField::Url, .. } => 1001,
            Self::InvalidInput { field: InputField::EmailContent, .. } => 1002,
            Self::InvalidInput { field: InputField::Config, .. } => 1003,
            Self::AuthRequired => 2001,
            Self::AuthFailed(_) => 2002,
            Self::AuthExpired => 2003,
            Self::Timeout => 3001,
            Self::NetworkFailure(_) => 3002,
            Self::ServerError { .. } => 4000,
            Self::Unknown(_) => 9999,
        }
    }

    /// Session problems that need the user to log in again
    pub fn needs_login(&self) -> bool {
        matches!(self, Self::AuthRequired | Self::AuthExpired)
    }
}

pub type PhishGuardResult<T> = Result<T, PhishGuardError>;
