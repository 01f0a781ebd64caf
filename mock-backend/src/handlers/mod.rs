//! HTTP handlers

pub mod auth;
pub mod feedback;
pub mod health;
pub mod predict;
pub mod stats;

use crate::{AppError, AppState};

/// Return the scripted failure, if one is configured
pub(crate) fn scripted_failure(state: &AppState) -> Result<(), AppError> {
    let behavior = state.behavior();
    match behavior.fail_with {
        Some(status) => Err(AppError::Forced {
            status,
            message: behavior
                .fail_message
                .unwrap_or_else(|| format!("Scripted failure ({})", status)),
        }),
        None => Ok(()),
    }
}
