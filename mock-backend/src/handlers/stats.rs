//! Aggregate statistics handler

use std::sync::atomic::Ordering;

use axum::{extract::State, Json};
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
pub struct StatsResponse {
    total_scans: u64,
    phishing_detected: u64,
    feedback_received: usize,
}

pub async fn summary(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse {
        total_scans: state.inner.scans.load(Ordering::SeqCst),
        phishing_detected: state.inner.phishing.load(Ordering::SeqCst),
        feedback_received: state.inner.feedback.read().len(),
    })
}
