//! Request counting and scripted latency

use std::sync::atomic::Ordering;
use std::time::Duration;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::AppState;

pub async fn count_and_delay(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    state.inner.requests.fetch_add(1, Ordering::SeqCst);

    let latency = state.behavior().latency + Duration::from_millis(state.config.latency_ms);
    if !latency.is_zero() {
        tokio::time::sleep(latency).await;
    }

    next.run(req).await
}
