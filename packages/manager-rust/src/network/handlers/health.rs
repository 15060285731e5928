//! Health, liveness, and readiness endpoint handlers.
//!
//! These report the latest published health snapshot and never probe
//! services themselves, so a slow backend cannot slow the endpoints down.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::json;

use super::StatusState;
use crate::network::LifecycleState;

/// Returns the lifecycle state and per-service health as JSON.
///
/// Always returns 200; the `healthy` field carries the aggregate verdict.
pub async fn health_handler(State(state): State<StatusState>) -> Json<serde_json::Value> {
    let lifecycle = state.lifecycle.state();
    let snapshot = state.health.latest();
    let uptime_secs = state.start_time.elapsed().as_secs();

    Json(json!({
        "state": lifecycle.as_str(),
        "healthy": snapshot.is_healthy(),
        "services": snapshot.iter().collect::<Vec<_>>(),
        "uptime_secs": uptime_secs,
    }))
}

/// Liveness probe -- always returns 200 OK.
pub async fn liveness_handler() -> StatusCode {
    StatusCode::OK
}

/// Readiness probe -- 200 when running with every service healthy, 503 otherwise.
pub async fn readiness_handler(State(state): State<StatusState>) -> StatusCode {
    let running = state.lifecycle.state() == LifecycleState::Running;
    if running && state.health.latest().is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}
