//! Per-service control endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::json;

use super::StatusState;

/// `POST /services/{id}/reconnect` -- disconnect and reconnect one service.
///
/// Fresh health is published before the response is sent, so `/health` and
/// `/health/ready` reflect the outcome immediately.
///
/// 200 when the connect succeeds, 404 for an unknown id, 502 when the
/// service could not be reached.
pub async fn reconnect_handler(
    State(state): State<StatusState>,
    Path(id): Path<String>,
) -> (StatusCode, Json<serde_json::Value>) {
    match state.health.reconnect(&id).await {
        Some(Ok(())) => (
            StatusCode::OK,
            Json(json!({ "id": id, "connected": true })),
        ),
        Some(Err(e)) => (
            StatusCode::BAD_GATEWAY,
            Json(json!({ "id": id, "connected": false, "error": e.to_string() })),
        ),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "id": id, "error": "unknown service" })),
        ),
    }
}
