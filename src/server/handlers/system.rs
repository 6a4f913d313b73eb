//! Liveness, health, and metrics endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use tracing::info;

use crate::common::consts::PONG_MSG;
use crate::common::errors::ServerError;
use crate::common::types::OwnerNickname;
use crate::monitoring;
use crate::server::AppState;

/// `GET /hls/ping`
pub async fn ping() -> &'static str {
    info!("sending pong to client");
    PONG_MSG
}

/// `GET /health`: 200 when every check passes, 503 otherwise.
pub async fn health(State(state): State<Arc<AppState>>) -> Result<Response, ServerError> {
    let layout = state.layout.clone();
    let status = tokio::task::spawn_blocking(move || monitoring::check_system_health(&layout))
        .await
        .map_err(|err| ServerError::Internal(format!("health task failed: {err}")))?;

    let code = if status.healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    Ok((code, Json(status)).into_response())
}

/// `GET /metrics`: Prometheus text exposition.
pub async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
        .into_response()
}

/// `GET /owner/metrics/{owner}`: JSON counters for one owner.
pub async fn owner_metrics(
    State(state): State<Arc<AppState>>,
    Path(owner): Path<String>,
) -> Result<Response, ServerError> {
    let owner = OwnerNickname::from(owner);
    match state.metrics.owner_snapshot(&owner) {
        Some(view) => Ok(Json(view).into_response()),
        None => Err(ServerError::NotFound("Owner".into())),
    }
}
