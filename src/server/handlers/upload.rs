//! `POST /toml/upload`: archive ingestion.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use tracing::{error, info};

use crate::common::errors::ServerError;
use crate::common::types::AudioId;
use crate::storage::{IngestError, ingest_archive};
use crate::server::AppState;

pub async fn upload_archive(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Response, ServerError> {
    state.metrics.upload_requests.inc();
    info!(bytes = body.len(), "handling archive upload");

    if body.is_empty() {
        return Err(ServerError::Malformed("Empty upload request".into()));
    }

    // Assigned before validation and reused as the directory name.
    let audio_id = AudioId::generate();

    let task_state = state.clone();
    let task_id = audio_id.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        ingest_archive(
            &task_state.layout,
            &task_state.index,
            &task_state.keys,
            &task_id,
            &body,
        )
    })
    .await
    .map_err(|err| ServerError::Internal(format!("ingest task failed: {err}")))?
    .map_err(|err| map_ingest_error(&audio_id, err))?;

    // Wire counter sees the compressed archive; owner storage accounting
    // tracks what actually landed on disk.
    state.metrics.bytes_uploaded.inc_by(outcome.archive_bytes);
    state
        .metrics
        .record_owner_upload(&outcome.owner, outcome.stored_bytes);

    info!(owner = %outcome.owner, audio = %outcome.audio_id, "upload successful");

    let body = format!(
        "audio_id={}\nsha256={}\nkey_persisted={}\n",
        outcome.audio_id, outcome.sha256, outcome.key_persisted
    );
    Ok(([("Audio-ID", outcome.audio_id.0)], body).into_response())
}

fn map_ingest_error(audio_id: &AudioId, err: IngestError) -> ServerError {
    error!(audio = %audio_id, error = %err, "ingest failed");
    match err {
        IngestError::EmptyBody => ServerError::Malformed("Empty upload request".into()),
        err if err.is_client_fault() => ServerError::Malformed("Invalid request format".into()),
        IngestError::Io(io) => ServerError::Io(io),
        other => ServerError::Internal(other.to_string()),
    }
}
