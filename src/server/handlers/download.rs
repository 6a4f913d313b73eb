//! Artifact serving: whole-file downloads and the chunked streaming
//! variant.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use futures::StreamExt;
use tokio_util::io::ReaderStream;
use tracing::{error, info};

use crate::common::consts::{
    CONTENT_TYPE_MPEGTS, CONTENT_TYPE_OCTET_STREAM, CONTENT_TYPE_PLAYLIST, PLAYLIST_EXT,
    SERVER_NAME, STREAM_CHUNK_SIZE, TRANSPORT_STREAM_EXT,
};
use crate::common::errors::ServerError;
use crate::common::types::{AudioId, OwnerNickname};
use crate::server::AppState;
use crate::storage::layout::safe_component;

/// Content type by filename suffix only.
pub fn content_type_for(filename: &str) -> &'static str {
    if filename.ends_with(PLAYLIST_EXT) {
        CONTENT_TYPE_PLAYLIST
    } else if filename.ends_with(TRANSPORT_STREAM_EXT) {
        CONTENT_TYPE_MPEGTS
    } else {
        CONTENT_TYPE_OCTET_STREAM
    }
}

fn checked_artifact_path(
    state: &AppState,
    owner: &str,
    audio: &str,
    filename: &str,
) -> Result<std::path::PathBuf, ServerError> {
    for part in [owner, audio, filename] {
        if !safe_component(part) {
            return Err(ServerError::Malformed("Invalid request path".into()));
        }
    }
    Ok(state.layout.artifact_path(
        &OwnerNickname::from(owner),
        &AudioId::from(audio),
        filename,
    ))
}

/// `GET /hls/{owner}/{audio}/{filename}`: whole file, content length set.
pub async fn download_artifact(
    State(state): State<Arc<AppState>>,
    Path((owner, audio, filename)): Path<(String, String, String)>,
) -> Result<Response, ServerError> {
    state.metrics.download_requests.inc();
    let path = checked_artifact_path(&state, &owner, &audio, &filename)?;

    let data = match tokio::fs::read(&path).await {
        Ok(data) => data,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(ServerError::NotFound("File".into()));
        }
        Err(err) => {
            error!(path = %path.display(), error = %err, "artifact read failed");
            return Err(ServerError::Io(err));
        }
    };

    state.metrics.bytes_downloaded.inc_by(data.len() as u64);
    info!(owner = %owner, audio = %audio, file = %filename, bytes = data.len(), "artifact served");

    Ok((
        [
            (header::SERVER, SERVER_NAME),
            (header::CONTENT_TYPE, content_type_for(&filename)),
        ],
        data,
    )
        .into_response())
}

/// `GET /stream/{owner}/{audio}/{filename}`: chunked transfer in 64 KiB
/// blocks. Each chunk write is a suspension point, and dropping the
/// response stream (client disconnect) closes the file immediately.
pub async fn stream_artifact(
    State(state): State<Arc<AppState>>,
    Path((owner, audio, filename)): Path<(String, String, String)>,
) -> Result<Response, ServerError> {
    state.metrics.download_requests.inc();
    let path = checked_artifact_path(&state, &owner, &audio, &filename)?;

    let file = match tokio::fs::File::open(&path).await {
        Ok(file) => file,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(ServerError::NotFound("File".into()));
        }
        Err(err) => return Err(ServerError::Io(err)),
    };

    info!(owner = %owner, audio = %audio, file = %filename, "starting chunked stream");

    let metrics_state = state.clone();
    let stream = ReaderStream::with_capacity(file, STREAM_CHUNK_SIZE).inspect(move |chunk| {
        if let Ok(chunk) = chunk {
            metrics_state
                .metrics
                .bytes_downloaded
                .inc_by(chunk.len() as u64);
        }
    });

    Ok((
        [
            (header::SERVER, SERVER_NAME),
            (header::CONTENT_TYPE, CONTENT_TYPE_OCTET_STREAM),
        ],
        Body::from_stream(stream),
    )
        .into_response())
}
