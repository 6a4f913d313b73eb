//! `DELETE /{owner}/{audio}?sha256=<digest>`: ownership-gated removal.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use serde::Deserialize;
use tracing::{info, warn};

use crate::common::errors::ServerError;
use crate::common::types::{AudioId, OwnerNickname};
use crate::server::AppState;

#[derive(Debug, Deserialize)]
pub struct DeleteParams {
    sha256: Option<String>,
}

pub async fn delete_audio(
    State(state): State<Arc<AppState>>,
    Path((owner, audio)): Path<(String, String)>,
    Query(params): Query<DeleteParams>,
) -> Result<String, ServerError> {
    state.metrics.delete_requests.inc();
    let owner = OwnerNickname::from(owner);
    let audio = AudioId::from(audio);
    info!(owner = %owner, audio = %audio, "handling delete request");

    let provided = params
        .sha256
        .ok_or_else(|| ServerError::Malformed("Missing 'sha256' parameter".into()))?;

    let removed_bytes = {
        let state = state.clone();
        let owner = owner.clone();
        let audio = audio.clone();
        tokio::task::spawn_blocking(move || -> Result<u64, ServerError> {
            if !state.index.has(&owner, &audio) {
                return Err(ServerError::NotFound("Audio-ID".into()));
            }
            let stored = state
                .keys
                .load(&audio)?
                .ok_or_else(|| ServerError::NotFound("Audio-ID".into()))?;

            if stored != provided {
                warn!(audio = %audio, "deletion key mismatch");
                return Err(ServerError::Forbidden);
            }

            // Size captured before the files go away, for owner accounting.
            let bytes = state.layout.audio_dir_size(&owner, &audio);
            state.layout.remove_audio(&owner, &audio)?;
            state.index.remove(&owner, &audio);
            Ok(bytes)
        })
        .await
        .map_err(|err| ServerError::Internal(format!("delete task failed: {err}")))??
    };

    state.metrics.record_owner_delete(&owner, removed_bytes);
    info!(owner = %owner, audio = %audio, "delete successful");

    Ok(format!("Deleted Audio-ID: {audio}\n"))
}
