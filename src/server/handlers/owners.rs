//! Listing endpoints: every owner with their audio ids, and the metadata
//! expansion of each audio.

use std::fmt::Write as _;
use std::sync::Arc;

use axum::extract::State;
use tracing::{error, info};

use crate::common::consts::METADATA_FILE;
use crate::common::errors::ServerError;
use crate::metadata;
use crate::server::AppState;

/// `GET /hls/owners`: one block per owner.
pub async fn list_owners(State(state): State<Arc<AppState>>) -> Result<String, ServerError> {
    info!("handling owner listing request");

    let snapshot = state.index.snapshot();
    if snapshot.is_empty() {
        return Err(ServerError::NotFound("Owners".into()));
    }

    let mut out = String::new();
    for (owner, audios) in snapshot {
        let _ = writeln!(out, "{owner}:");
        if audios.is_empty() {
            out.push_str("  (No audio IDs found)\n");
        } else {
            for audio in audios {
                let _ = writeln!(out, "  - {audio}");
            }
        }
    }
    Ok(out)
}

/// `GET /hls/audio-info/`: owners with parsed metadata per audio.
pub async fn list_audio_info(State(state): State<Arc<AppState>>) -> Result<String, ServerError> {
    info!("handling audio metadata listing request");

    let snapshot = state.index.snapshot();
    let state2 = state.clone();

    let listing = tokio::task::spawn_blocking(move || {
        let mut out = String::new();
        let mut entries_found = false;

        for (owner, audios) in snapshot {
            let _ = writeln!(out, "{owner}:");

            for audio in audios {
                let path = state2.layout.artifact_path(&owner, &audio, METADATA_FILE);
                if !path.is_file() {
                    continue;
                }
                match metadata::parse_file(&path) {
                    Ok(meta) => {
                        let stream = meta.stream_0.unwrap_or_default();
                        let bitrates = meta
                            .audio_parser
                            .transcoded_bitrates
                            .iter()
                            .map(|b| b.to_string())
                            .collect::<Vec<_>>()
                            .join(",");
                        let _ = writeln!(out, "  - {audio}");
                        let _ = writeln!(out, "      1. Title: {}", meta.metadata.title);
                        let _ = writeln!(out, "      2. Artist: {}", meta.metadata.artist);
                        let _ = writeln!(out, "      3. Duration: {} secs", meta.audio_parser.duration);
                        let _ = writeln!(out, "      4. Album: {}", meta.metadata.album);
                        let _ = writeln!(out, "      5. Bitrate: {} kbps", meta.audio_parser.bitrate);
                        let _ = writeln!(out, "      6. Sample Rate: {} Hz", stream.sample_rate);
                        let _ = writeln!(out, "      7. Sample Format: {}", stream.sample_format);
                        let _ = writeln!(out, "      8. Audio Bitrate: {} kbps", stream.bitrate);
                        let _ = writeln!(out, "      9. Codec: {}", stream.codec);
                        let _ = writeln!(out, "      10. Available Bitrates: [{bitrates}]");
                        entries_found = true;
                    }
                    Err(err) => {
                        error!(audio = %audio, error = %err, "metadata parse failed during listing");
                    }
                }
            }
        }

        entries_found.then_some(out)
    })
    .await
    .map_err(|err| ServerError::Internal(format!("listing task failed: {err}")))?;

    listing.ok_or_else(|| ServerError::NotFound("Audio metadata".into()))
}
