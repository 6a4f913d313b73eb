use std::sync::Arc;
use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::common::consts::mib;
use crate::server::handlers::{delete as delete_handler, download, owners, system, upload};
use crate::server::{AppState, middleware};

/// The full routing table. Upload gets its own body cap and no deadline;
/// everything else runs under the configured request timeout.
pub fn router(state: Arc<AppState>) -> Router {
    let timeout = Duration::from_secs(state.config.server.request_timeout_sec);
    let upload_limit = mib(state.config.storage.upload_limit_mib) as usize;

    let general = Router::new()
        .route("/hls/ping", get(system::ping))
        .route("/hls/owners", get(owners::list_owners))
        .route("/hls/audio-info/", get(owners::list_audio_info))
        .route(
            "/hls/{owner}/{audio}/{filename}",
            get(download::download_artifact),
        )
        .route(
            "/stream/{owner}/{audio}/{filename}",
            get(download::stream_artifact),
        )
        .route("/{owner}/{audio}", delete(delete_handler::delete_audio))
        .route("/health", get(system::health))
        .route("/metrics", get(system::metrics))
        .route("/owner/metrics/{owner}", get(system::owner_metrics))
        .layer(TimeoutLayer::new(timeout));

    let uploads = Router::new()
        .route("/toml/upload", post(upload::upload_archive))
        .layer(DefaultBodyLimit::max(upload_limit));

    Router::new()
        .merge(general)
        .merge(uploads)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::track_requests,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
