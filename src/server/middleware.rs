use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::monitoring::RequestTimer;
use crate::server::AppState;

/// Request accounting for every route: one scoped timer per request,
/// created at entry and recording elapsed time plus outcome counters when
/// it goes out of scope. A handler cancelled mid-flight (client
/// disconnect, shutdown drain) drops the timer unmarked and counts as a
/// failure.
pub async fn track_requests(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    let mut timer = RequestTimer::new(&state.metrics);
    let response = next.run(req).await;
    timer.mark(response.status().as_u16());
    response
}
