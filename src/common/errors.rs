use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Domain errors surfaced by the HTTP layer.
///
/// Variants map one-to-one onto response status codes; the body text a
/// client sees is always the safe message below, never an internal error
/// string (those stay in the logs).
#[derive(Debug, Error)]
pub enum ServerError {
    /// Missing fields, wrong extension, invalid archive content.
    #[error("{0}")]
    Malformed(String),

    /// Upload body exceeded the configured ceiling.
    #[error("upload exceeds the configured size limit")]
    Oversize,

    /// Unknown owner, audio or file.
    #[error("{0} not found")]
    NotFound(String),

    /// Deletion key mismatch.
    #[error("invalid key")]
    Forbidden,

    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),

    /// Index inconsistency or another fault that has no client-side cause.
    #[error("{0}")]
    Internal(String),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Malformed(_) => StatusCode::BAD_REQUEST,
            Self::Oversize => StatusCode::PAYLOAD_TOO_LARGE,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Io(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Body text sent to the client. Server-side faults collapse to a
    /// generic line so implementation detail never leaks.
    pub fn client_message(&self) -> String {
        match self {
            Self::Malformed(msg) => msg.clone(),
            Self::Oversize => "Upload too large".into(),
            Self::NotFound(what) => format!("{what} not found"),
            Self::Forbidden => "Invalid key".into(),
            Self::Io(_) | Self::Internal(_) => "Internal Server Error".into(),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, self.client_message()).into_response()
    }
}
