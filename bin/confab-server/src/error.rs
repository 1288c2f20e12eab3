//! Unified server error type.
//!
//! Every handler returns `Result<T, ServerError>`, which implements
//! [`axum::response::IntoResponse`] so errors are automatically converted
//! to a JSON-body HTTP response with an appropriate status code.
//!
//! Only failures discovered before the first byte of a turn stream is sent
//! travel through this type. Mid-stream failures become `error` events and
//! post-stream failures are logged by the relay.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use crate::upstream::UpstreamError;

/// All errors that can occur in the confab-server request lifecycle.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The turn is structurally invalid; no I/O was attempted.
    #[error("validation error: {0}")]
    Validation(String),

    /// The identity gate or the management token rejected the caller.
    #[error("unauthorized")]
    Unauthorized,

    /// The caller may not act on this resource.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The caller referenced a resource that does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The upstream service could not be reached.
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// The upstream service answered the completion request with a
    /// non-success status before streaming began.
    #[error("upstream returned status {status}: {body}")]
    UpstreamErrorStatus { status: u16, body: String },

    /// Propagated from the conversation store.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// An unclassified internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, client_message) = match &self {
            // Client-facing errors: expose the message directly.
            ServerError::Validation(m) => (StatusCode::BAD_REQUEST, m.clone()),
            ServerError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorised".to_owned()),
            ServerError::Forbidden(m) => (StatusCode::FORBIDDEN, m.clone()),
            ServerError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),

            // Upstream failures: the caller learns which side failed, not how.
            ServerError::UpstreamUnavailable(m) => {
                warn!(error = %m, "upstream unavailable");
                (StatusCode::BAD_GATEWAY, "upstream unavailable".to_owned())
            }
            ServerError::UpstreamErrorStatus { status, body } => {
                warn!(upstream_status = status, body = %body, "upstream rejected completion request");
                (
                    StatusCode::BAD_GATEWAY,
                    format!("upstream returned status {status}"),
                )
            }

            // Internal errors: log the full detail, return a generic message.
            ServerError::Database(e) => {
                error!(error = %e, "database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_owned(),
                )
            }
            ServerError::Internal(m) => {
                error!(message = %m, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_owned(),
                )
            }
        };
        (status, Json(json!({ "error": client_message }))).into_response()
    }
}

impl From<UpstreamError> for ServerError {
    fn from(e: UpstreamError) -> Self {
        match e {
            UpstreamError::Unavailable(m) => ServerError::UpstreamUnavailable(m),
            UpstreamError::Status { status, body } => ServerError::UpstreamErrorStatus { status, body },
            UpstreamError::Stream(m) => ServerError::UpstreamUnavailable(m),
        }
    }
}

impl From<validator::ValidationErrors> for ServerError {
    fn from(e: validator::ValidationErrors) -> Self {
        ServerError::Validation(e.to_string())
    }
}
