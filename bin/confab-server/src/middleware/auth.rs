use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, Request, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::debug;

use crate::error::ServerError;
use crate::state::AppState;

/// Header carrying the caller identity established by the fronting gateway.
pub const X_USER_ID: &str = "x-user-id";

/// Authenticated caller, attached to the request by [`require_identity`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
}

/// Identity from the [`X_USER_ID`] header, if present and non-blank.
pub fn header_identity(headers: &HeaderMap) -> Option<Identity> {
    headers
        .get(X_USER_ID)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|user_id| Identity {
            user_id: user_id.to_owned(),
        })
}

/// Reject requests without an identity; otherwise expose it as an
/// [`Identity`] extension.
pub async fn require_identity(mut req: Request<Body>, next: Next) -> Response {
    match header_identity(req.headers()) {
        Some(identity) => {
            req.extensions_mut().insert(identity);
            next.run(req).await
        }
        None => {
            debug!("request without identity rejected");
            ServerError::Unauthorized.into_response()
        }
    }
}

/// Bearer-token gate for management routes. Open when no token is configured.
pub async fn check_management_auth(
    State(state): State<Arc<AppState>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if let Some(expected_token) = state.config.admin_token.as_deref() {
        let provided = req
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "));
        match provided {
            Some(token) if token == expected_token => {}
            _ => return ServerError::Unauthorized.into_response(),
        }
    }
    next.run(req).await
}
