//! Management-console playground turns.

use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::Response;
use axum::routing::post;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::error::ServerError;
use crate::middleware::auth::header_identity;
use crate::relay::{TurnOrigin, validate_turn};
use crate::routes::turn::stream_turn;
use crate::schemas::v1::chat::ChatTurnRequest;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(paths(admin_chat_turn))]
pub struct AdminChatApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/chat", post(admin_chat_turn))
}

/// Playground variant of `POST /v1/chat`; may continue any conversation.
#[utoipa::path(
    post,
    path = "/admin/chat",
    tag = "admin",
    request_body = ChatTurnRequest,
    responses(
        (status = 200, description = "Reply stream", content_type = "text/event-stream", body = String),
        (status = 400, description = "Invalid turn"),
        (status = 401, description = "Missing or wrong management token"),
        (status = 404, description = "Conversation not found"),
        (status = 502, description = "Upstream unavailable or rejected the request"),
    )
)]
pub async fn admin_chat_turn(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<ChatTurnRequest>,
) -> Result<Response, ServerError> {
    let user_id = header_identity(&headers)
        .map(|identity| identity.user_id)
        .unwrap_or_else(|| state.config.console_identity.clone());
    let turn = validate_turn(req, user_id, TurnOrigin::Admin, &state.config.default_model)?;
    stream_turn(state, turn).await
}
