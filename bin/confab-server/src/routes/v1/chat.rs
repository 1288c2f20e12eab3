//! User-facing chat turn route.

use std::sync::Arc;

use axum::extract::State;
use axum::response::Response;
use axum::routing::post;
use axum::{Extension, Json, Router};
use tracing::debug;
use utoipa::OpenApi;

use crate::entities::FileAttachment;
use crate::error::ServerError;
use crate::middleware::auth::Identity;
use crate::relay::{TurnOrigin, validate_turn};
use crate::routes::turn::stream_turn;
use crate::schemas::v1::chat::ChatTurnRequest;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(paths(chat_turn), components(schemas(ChatTurnRequest, FileAttachment)))]
pub struct ChatApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/chat", post(chat_turn))
}

/// Send one chat turn and stream the reply (`POST /v1/chat`).
///
/// Omit `conversation_id` to start a new conversation; its id is then the
/// first event of the stream. Continuing a conversation requires owning it.
#[utoipa::path(
    post,
    path = "/v1/chat",
    tag = "chat",
    request_body = ChatTurnRequest,
    params(("x-user-id" = String, Header, description = "Caller identity")),
    responses(
        (status = 200, description = "Reply stream", content_type = "text/event-stream", body = String),
        (status = 400, description = "Invalid turn"),
        (status = 401, description = "Missing identity"),
        (status = 403, description = "Conversation belongs to another user"),
        (status = 404, description = "Conversation not found"),
        (status = 502, description = "Upstream unavailable or rejected the request"),
    )
)]
pub async fn chat_turn(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<ChatTurnRequest>,
) -> Result<Response, ServerError> {
    debug!(
        user_id = %identity.user_id,
        conversation_id = ?req.conversation_id,
        files = req.files.len(),
        "chat turn request"
    );
    let turn = validate_turn(req, identity.user_id, TurnOrigin::User, &state.config.default_model)?;
    stream_turn(state, turn).await
}
