//! In-flight turn management.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get};
use axum::{Json, Router};
use tracing::info;
use utoipa::OpenApi;

use crate::error::ServerError;
use crate::schemas::admin::turns::TurnResponse;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(paths(list_turns, cancel_turn), components(schemas(TurnResponse)))]
pub struct TurnsApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/turns", get(list_turns))
        .route("/turns/{id}", delete(cancel_turn))
}

#[utoipa::path(
    get,
    path = "/admin/turns",
    tag = "admin",
    responses(
        (status = 200, description = "In-flight turns, oldest first", body = [TurnResponse]),
        (status = 401, description = "Missing or wrong management token"),
    )
)]
pub async fn list_turns(State(state): State<Arc<AppState>>) -> Json<Vec<TurnResponse>> {
    Json(state.turns.list().iter().map(|t| t.to_response()).collect())
}

/// Abort an in-flight turn. Its partial reply is not persisted.
#[utoipa::path(
    delete,
    path = "/admin/turns/{id}",
    tag = "admin",
    params(
        ("id" = String, Path, description = "ID of the turn to abort")
    ),
    responses(
        (status = 204, description = "Turn aborted"),
        (status = 401, description = "Missing or wrong management token"),
        (status = 404, description = "No such in-flight turn"),
    )
)]
pub async fn cancel_turn(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ServerError> {
    if !state.turns.cancel(&id) {
        return Err(ServerError::NotFound(format!("turn {id} is not in flight")));
    }
    info!(turn_id = %id, "turn aborted by operator");
    Ok(StatusCode::NO_CONTENT)
}
