//! Turn execution shared by the user-facing and admin chat routes.

use std::convert::Infallible;
use std::sync::Arc;

use axum::body::Body;
use axum::response::Response;
use futures::StreamExt;
use http::HeaderName;
use http::header;
use tokio_stream::wrappers::ReceiverStream;

use crate::error::ServerError;
use crate::relay::{Turn, TurnSettings, spawn_turn, start_turn};
use crate::state::AppState;

pub const X_TURN_ID: HeaderName = HeaderName::from_static("x-turn-id");
const X_ACCEL_BUFFERING: HeaderName = HeaderName::from_static("x-accel-buffering");

/// Start `turn` and answer with its event stream.
///
/// Everything up to the upstream response status is awaited here, so those
/// failures surface as ordinary JSON error responses.
pub async fn stream_turn(state: Arc<AppState>, turn: Turn) -> Result<Response, ServerError> {
    let settings = TurnSettings {
        history_replay: state.config.history_replay,
    };
    let prepared = start_turn(&*state.store, &*state.upstream, turn, settings).await?;
    let turn_id = prepared.turn_id.clone();

    let (frames, _task) = spawn_turn(state.store.clone(), prepared, state.turns.clone());
    let body = Body::from_stream(ReceiverStream::new(frames).map(Ok::<_, Infallible>));

    Response::builder()
        .header(header::CONTENT_TYPE, confab_sse::CONTENT_TYPE)
        .header(header::CACHE_CONTROL, "no-cache")
        .header(X_ACCEL_BUFFERING, "no")
        .header(X_TURN_ID, turn_id)
        .body(body)
        .map_err(|e| ServerError::Internal(format!("failed to build stream response: {e}")))
}
