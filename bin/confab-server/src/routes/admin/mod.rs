pub mod chat;
pub mod turns;

use crate::middleware::auth;
use crate::state::AppState;

use axum::{Router, middleware};
use std::sync::Arc;
use utoipa::OpenApi;

/// Routes nested under `/admin` (playground chat, in-flight turns).
pub fn router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .merge(chat::router())
        .merge(turns::router())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::check_management_auth,
        ))
        .with_state(state)
}

#[derive(OpenApi)]
#[openapi()]
pub struct AdminApi;

pub fn api_docs() -> utoipa::openapi::OpenApi {
    let mut spec = AdminApi::openapi();
    spec.merge(chat::AdminChatApi::openapi());
    spec.merge(turns::TurnsApi::openapi());
    spec
}
