pub mod chat;

use crate::middleware::auth;
use crate::state::AppState;
use utoipa::OpenApi;

use axum::{Router, middleware};
use std::sync::Arc;

/// Routes nested under `/v1`; every request needs a caller identity.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .merge(chat::router())
        .route_layer(middleware::from_fn(auth::require_identity))
}

#[derive(OpenApi)]
#[openapi()]
pub struct V1Api;

pub fn api_docs() -> utoipa::openapi::OpenApi {
    let mut spec = V1Api::openapi();
    spec.merge(chat::ChatApi::openapi());
    spec
}
