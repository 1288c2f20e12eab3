//! Axum router construction.
//!
//! [`build`] assembles the complete application router, including:
//! - Middleware layers (CORS, per-request trace-ID injection)
//! - Optional Swagger UI / OpenAPI spec endpoint (disable with `CONFAB_ENABLE_SWAGGER=false`)
//! - Health / heartbeat route
//! - `/v1` chat route behind the identity gate
//! - `/admin` routes (optionally protected by bearer token)

mod admin;
pub mod doc;
mod health;
mod turn;
mod v1;

use crate::middleware::{cors, trace};
use crate::state::AppState;
use axum::{Router, middleware};
use std::sync::Arc;
use utoipa_swagger_ui::SwaggerUi;

/// Build the complete Axum [`Router`] for the application.
pub fn build(state: Arc<AppState>) -> Router {
    let mut app = Router::new()
        .merge(health::router())
        .nest("/v1", v1::router())
        .nest("/admin", admin::router(state.clone()));

    if state.config.enable_swagger {
        app = app.merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", doc::get_docs()));
    }

    app
        // Outermost layers execute first on the way in.
        .layer(cors::cors_layer(state.clone()))
        .layer(middleware::from_fn(trace::trace_middleware))
        .with_state(state)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::Config;
    use crate::entities::{AnyStore, ChatStore, MessageRole};
    use crate::state::TurnRegistry;
    use crate::upstream::HttpUpstream;
    use crate::upstream::http::{COMPLETION_PATH, SESSION_INIT_PATH};
    use axum::body::{Body, Bytes};
    use axum::http::{Request, StatusCode, header};
    use axum::routing::post;
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use std::convert::Infallible;
    use std::time::Duration;
    use tower::ServiceExt;

    /// Fake completion service answering every turn with "Hello".
    async fn fake_upstream() -> String {
        let router = Router::new()
            .route(SESSION_INIT_PATH, post(|| async { StatusCode::OK }))
            .route(
                COMPLETION_PATH,
                post(|| async {
                    let chunks = futures::stream::iter(vec![
                        Ok::<_, Infallible>(Bytes::from_static(b"data: {\"type\":\"content\",\"data\":\"Hel")),
                        Ok(Bytes::from_static(b"lo\"}\n\ndata: {\"type\":\"done\"}\n\n")),
                    ]);
                    ([(header::CONTENT_TYPE, "text/event-stream")], Body::from_stream(chunks))
                }),
            );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    async fn app_state(upstream_url: &str, admin_token: Option<&str>) -> Arc<AppState> {
        let config = Config {
            upstream_url: upstream_url.to_owned(),
            admin_token: admin_token.map(Into::into),
            enable_swagger: false,
            ..Config::default()
        };
        Arc::new(AppState {
            upstream: Arc::new(HttpUpstream::new(upstream_url, Duration::from_secs(5)).unwrap()),
            config: Arc::new(config),
            store: Arc::new(AnyStore::in_memory().await),
            turns: Arc::new(TurnRegistry::new()),
        })
    }

    fn chat_request(uri: &str, user: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::post(uri).header(header::CONTENT_TYPE, "application/json");
        if let Some(user) = user {
            builder = builder.header("x-user-id", user);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn body_text(resp: axum::response::Response) -> String {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn health_is_open() {
        let state = app_state("http://127.0.0.1:9", None).await;
        let resp = build(state)
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp.headers().contains_key(trace::X_TRACE_ID));
    }

    #[tokio::test]
    async fn chat_without_identity_is_unauthorized() {
        let state = app_state("http://127.0.0.1:9", None).await;
        let resp = build(state)
            .oneshot(chat_request("/v1/chat", None, json!({ "message": "hi", "agent_id": "a" })))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn invalid_turn_is_a_json_400() {
        let state = app_state("http://127.0.0.1:9", None).await;
        let resp = build(state)
            .oneshot(chat_request("/v1/chat", Some("u-1"), json!({ "message": "   ", "agent_id": "a" })))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = serde_json::from_str(&body_text(resp).await).unwrap();
        assert!(body["error"].as_str().is_some());
    }

    #[tokio::test]
    async fn unreachable_upstream_is_a_502() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let state = app_state(&url, None).await;
        let resp = build(state)
            .oneshot(chat_request("/v1/chat", Some("u-1"), json!({ "message": "hi", "agent_id": "a" })))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
        let body: Value = serde_json::from_str(&body_text(resp).await).unwrap();
        assert_eq!(body["error"], "upstream unavailable");
    }

    #[tokio::test]
    async fn chat_streams_reply_and_persists_it() {
        let state = app_state(&fake_upstream().await, None).await;
        let resp = build(state.clone())
            .oneshot(chat_request("/v1/chat", Some("u-1"), json!({ "message": "Hi", "agent_id": "a" })))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[header::CONTENT_TYPE], "text/event-stream");
        assert_eq!(resp.headers()[header::CACHE_CONTROL], "no-cache");
        assert_eq!(resp.headers()["x-accel-buffering"], "no");
        assert!(resp.headers().contains_key(turn::X_TURN_ID));

        let text = body_text(resp).await;
        let sessions = state.store.list_user_sessions("u-1").await.unwrap();
        assert_eq!(sessions.len(), 1);
        let session_id = &sessions[0].id;
        assert_eq!(
            text,
            format!(
                "data: {{\"type\":\"conversation_id\",\"id\":\"{session_id}\"}}\n\n\
                 data: {{\"type\":\"content\",\"data\":\"Hello\"}}\n\n\
                 data: {{\"type\":\"done\"}}\n\n"
            )
        );

        // The reply is written after the stream closes.
        let mut roles = Vec::new();
        for _ in 0..50 {
            roles = state
                .store
                .list_messages(session_id)
                .await
                .unwrap()
                .into_iter()
                .map(|m| m.role)
                .collect();
            if roles.len() == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(roles, vec![MessageRole::User, MessageRole::Assistant]);
    }

    #[tokio::test]
    async fn admin_routes_require_token_when_configured() {
        let state = app_state("http://127.0.0.1:9", Some("s3cret")).await;
        let app = build(state);

        let resp = app
            .clone()
            .oneshot(Request::get("/admin/turns").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let resp = app
            .oneshot(
                Request::get("/admin/turns")
                    .header(header::AUTHORIZATION, "Bearer s3cret")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_text(resp).await, "[]");
    }

    #[tokio::test]
    async fn cancelling_unknown_turn_is_404() {
        let state = app_state("http://127.0.0.1:9", None).await;
        let resp = build(state)
            .oneshot(Request::delete("/admin/turns/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn admin_chat_may_continue_any_conversation() {
        let state = app_state(&fake_upstream().await, None).await;
        let app = build(state.clone());

        let resp = app
            .clone()
            .oneshot(chat_request("/v1/chat", Some("owner"), json!({ "message": "Hi", "agent_id": "a" })))
            .await
            .unwrap();
        body_text(resp).await;
        let session_id = state.store.list_user_sessions("owner").await.unwrap()[0].id.clone();

        let foreign = json!({ "message": "me too", "agent_id": "a", "session_id": session_id });
        let resp = app
            .clone()
            .oneshot(chat_request("/v1/chat", Some("someone-else"), foreign.clone()))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let resp = app
            .oneshot(chat_request("/admin/chat", None, foreign))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(body_text(resp).await.ends_with("data: {\"type\":\"done\"}\n\n"));
    }
}
