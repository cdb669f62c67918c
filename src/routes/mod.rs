//! Router assembly: liveness, message webhook, progress query, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod http;

/// Build the application router with:
/// - liveness at `/` (fixed text body)
/// - REST-ish API under `/api/v1/...`
/// - CORS (allow any origin/method/headers)
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(http::http_root))
        .route("/api/v1/health", get(http::http_health))
        .route("/api/v1/message", post(http::http_post_message))
        .route("/api/v1/progress", get(http::http_get_progress))
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    use crate::config::parse_quest_config;
    use crate::quest::Quest;
    use crate::store::MemoryStore;

    const QUEST: &str = r#"
title = "Router Quest"
start = "q1"
finish = "end"

[[checkpoints]]
id = "q1"
title = "First"
text = "Type 'ready'"
type = "text"
patterns = ["ready"]

[[checkpoints]]
id = "end"
title = "End"
type = "finish"
prize = "R-{digits:4}"
"#;

    fn router() -> Router {
        let quest = Quest::from_config(parse_quest_config(QUEST).unwrap()).unwrap();
        build_router(Arc::new(AppState::new(quest, Arc::new(MemoryStore::new()))))
    }

    async fn post_message(app: &Router, body: serde_json::Value) -> serde_json::Value {
        let req = Request::post("/api/v1/message")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let res = app.clone().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn liveness_returns_fixed_text() {
        let res = router()
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"Bot is running!");
    }

    #[tokio::test]
    async fn message_flow_over_http() {
        let app = router();

        let out = post_message(&app, serde_json::json!({ "userId": "7", "text": "/start" })).await;
        assert_eq!(out["outcome"]["kind"], "started");

        let out = post_message(&app, serde_json::json!({ "userId": "7", "photo": "file-1" })).await;
        assert_eq!(out["outcome"]["kind"], "wrong_input");

        let out = post_message(&app, serde_json::json!({ "userId": "7", "text": "I am READY" })).await;
        assert_eq!(out["outcome"]["kind"], "advanced");
        assert_eq!(out["outcome"]["to"], "end");

        let out = post_message(&app, serde_json::json!({ "userId": "7", "text": "prize pls" })).await;
        assert_eq!(out["outcome"]["kind"], "prize_issued");
        let code = out["outcome"]["code"].as_str().unwrap().to_string();
        assert!(code.starts_with("R-") && code.len() == 6);

        let out = post_message(&app, serde_json::json!({ "userId": "7", "text": "/help" })).await;
        assert_eq!(out["outcome"]["kind"], "help");
    }

    #[tokio::test]
    async fn progress_endpoint_reports_counts() {
        let app = router();
        post_message(&app, serde_json::json!({ "userId": "9", "text": "ready" })).await;

        let res = app
            .oneshot(Request::get("/api/v1/progress?userId=9").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let out: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(out, serde_json::json!({ "completed": 1, "total": 2, "currentTitle": "End" }));
    }
}
