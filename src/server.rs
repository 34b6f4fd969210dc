use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

use crate::bot::{self, AppState, WebhookReply};

/// Largest accepted update body; bigger requests are answered with 413.
pub const WEBHOOK_BODY_LIMIT: usize = 1024 * 1024;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(hello_world))
        .route(
            "/webhook",
            post(webhook).layer(DefaultBodyLimit::max(WEBHOOK_BODY_LIMIT)),
        )
        .with_state(state)
}

async fn hello_world() -> &'static str {
    "Hello, World!"
}

// The raw body is taken as bytes so malformed updates within the body limit
// reach the handler and still get a 200 instead of an extractor rejection.
async fn webhook(State(state): State<Arc<AppState>>, body: Bytes) -> WebhookReply {
    bot::handle_update(&state, &body).await
}

impl IntoResponse for WebhookReply {
    fn into_response(self) -> Response {
        match self {
            WebhookReply::Ack => (StatusCode::OK, "OK").into_response(),
            WebhookReply::Fallback(message) => (StatusCode::OK, Json(message)).into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Call, RecordingMessenger, ScriptedGenerator};
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app(generator: ScriptedGenerator) -> (Router, Arc<RecordingMessenger>) {
        let messenger = Arc::new(RecordingMessenger::new());
        let state = Arc::new(AppState::new(messenger.clone(), Arc::new(generator)));
        (router(state), messenger)
    }

    async fn body_string(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("failed to read response body");
        String::from_utf8(bytes.to_vec()).expect("body should be utf-8")
    }

    fn post_webhook(body: impl Into<Body>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/webhook")
            .header("content-type", "application/json")
            .body(body.into())
            .unwrap()
    }

    #[tokio::test]
    async fn test_liveness() {
        let (app, _) = app(ScriptedGenerator::replying("unused"));
        let request = Request::builder().uri("/").body(Body::empty()).unwrap();

        let response = app.oneshot(request).await.expect("failed to make request");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "Hello, World!");
    }

    #[tokio::test]
    async fn test_edited_message_acknowledged() {
        let (app, messenger) = app(ScriptedGenerator::replying("unused"));
        let update = json!({ "edited_message": { "chat": { "id": 1 }, "text": "x" } });

        let response = app
            .oneshot(post_webhook(update.to_string()))
            .await
            .expect("failed to make request");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "OK");
        assert!(messenger.calls().is_empty());
    }

    #[tokio::test]
    async fn test_text_message_round_trip() {
        let (app, messenger) = app(ScriptedGenerator::replying("Hi!"));
        let update = json!({ "message": { "chat": { "id": 12 }, "text": "hello" } });

        let response = app
            .oneshot(post_webhook(update.to_string()))
            .await
            .expect("failed to make request");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "OK");
        assert!(messenger.calls().contains(&Call::Edit {
            chat_id: 12,
            message_id: 1,
            text: "Hi\\!".to_string(),
            mode: crate::platform::MarkupMode::MarkdownV2,
        }));
    }

    #[tokio::test]
    async fn test_backend_failure_returns_fallback_instruction() {
        let (app, _) = app(ScriptedGenerator::failing());
        let update = json!({ "message": { "chat": { "id": 99 }, "text": "hello" } });

        let response = app
            .oneshot(post_webhook(update.to_string()))
            .await
            .expect("failed to make request");

        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = serde_json::from_str(&body_string(response).await)
            .expect("fallback should be valid JSON");
        assert_eq!(
            body,
            json!({ "method": "sendMessage", "chat_id": 99, "text": bot::APOLOGY_TEXT })
        );
    }

    #[tokio::test]
    async fn test_malformed_body_still_succeeds() {
        let (app, _) = app(ScriptedGenerator::replying("unused"));

        let response = app
            .oneshot(post_webhook("not json"))
            .await
            .expect("failed to make request");

        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(body["chat_id"], Value::Null);
    }

    #[tokio::test]
    async fn test_oversized_body_rejected() {
        let (app, messenger) = app(ScriptedGenerator::replying("unused"));

        let response = app
            .oneshot(post_webhook(vec![b'a'; WEBHOOK_BODY_LIMIT + 1]))
            .await
            .expect("failed to make request");

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert!(messenger.calls().is_empty());
    }
}
