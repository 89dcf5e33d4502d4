//! HTTP router construction.
//!
//! Assembles all Axum routes, middleware, and OpenAPI docs into a single `Router`.

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

use crate::api;
use crate::state::AppState;

fn cors_layer(origin: &str) -> CorsLayer {
    if origin == "*" {
        return CorsLayer::permissive();
    }
    match origin.parse::<HeaderValue>() {
        Ok(value) => CorsLayer::new()
            .allow_origin(value)
            .allow_methods(Any)
            .allow_headers(Any),
        Err(_) => {
            tracing::warn!(origin, "Invalid CORS_ORIGIN, allowing any origin");
            CorsLayer::permissive()
        }
    }
}

/// Build the complete application router with all routes and middleware.
pub fn build_router(state: Arc<AppState>, cors_origin: &str) -> Router {
    Router::new()
        .route("/health", get(api::health))
        .route("/chat", post(api::chat))
        .route("/chat/stream", post(api::chat_stream))
        .route("/api/url", post(api::create_url))
        .route("/api/report/{slug}", post(api::clicks_report))
        // Catch-all for shorties; static routes above take precedence.
        .route("/{slug}", get(api::redirect))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(cors_origin))
        .with_state(state)
        .merge(Scalar::with_url("/docs", api::doc::ApiDoc::openapi()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use shrty_links::{ClickAnalytics, MemoryClickAnalytics, MemoryUrlStore, UrlStore};
    use shrty_tool_runtime::provider::mock::MockModelClient;
    use shrty_tool_runtime::{default_registry, DispatchLoop, ModelResponse, ToolCall};
    use tower::ServiceExt;

    struct Harness {
        client: Arc<MockModelClient>,
        store: Arc<MemoryUrlStore>,
        app: Router,
    }

    fn harness(client: MockModelClient, max_iterations: usize) -> Harness {
        let client = Arc::new(client);
        let store = Arc::new(MemoryUrlStore::new());
        let analytics: Arc<dyn ClickAnalytics> = Arc::new(MemoryClickAnalytics::new());
        let registry = default_registry(store.clone(), analytics.clone()).unwrap();
        let dispatch = DispatchLoop::new(client.clone(), Arc::new(registry), "test preamble")
            .with_max_iterations(max_iterations);

        let state = Arc::new(AppState {
            dispatch: Arc::new(dispatch),
            store: store.clone(),
            analytics,
            model_label: "mock/test".into(),
        });
        Harness {
            client,
            store,
            app: build_router(state, "*"),
        }
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
        response.into_body().collect().await.unwrap().to_bytes().to_vec()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        serde_json::from_slice(&body_bytes(response).await).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let h = harness(MockModelClient::new(), 8);
        let response = h
            .app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["store"], "memory");
        assert_eq!(json["max_iterations"], 8);
    }

    #[tokio::test]
    async fn test_chat_creates_shorty() {
        let h = harness(MockModelClient::new(), 8);
        h.client.queue_tool_call(
            "createShorty",
            json!({"slug": "ex", "url": "https://example.com"}),
        );
        h.client.queue_text("Your shorty /ex is live!");

        let response = h
            .app
            .oneshot(post_json(
                "/chat",
                json!({"messages": [{"role": "user", "content": "Shorten https://example.com as ex"}]}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        let messages = json["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1]["role"], "tool");
        assert_eq!(messages[1]["name"], "createShorty");
        assert_eq!(
            messages[1]["content"],
            r#"{"slug":"ex","url":"https://example.com","shorty":"/ex"}"#
        );
        assert_eq!(messages[2]["role"], "assistant");
        assert!(messages.iter().all(|m| m["role"] != "system"));
        assert_eq!(
            h.store.get("ex").await.unwrap().as_deref(),
            Some("https://example.com")
        );
    }

    #[tokio::test]
    async fn test_chat_loop_bound_is_server_error_with_conversation() {
        let client = MockModelClient::new().with_fallback(ModelResponse::tool_calls(vec![
            ToolCall::new("getClicksByCountryReport", json!({"slug": "ex"})),
        ]));
        let h = harness(client, 2);

        let response = h
            .app
            .oneshot(post_json(
                "/chat",
                json!({"messages": [{"role": "user", "content": "report forever"}]}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert!(json["error"].as_str().unwrap().contains("Max iterations (2)"));
        let messages = json["messages"].as_array().unwrap();
        assert_eq!(messages[0]["content"], "report forever");
        assert_eq!(messages.iter().filter(|m| m["role"] == "tool").count(), 2);
    }

    #[tokio::test]
    async fn test_chat_model_failure_is_bad_gateway() {
        let h = harness(MockModelClient::new(), 8);
        h.client.queue_error("upstream unreachable");

        let response = h
            .app
            .oneshot(post_json(
                "/chat",
                json!({"messages": [{"role": "user", "content": "hi"}]}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let json = body_json(response).await;
        assert_eq!(json["messages"], json!([{"role": "user", "content": "hi"}]));
    }

    #[tokio::test]
    async fn test_chat_stream_sends_final_text_only() {
        let h = harness(MockModelClient::new(), 8);
        h.client.queue_tool_call(
            "createShorty",
            json!({"slug": "ex", "url": "https://example.com"}),
        );
        h.client.queue_text("Here is your shorty");

        let response = h
            .app
            .oneshot(post_json(
                "/chat/stream",
                json!({"messages": [{"role": "user", "content": "shorten it"}]}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );
        let body = body_bytes(response).await;
        assert_eq!(String::from_utf8(body).unwrap(), "Here is your shorty");
        assert_eq!(h.client.call_count(), 2);
    }

    #[tokio::test]
    async fn test_chat_stream_loop_bound_is_server_error() {
        let client = MockModelClient::new().with_fallback(ModelResponse::tool_calls(vec![
            ToolCall::new("getClicksByCountryReport", json!({"slug": "ex"})),
        ]));
        let h = harness(client, 2);

        let response = h
            .app
            .oneshot(post_json(
                "/chat/stream",
                json!({"messages": [{"role": "user", "content": "report forever"}]}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert!(json["error"].as_str().unwrap().contains("Max iterations (2)"));
        let messages = json["messages"].as_array().unwrap();
        assert_eq!(messages.iter().filter(|m| m["role"] == "tool").count(), 2);
    }

    #[tokio::test]
    async fn test_chat_stream_model_failure_is_bad_gateway() {
        let h = harness(MockModelClient::new(), 8);
        h.client.queue_error("upstream unreachable");

        let response = h
            .app
            .oneshot(post_json(
                "/chat/stream",
                json!({"messages": [{"role": "user", "content": "hi"}]}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let json = body_json(response).await;
        assert_eq!(json["messages"], json!([{"role": "user", "content": "hi"}]));
    }

    #[tokio::test]
    async fn test_create_redirect_and_report() {
        let h = harness(MockModelClient::new(), 8);

        let response = h
            .app
            .clone()
            .oneshot(post_json(
                "/api/url",
                json!({"slug": "ex", "url": "https://example.com"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({"slug": "ex", "url": "https://example.com", "shorty": "/ex"})
        );

        let response = h
            .app
            .clone()
            .oneshot(
                Request::get("/ex")
                    .header("cf-ipcountry", "DE")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[header::LOCATION], "https://example.com");

        let response = h
            .app
            .oneshot(Request::post("/api/report/ex").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!([{"country": "DE", "total": 1}])
        );
    }

    #[tokio::test]
    async fn test_create_url_keeps_existing_without_override() {
        let h = harness(MockModelClient::new(), 8);
        h.store.put("ex", "https://a.example").await.unwrap();

        let response = h
            .app
            .oneshot(post_json(
                "/api/url",
                json!({"slug": "ex", "url": "https://b.example"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["url"], "https://a.example");
        assert!(json["message"].as_str().unwrap().starts_with("Did not update ex"));
    }

    #[tokio::test]
    async fn test_create_url_rejects_bad_input() {
        let h = harness(MockModelClient::new(), 8);
        let response = h
            .app
            .oneshot(post_json(
                "/api/url",
                json!({"slug": "a/b", "url": "https://example.com"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(h.store.is_empty().await);
    }

    #[tokio::test]
    async fn test_unknown_slug_is_not_found() {
        let h = harness(MockModelClient::new(), 8);
        let response = h
            .app
            .oneshot(Request::get("/missing").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_docs_served() {
        let h = harness(MockModelClient::new(), 8);
        let response = h
            .app
            .oneshot(Request::get("/docs").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
