//! OpenAPI documentation, served via Scalar UI at `/docs`.

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "shrty API",
        version = "0.1.0",
        description = "URL shortener with a tool-calling chat assistant.",
    ),
    tags(
        (name = "Health", description = "Server liveness"),
        (name = "Chat", description = "Assistant conversations with createShorty and getClicksByCountryReport tools"),
        (name = "Links", description = "Shorty creation, click reports, and redirects"),
    ),
    paths(
        crate::api::health::health,
        crate::api::chat::chat,
        crate::api::chat::chat_stream,
        crate::api::urls::create_url,
        crate::api::report::clicks_report,
        crate::api::redirect::redirect,
    ),
    components(schemas(
        crate::api::ErrorResponse,
        crate::api::health::HealthResponse,
        crate::api::chat::ChatRequest,
        crate::api::chat::ChatResponse,
        crate::api::urls::CreateUrlRequest,
    ))
)]
pub struct ApiDoc;
