//! HTTP handlers, one module per concern.
//! Shared error types live here in mod.rs.

mod chat;
pub mod doc;
mod health;
mod redirect;
mod report;
mod urls;

use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use shrty_tool_runtime::{DispatchError, LlmError, Message};

// ── Shared types ─────────────────────────────────────────────────

#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    /// Conversation accumulated before a fatal dispatch failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Vec<Object>>)]
    pub messages: Option<Vec<Message>>,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub(crate) fn error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
            messages: None,
        }),
    )
}

/// Fatal dispatch failures become 5xx responses that still carry the conversation.
pub(crate) fn dispatch_error(err: DispatchError) -> ApiError {
    let status = match &err {
        DispatchError::Model {
            source: LlmError::NotConfigured(_),
            ..
        } => StatusCode::SERVICE_UNAVAILABLE,
        DispatchError::Model { .. } => StatusCode::BAD_GATEWAY,
        DispatchError::ModelTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        DispatchError::LoopBoundExceeded { .. } | DispatchError::Cancelled { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    tracing::warn!(status = status.as_u16(), error = %err, "Chat request failed");
    let error = err.to_string();
    (
        status,
        Json(ErrorResponse {
            error,
            messages: Some(err.into_conversation()),
        }),
    )
}

// ── Re-exports ───────────────────────────────────────────────────

pub use chat::{chat, chat_stream};
pub use health::health;
pub use redirect::redirect;
pub use report::clicks_report;
pub use urls::create_url;
