//! Chat endpoints: the dispatch loop over JSON or a streamed text body.

use std::convert::Infallible;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use utoipa::ToSchema;

use shrty_tool_runtime::{DispatchError, Message, StreamEvent};

use crate::state::AppState;

use super::{dispatch_error, error, ApiError, ErrorResponse};

#[derive(Deserialize, ToSchema)]
pub struct ChatRequest {
    /// Prior turns plus the new user message, oldest first.
    #[schema(value_type = Vec<Object>)]
    pub messages: Vec<Message>,
}

#[derive(Serialize, ToSchema)]
pub struct ChatResponse {
    #[schema(value_type = Vec<Object>)]
    pub messages: Vec<Message>,
}

/// Run the assistant over a conversation
///
/// Returns the conversation with tool results and the assistant's reply appended.
#[utoipa::path(
    post,
    path = "/chat",
    tag = "Chat",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Updated conversation", body = ChatResponse),
        (status = 502, description = "Model unavailable", body = ErrorResponse),
        (status = 504, description = "Model timed out", body = ErrorResponse),
        (status = 500, description = "Iteration cap reached", body = ErrorResponse)
    )
)]
pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let messages = state.dispatch.run(req.messages).await.map_err(dispatch_error)?;
    Ok(Json(ChatResponse { messages }))
}

/// Stream the assistant's reply as plain text
///
/// Tool calls are resolved before anything is sent; only the text of the
/// final response is streamed. Fatal dispatch failures are reported before
/// the body starts, with the same status codes as `/chat`.
#[utoipa::path(
    post,
    path = "/chat/stream",
    tag = "Chat",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Assistant text chunks", content_type = "text/plain"),
        (status = 502, description = "Model unavailable", body = ErrorResponse),
        (status = 504, description = "Model timed out", body = ErrorResponse),
        (status = 500, description = "Iteration cap reached", body = ErrorResponse)
    )
)]
pub async fn chat_stream(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> Result<Response, ApiError> {
    let (tx, mut rx) = mpsc::channel::<StreamEvent>(256);
    let (done_tx, done_rx) = oneshot::channel();

    let dispatch = state.dispatch.clone();
    tokio::spawn(async move {
        let result = dispatch.run_streaming(req.messages, tx).await;
        match &result {
            Ok(messages) => {
                tracing::debug!(messages = messages.len(), "Chat stream complete");
            }
            Err(DispatchError::Cancelled { .. }) => {
                tracing::info!("Chat stream cancelled by client");
            }
            Err(_) => {}
        }
        let _ = done_tx.send(result);
    });

    // Text only flows once the loop has finished dispatching, so wait for
    // it (or the end of the message) before committing to a status.
    let mut first = None;
    while let Some(event) = rx.recv().await {
        match event {
            StreamEvent::TextDelta { text } => {
                first = Some(text);
                break;
            }
            StreamEvent::MessageEnd => break,
            _ => {}
        }
    }

    if first.is_none() {
        match done_rx.await {
            Ok(Err(err)) => return Err(dispatch_error(err)),
            Ok(Ok(_)) => {}
            Err(_) => {
                return Err(error(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Chat stream ended unexpectedly",
                ))
            }
        }
    }

    let rest = ReceiverStream::new(rx).filter_map(|event| match event {
        StreamEvent::TextDelta { text } => Some(text),
        _ => None,
    });
    let body = tokio_stream::iter(first).chain(rest).map(Ok::<_, Infallible>);

    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        Body::from_stream(body),
    )
        .into_response())
}
