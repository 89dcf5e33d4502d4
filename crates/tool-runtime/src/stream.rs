use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::pin::Pin;

use crate::provider::{LlmError, ModelResponse};
use crate::tool::ToolCall;

/// Events emitted while streaming.
///
/// Providers emit `TextDelta`, `ToolCall` and `MessageEnd`; the dispatch loop
/// additionally emits `ToolResult` downstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// A chunk of assistant text
    TextDelta { text: String },
    /// The model requested a tool call
    ToolCall { name: String, arguments: Value },
    /// A tool call was dispatched and produced this message content
    ToolResult {
        name: String,
        content: String,
        is_error: bool,
    },
    /// The model turn is complete
    MessageEnd,
    /// An error occurred during streaming
    Error { message: String },
}

pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send>>;

/// A model turn reassembled from a stream.
///
/// Tool calls cannot be dispatched from a partial response, so the whole
/// turn is collected before anything is forwarded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamedTurn {
    pub chunks: Vec<String>,
    pub tool_calls: Vec<ToolCall>,
}

impl StreamedTurn {
    pub async fn collect(mut stream: EventStream) -> Result<Self, LlmError> {
        let mut turn = Self::default();
        while let Some(event) = stream.next().await {
            match event? {
                StreamEvent::TextDelta { text } => {
                    if !text.is_empty() {
                        turn.chunks.push(text);
                    }
                }
                StreamEvent::ToolCall { name, arguments } => {
                    turn.tool_calls.push(ToolCall { name, arguments });
                }
                StreamEvent::MessageEnd => break,
                StreamEvent::Error { message } => return Err(LlmError::StreamError(message)),
                StreamEvent::ToolResult { .. } => {}
            }
        }
        Ok(turn)
    }

    pub fn text(&self) -> Option<String> {
        if self.chunks.is_empty() {
            None
        } else {
            Some(self.chunks.concat())
        }
    }

    pub fn into_response(self) -> ModelResponse {
        ModelResponse {
            response: self.text(),
            tool_calls: self.tool_calls,
        }
    }
}
