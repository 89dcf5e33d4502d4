use crate::conversation::Message;
use crate::stream::{EventStream, StreamEvent};
use crate::tool::{ToolCall, ToolDefinition};
use async_trait::async_trait;
use futures::stream;
use serde::{Deserialize, Serialize};

/// What one model invocation produced: final text, tool calls, or both.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelResponse {
    pub response: Option<String>,
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
}

impl ModelResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            response: Some(text.into()),
            tool_calls: Vec::new(),
        }
    }

    pub fn tool_calls(calls: Vec<ToolCall>) -> Self {
        Self {
            response: None,
            tool_calls: calls,
        }
    }
}

/// The language-model capability the dispatch loop drives.
///
/// This trait lives in tool-runtime (not in crates/llm) because it's
/// defined by the consumer (the dispatch loop), not the provider.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Run the model over the full message list with the tools available.
    async fn run(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<ModelResponse, LlmError>;

    /// Streaming variant. The default adapts [`run`](Self::run) into a
    /// single-chunk stream.
    async fn stream(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<EventStream, LlmError> {
        let response = self.run(messages, tools).await?;
        let mut events = Vec::new();
        if let Some(text) = response.response {
            events.push(Ok(StreamEvent::TextDelta { text }));
        }
        for call in response.tool_calls {
            events.push(Ok(StreamEvent::ToolCall {
                name: call.name,
                arguments: call.arguments,
            }));
        }
        events.push(Ok(StreamEvent::MessageEnd));
        Ok(Box::pin(stream::iter(events)))
    }

    /// Provider name for logging/debugging (e.g., "workers-ai", "ollama")
    fn provider_name(&self) -> &str;
}

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },
    #[error("Network error: {0}")]
    NetworkError(String),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Rate limited: retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },
    #[error("Authentication failed")]
    AuthError,
    #[error("Stream error: {0}")]
    StreamError(String),
    #[error("Provider not configured: {0}")]
    NotConfigured(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Mock model client for testing the dispatch loop without real API calls.
#[cfg(any(test, feature = "test-utils"))]
pub mod mock {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Returns queued responses in FIFO order and records every invocation.
    pub struct MockModelClient {
        responses: Mutex<VecDeque<Result<ModelResponse, String>>>,
        fallback: Option<ModelResponse>,
        calls: Mutex<Vec<Vec<Message>>>,
        delay: Option<Duration>,
    }

    impl MockModelClient {
        pub fn new() -> Self {
            Self {
                responses: Mutex::new(VecDeque::new()),
                fallback: None,
                calls: Mutex::new(Vec::new()),
                delay: None,
            }
        }

        /// Response returned once the queue is drained (default: empty response).
        pub fn with_fallback(mut self, response: ModelResponse) -> Self {
            self.fallback = Some(response);
            self
        }

        /// Sleep before answering each invocation.
        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        pub fn queue_response(&self, response: ModelResponse) {
            self.responses.lock().unwrap().push_back(Ok(response));
        }

        pub fn queue_text(&self, text: &str) {
            self.queue_response(ModelResponse::text(text));
        }

        pub fn queue_tool_call(&self, name: &str, arguments: serde_json::Value) {
            self.queue_response(ModelResponse::tool_calls(vec![ToolCall::new(name, arguments)]));
        }

        /// Queue a transport failure.
        pub fn queue_error(&self, message: &str) {
            self.responses
                .lock()
                .unwrap()
                .push_back(Err(message.to_string()));
        }

        /// Message lists seen by each invocation, in order.
        pub fn calls(&self) -> Vec<Vec<Message>> {
            self.calls.lock().unwrap().clone()
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    impl Default for MockModelClient {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl ModelClient for MockModelClient {
        async fn run(
            &self,
            messages: &[Message],
            _tools: &[ToolDefinition],
        ) -> Result<ModelResponse, LlmError> {
            self.calls.lock().unwrap().push(messages.to_vec());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            let next = self.responses.lock().unwrap().pop_front();
            match next {
                Some(Ok(response)) => Ok(response),
                Some(Err(message)) => Err(LlmError::NetworkError(message)),
                None => Ok(self.fallback.clone().unwrap_or_default()),
            }
        }

        /// Splits text on spaces so streaming consumers see several chunks.
        async fn stream(
            &self,
            messages: &[Message],
            tools: &[ToolDefinition],
        ) -> Result<EventStream, LlmError> {
            let response = self.run(messages, tools).await?;
            let mut events = Vec::new();
            if let Some(text) = response.response {
                for chunk in text.split_inclusive(' ') {
                    events.push(Ok(StreamEvent::TextDelta {
                        text: chunk.to_string(),
                    }));
                }
            }
            for call in response.tool_calls {
                events.push(Ok(StreamEvent::ToolCall {
                    name: call.name,
                    arguments: call.arguments,
                }));
            }
            events.push(Ok(StreamEvent::MessageEnd));
            Ok(Box::pin(stream::iter(events)))
        }

        fn provider_name(&self) -> &str {
            "mock"
        }
    }
}
