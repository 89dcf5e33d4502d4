use crate::conversation::{Conversation, Message, Role};
use crate::provider::{LlmError, ModelClient};
use crate::registry::ToolRegistry;
use crate::stream::{StreamEvent, StreamedTurn};
use crate::tool::{ToolCall, ToolDefinition, ToolError, ToolResult};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// The tool-call dispatch loop.
///
/// Flow: messages → model → tool calls → execute → tool messages → model → ... → final text
///
/// Tool calls are executed one at a time in the order the model returned
/// them, and the model is re-invoked after every tool message.
pub struct DispatchLoop {
    client: Arc<dyn ModelClient>,
    registry: Arc<ToolRegistry>,
    system_prompt: String,
    max_iterations: usize,
    model_timeout: Duration,
    tool_timeout: Duration,
}

/// One model invocation as seen by the loop.
struct ModelTurn {
    response: Option<String>,
    tool_calls: Vec<ToolCall>,
    chunks: Vec<String>,
}

impl From<StreamedTurn> for ModelTurn {
    fn from(turn: StreamedTurn) -> Self {
        Self {
            response: turn.text(),
            tool_calls: turn.tool_calls,
            chunks: turn.chunks,
        }
    }
}

impl DispatchLoop {
    pub fn new(
        client: Arc<dyn ModelClient>,
        registry: Arc<ToolRegistry>,
        system_prompt: impl Into<String>,
    ) -> Self {
        Self {
            client,
            registry,
            system_prompt: system_prompt.into(),
            max_iterations: 8,
            model_timeout: Duration::from_secs(60),
            tool_timeout: Duration::from_secs(15),
        }
    }

    /// Maximum number of tool-call rounds before giving up.
    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_model_timeout(mut self, timeout: Duration) -> Self {
        self.model_timeout = timeout;
        self
    }

    pub fn with_tool_timeout(mut self, timeout: Duration) -> Self {
        self.tool_timeout = timeout;
        self
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    pub fn provider_name(&self) -> &str {
        self.client.provider_name()
    }

    /// Run the loop over a caller-supplied conversation and return it with
    /// the tool and assistant turns appended.
    pub async fn run(&self, messages: Vec<Message>) -> Result<Vec<Message>, DispatchError> {
        self.drive(messages, None).await
    }

    /// Like [`run`](Self::run), but uses the model's streaming variant and
    /// forwards events to `events`.
    ///
    /// Text is only forwarded for the turn that ends the loop, after every
    /// tool call has been resolved. If the receiver goes away, no further
    /// model invocations are made.
    pub async fn run_streaming(
        &self,
        messages: Vec<Message>,
        events: mpsc::Sender<StreamEvent>,
    ) -> Result<Vec<Message>, DispatchError> {
        let result = self.drive(messages, Some(&events)).await;
        if result.is_ok() {
            let _ = events.send(StreamEvent::MessageEnd).await;
        }
        result
    }

    async fn drive(
        &self,
        messages: Vec<Message>,
        sink: Option<&mpsc::Sender<StreamEvent>>,
    ) -> Result<Vec<Message>, DispatchError> {
        let mut conversation = Conversation::with_system_prompt(self.system_prompt.clone(), messages);
        let tools = self.registry.list();

        let mut turn = self.invoke(&conversation, &tools, sink).await?;
        let mut rounds = 0;

        while !turn.tool_calls.is_empty() {
            if rounds == self.max_iterations {
                warn!(
                    max_iterations = self.max_iterations,
                    pending = turn.tool_calls.len(),
                    "Dispatch loop bound reached with tool calls still pending"
                );
                return Err(DispatchError::LoopBoundExceeded {
                    max_iterations: self.max_iterations,
                    conversation: conversation.into_sequence(),
                });
            }
            rounds += 1;
            debug!(iteration = rounds, count = turn.tool_calls.len(), "Dispatching tool calls");

            for call in std::mem::take(&mut turn.tool_calls) {
                if let Some(tx) = sink {
                    let _ = tx
                        .send(StreamEvent::ToolCall {
                            name: call.name.clone(),
                            arguments: call.arguments.clone(),
                        })
                        .await;
                }

                let result = self.dispatch(&call).await;

                if let Some(tx) = sink {
                    let _ = tx
                        .send(StreamEvent::ToolResult {
                            name: result.name.clone(),
                            content: result.content.clone(),
                            is_error: result.is_error,
                        })
                        .await;
                }
                conversation.append(Message::tool(result.name, result.content));

                turn = self.invoke(&conversation, &tools, sink).await?;
                if let Some(text) = &turn.response {
                    conversation.append(Message::assistant(text.clone()));
                }
            }
        }

        // Only the turn that ends the loop is the final response.
        if let Some(tx) = sink {
            for chunk in &turn.chunks {
                if tx
                    .send(StreamEvent::TextDelta {
                        text: chunk.clone(),
                    })
                    .await
                    .is_err()
                {
                    break;
                }
            }
        }

        if let Some(text) = turn.response {
            if conversation.last().map(|m| m.role) != Some(Role::Assistant) {
                conversation.append(Message::assistant(text));
            }
        }

        info!(rounds, messages = conversation.len() - 1, "Dispatch loop complete");
        Ok(conversation.into_sequence())
    }

    /// Invoke the model once. Transport failures and timeouts are fatal and
    /// carry the conversation accumulated so far.
    async fn invoke(
        &self,
        conversation: &Conversation,
        tools: &[ToolDefinition],
        sink: Option<&mpsc::Sender<StreamEvent>>,
    ) -> Result<ModelTurn, DispatchError> {
        if sink.is_some_and(|tx| tx.is_closed()) {
            info!("Downstream closed, abandoning further model invocations");
            return Err(DispatchError::Cancelled {
                conversation: conversation.to_sequence(),
            });
        }

        let call = self.call_model(conversation.messages(), tools, sink.is_some());
        let turn = match tokio::time::timeout(self.model_timeout, call).await {
            Ok(Ok(turn)) => turn,
            Ok(Err(source)) => {
                warn!(provider = self.client.provider_name(), error = %source, "Model invocation failed");
                return Err(DispatchError::Model {
                    source,
                    conversation: conversation.to_sequence(),
                });
            }
            Err(_) => {
                warn!(provider = self.client.provider_name(), timeout = ?self.model_timeout, "Model invocation timed out");
                return Err(DispatchError::ModelTimeout {
                    timeout: self.model_timeout,
                    conversation: conversation.to_sequence(),
                });
            }
        };

        Ok(turn)
    }

    async fn call_model(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        streaming: bool,
    ) -> Result<ModelTurn, LlmError> {
        if streaming {
            let stream = self.client.stream(messages, tools).await?;
            return Ok(StreamedTurn::collect(stream).await?.into());
        }
        let response = self.client.run(messages, tools).await?;
        Ok(ModelTurn {
            chunks: response.response.iter().cloned().collect(),
            response: response.response,
            tool_calls: response.tool_calls,
        })
    }

    /// Resolve, validate and execute one tool call. Never fails: every
    /// problem becomes an error result the model can read.
    async fn dispatch(&self, call: &ToolCall) -> ToolResult {
        let Some(registered) = self.registry.resolve(&call.name) else {
            warn!(tool = %call.name, "Model requested an unknown tool");
            return ToolResult::error(&call.name, format!("ERROR: Tool not found \"{}\"", call.name));
        };

        let args = match ToolRegistry::validate(registered.definition(), &call.arguments) {
            Ok(args) => args,
            Err(e) => {
                warn!(tool = %call.name, error = %e, "Tool arguments rejected");
                return ToolResult::error(
                    &call.name,
                    format!("ERROR: Invalid arguments for \"{}\": {}", call.name, e),
                );
            }
        };

        info!(tool = %call.name, "Executing tool");
        let tool = registered.tool();
        // Spawned so the execution finishes even if this request is dropped.
        let handle = tokio::spawn(async move { tool.execute(args).await });

        let outcome = match tokio::time::timeout(self.tool_timeout, handle).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(join_error)) => Err(ToolError::ExecutionFailed(join_error.to_string())),
            Err(_) => Err(ToolError::Timeout(self.tool_timeout)),
        };

        match outcome {
            Ok(content) => ToolResult::ok(&call.name, content),
            Err(e) => {
                warn!(tool = %call.name, error = %e, "Tool execution failed");
                ToolResult::error(&call.name, format!("ERROR: Tool \"{}\" failed: {}", call.name, e))
            }
        }
    }
}

/// Fatal dispatch failures. Each carries the conversation accumulated before
/// the failure, without the system message.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Model error: {source}")]
    Model {
        #[source]
        source: LlmError,
        conversation: Vec<Message>,
    },
    #[error("Model did not respond within {timeout:?}")]
    ModelTimeout {
        timeout: Duration,
        conversation: Vec<Message>,
    },
    #[error("Max iterations ({max_iterations}) exceeded without a final response")]
    LoopBoundExceeded {
        max_iterations: usize,
        conversation: Vec<Message>,
    },
    #[error("Client disconnected")]
    Cancelled { conversation: Vec<Message> },
}

impl DispatchError {
    pub fn conversation(&self) -> &[Message] {
        match self {
            DispatchError::Model { conversation, .. }
            | DispatchError::ModelTimeout { conversation, .. }
            | DispatchError::LoopBoundExceeded { conversation, .. }
            | DispatchError::Cancelled { conversation } => conversation,
        }
    }

    pub fn into_conversation(self) -> Vec<Message> {
        match self {
            DispatchError::Model { conversation, .. }
            | DispatchError::ModelTimeout { conversation, .. }
            | DispatchError::LoopBoundExceeded { conversation, .. }
            | DispatchError::Cancelled { conversation } => conversation,
        }
    }
}
