//! Request and response translation for Workers AI.

use serde::Deserialize;
use serde_json::{json, Value};

use shrty_tool_runtime::conversation::Message;
use shrty_tool_runtime::provider::{LlmError, ModelResponse};
use shrty_tool_runtime::tool::{ToolCall, ToolDefinition};

use crate::provider::{parse_arguments, ProviderSettings};

/// Marker some models leave at the end of their text.
pub(super) const END_OF_TURN: &str = "<|im_end|>";

pub(super) fn message_to_workers_ai(msg: &Message) -> Value {
    let mut value = json!({
        "role": msg.role,
        "content": msg.content,
    });
    if let Some(name) = &msg.name {
        value["name"] = json!(name);
    }
    value
}

pub(super) fn tool_definition_to_workers_ai(def: &ToolDefinition) -> Value {
    json!({
        "name": def.name,
        "description": def.description,
        "parameters": def.input_schema(),
    })
}

pub(super) fn request_body(
    messages: &[Message],
    tools: &[ToolDefinition],
    settings: ProviderSettings,
    stream: bool,
) -> Value {
    let mut body = json!({
        "messages": messages.iter().map(message_to_workers_ai).collect::<Vec<_>>(),
        "max_tokens": settings.max_tokens,
        "temperature": settings.temperature,
    });
    if !tools.is_empty() {
        body["tools"] = json!(tools.iter().map(tool_definition_to_workers_ai).collect::<Vec<_>>());
    }
    if stream {
        body["stream"] = json!(true);
    }
    body
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    errors: Vec<ApiMessage>,
    result: Option<RunResult>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct RunResult {
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub tool_calls: Vec<RawToolCall>,
}

#[derive(Debug, Deserialize)]
pub(super) struct RawToolCall {
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

impl RawToolCall {
    pub(super) fn into_tool_call(self) -> ToolCall {
        ToolCall::new(self.name, parse_arguments(&self.arguments))
    }
}

/// Strip the end-of-turn marker and treat blank text as no text.
pub(super) fn clean_text(text: Option<String>) -> Option<String> {
    let text = text?;
    let text = text.replace(END_OF_TURN, "");
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

pub(super) fn parse_run_response(body: &str) -> Result<ModelResponse, LlmError> {
    let envelope: Envelope =
        serde_json::from_str(body).map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

    if envelope.success == Some(false) {
        let message = envelope
            .errors
            .into_iter()
            .map(|e| e.message)
            .collect::<Vec<_>>()
            .join("; ");
        return Err(LlmError::ApiError {
            status: 200,
            message,
        });
    }

    let result = envelope
        .result
        .ok_or_else(|| LlmError::InvalidResponse("missing result".into()))?;

    Ok(ModelResponse {
        response: clean_text(result.response),
        tool_calls: result
            .tool_calls
            .into_iter()
            .map(RawToolCall::into_tool_call)
            .collect(),
    })
}
