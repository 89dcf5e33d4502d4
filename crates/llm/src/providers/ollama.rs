use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use shrty_tool_runtime::{
    conversation::Message,
    provider::{LlmError, ModelClient, ModelResponse},
    stream::{EventStream, StreamEvent},
    tool::{ToolCall, ToolDefinition},
};

use crate::provider::{line_event_stream, parse_arguments, status_error, ProviderSettings};

/// Local Ollama server via `/api/chat`.
pub struct OllamaClient {
    client: reqwest::Client,
    url: String,
    model: String,
    settings: ProviderSettings,
}

impl OllamaClient {
    pub fn new(url: String, model: String, settings: ProviderSettings) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
            model,
            settings,
        }
    }

    fn request_body(&self, messages: &[Message], tools: &[ToolDefinition], stream: bool) -> Value {
        let api_messages: Vec<Value> = messages.iter().map(message_to_ollama).collect();
        let mut body = json!({
            "model": self.model,
            "messages": api_messages,
            "stream": stream,
            "options": {
                "temperature": self.settings.temperature,
                "num_predict": self.settings.max_tokens,
            },
        });
        if !tools.is_empty() {
            body["tools"] = json!(tools.iter().map(tool_definition_to_ollama).collect::<Vec<_>>());
        }
        body
    }

    async fn post(&self, body: &Value) -> Result<reqwest::Response, LlmError> {
        let url = format!("{}/api/chat", self.url.trim_end_matches('/'));
        debug!("Ollama request to {}", url);

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| LlmError::NetworkError(e.to_string()))?;

        let status = response.status().as_u16();
        if status != 200 {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, body));
        }
        Ok(response)
    }
}

fn message_to_ollama(msg: &Message) -> Value {
    let mut value = json!({
        "role": msg.role,
        "content": msg.content,
    });
    if let Some(name) = &msg.name {
        value["tool_name"] = json!(name);
    }
    value
}

fn tool_definition_to_ollama(def: &ToolDefinition) -> Value {
    json!({
        "type": "function",
        "function": {
            "name": def.name,
            "description": def.description,
            "parameters": def.input_schema(),
        },
    })
}

fn tool_calls_from(message: &Value) -> Vec<ToolCall> {
    message["tool_calls"]
        .as_array()
        .map(|calls| {
            calls
                .iter()
                .filter_map(|c| {
                    let function = &c["function"];
                    let name = function["name"].as_str()?;
                    Some(ToolCall::new(name, parse_arguments(&function["arguments"])))
                })
                .collect()
        })
        .unwrap_or_default()
}

fn parse_chat_response(resp: &Value) -> Result<ModelResponse, LlmError> {
    let message = resp
        .get("message")
        .ok_or_else(|| LlmError::InvalidResponse("missing message".into()))?;
    let response = message["content"]
        .as_str()
        .filter(|s| !s.trim().is_empty())
        .map(String::from);
    Ok(ModelResponse {
        response,
        tool_calls: tool_calls_from(message),
    })
}

/// One NDJSON line of a streaming chat response.
fn parse_stream_line(line: &str) -> Vec<StreamEvent> {
    let parsed: Value = match serde_json::from_str(line) {
        Ok(v) => v,
        Err(e) => {
            return vec![StreamEvent::Error {
                message: format!("malformed stream chunk: {e}"),
            }]
        }
    };
    if let Some(error) = parsed["error"].as_str() {
        return vec![StreamEvent::Error {
            message: error.to_string(),
        }];
    }

    let mut events = Vec::new();
    if let Some(text) = parsed["message"]["content"].as_str() {
        if !text.is_empty() {
            events.push(StreamEvent::TextDelta {
                text: text.to_string(),
            });
        }
    }
    for call in tool_calls_from(&parsed["message"]) {
        events.push(StreamEvent::ToolCall {
            name: call.name,
            arguments: call.arguments,
        });
    }
    if parsed["done"].as_bool() == Some(true) {
        events.push(StreamEvent::MessageEnd);
    }
    events
}

#[async_trait]
impl ModelClient for OllamaClient {
    async fn run(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<ModelResponse, LlmError> {
        let body = self.request_body(messages, tools, false);
        let resp: Value = self
            .post(&body)
            .await?
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;
        parse_chat_response(&resp)
    }

    async fn stream(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<EventStream, LlmError> {
        let body = self.request_body(messages, tools, true);
        let response = self.post(&body).await?;
        Ok(line_event_stream(response, parse_stream_line))
    }

    fn provider_name(&self) -> &str {
        "ollama"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shrty_tool_runtime::tool::{ParamType, Parameter};

    fn client() -> OllamaClient {
        OllamaClient::new(
            "http://localhost:11434".into(),
            "llama3.1".into(),
            ProviderSettings::default(),
        )
    }

    #[test]
    fn test_request_body_with_tools() {
        let def = ToolDefinition {
            name: "getClicksByCountryReport".into(),
            description: "clicks".into(),
            parameters: vec![Parameter::required("slug", ParamType::String, "slug")],
        };
        let body = client().request_body(
            &[Message::user("hi"), Message::tool("getClicksByCountryReport", "[]")],
            &[def],
            false,
        );

        assert_eq!(body["model"], "llama3.1");
        assert_eq!(body["stream"], false);
        assert_eq!(body["messages"][1]["role"], "tool");
        assert_eq!(body["messages"][1]["tool_name"], "getClicksByCountryReport");
        assert_eq!(body["tools"][0]["type"], "function");
        assert_eq!(body["tools"][0]["function"]["name"], "getClicksByCountryReport");
    }

    #[test]
    fn test_parse_tool_call_response() {
        let resp = json!({
            "message": {
                "role": "assistant",
                "content": "",
                "tool_calls": [
                    {"function": {"name": "createShorty", "arguments": {"slug": "ex", "url": "https://example.com"}}}
                ]
            },
            "done": true
        });
        let parsed = parse_chat_response(&resp).unwrap();
        assert!(parsed.response.is_none());
        assert_eq!(parsed.tool_calls[0].name, "createShorty");
        assert_eq!(parsed.tool_calls[0].arguments["slug"], "ex");
    }

    #[test]
    fn test_parse_text_response() {
        let resp = json!({"message": {"role": "assistant", "content": "Hi!"}, "done": true});
        assert_eq!(parse_chat_response(&resp).unwrap(), ModelResponse::text("Hi!"));
        assert!(parse_chat_response(&json!({"done": true})).is_err());
    }

    #[test]
    fn test_parse_stream_lines() {
        assert_eq!(
            parse_stream_line(r#"{"message":{"role":"assistant","content":"Hel"},"done":false}"#),
            vec![StreamEvent::TextDelta { text: "Hel".into() }]
        );
        assert_eq!(
            parse_stream_line(r#"{"message":{"role":"assistant","content":""},"done":true}"#),
            vec![StreamEvent::MessageEnd]
        );
        assert!(matches!(
            &parse_stream_line(r#"{"error":"model not found"}"#)[..],
            [StreamEvent::Error { message }] if message == "model not found"
        ));
    }
}
