//! SSE `data:` line parsing for the Workers AI streaming API.

use serde_json::Value;
use tracing::trace;

use shrty_tool_runtime::stream::StreamEvent;

use super::translate::{RawToolCall, END_OF_TURN};

/// Parse one SSE line into zero or more [`StreamEvent`]s.
pub(super) fn parse_sse_line(line: &str) -> Vec<StreamEvent> {
    let Some(data) = line.strip_prefix("data:") else {
        trace!(line, "ignoring non-data SSE line");
        return Vec::new();
    };
    let data = data.trim();

    if data == "[DONE]" {
        return vec![StreamEvent::MessageEnd];
    }

    let parsed: Value = match serde_json::from_str(data) {
        Ok(v) => v,
        Err(e) => {
            return vec![StreamEvent::Error {
                message: format!("malformed stream chunk: {e}"),
            }]
        }
    };

    let mut events = Vec::new();
    if let Some(text) = parsed["response"].as_str() {
        let text = text.replace(END_OF_TURN, "");
        if !text.is_empty() {
            events.push(StreamEvent::TextDelta { text });
        }
    }
    if let Some(calls) = parsed.get("tool_calls").filter(|v| v.is_array()) {
        if let Ok(calls) = serde_json::from_value::<Vec<RawToolCall>>(calls.clone()) {
            for call in calls.into_iter().map(RawToolCall::into_tool_call) {
                events.push(StreamEvent::ToolCall {
                    name: call.name,
                    arguments: call.arguments,
                });
            }
        }
    }
    events
}
