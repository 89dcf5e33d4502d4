//! Plumbing shared by the HTTP model providers.

use futures::stream::{self, Stream, StreamExt};
use serde_json::Value;
use std::collections::VecDeque;
use std::pin::Pin;
use tracing::trace;

use shrty_tool_runtime::provider::LlmError;
use shrty_tool_runtime::stream::{EventStream, StreamEvent};

/// Sampling settings forwarded to every request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProviderSettings {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            temperature: 0.1,
            max_tokens: 1024,
        }
    }
}

/// Map a non-200 status and its body to an [`LlmError`].
pub(crate) fn status_error(status: u16, body: String) -> LlmError {
    match status {
        401 | 403 => LlmError::AuthError,
        429 => {
            let retry_after = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|v| v["retry_after"].as_u64())
                .unwrap_or(30);
            LlmError::RateLimited {
                retry_after_secs: retry_after,
            }
        }
        _ => LlmError::ApiError {
            status,
            message: body,
        },
    }
}

/// Tool arguments arrive either as an object or as a JSON-encoded string.
pub(crate) fn parse_arguments(raw: &Value) -> Value {
    match raw {
        Value::String(s) => serde_json::from_str(s).unwrap_or_else(|_| Value::String(s.clone())),
        other => other.clone(),
    }
}

/// Split complete lines off the front of `buffer`, leaving any partial line.
///
/// Lines are decoded only once complete, so a multi-byte character split
/// across network chunks survives intact.
pub(crate) fn drain_lines(buffer: &mut Vec<u8>) -> Vec<String> {
    let mut lines = Vec::new();
    while let Some(pos) = buffer.iter().position(|&b| b == b'\n') {
        let raw: Vec<u8> = buffer.drain(..=pos).collect();
        let line = String::from_utf8_lossy(&raw[..pos]);
        let line = line.trim_end_matches('\r');
        if !line.is_empty() {
            lines.push(line.to_string());
        }
    }
    lines
}

type ByteStream = Pin<Box<dyn Stream<Item = Result<bytes::Bytes, reqwest::Error>> + Send>>;

struct LineState<F> {
    bytes: ByteStream,
    buffer: Vec<u8>,
    pending: VecDeque<Result<StreamEvent, LlmError>>,
    parse: F,
    finished: bool,
}

/// Turn a line-oriented response body (SSE or NDJSON) into an [`EventStream`].
///
/// `parse` maps one complete line to zero or more events. A `MessageEnd` is
/// always emitted when the body ends.
pub(crate) fn line_event_stream<F>(response: reqwest::Response, parse: F) -> EventStream
where
    F: Fn(&str) -> Vec<StreamEvent> + Send + 'static,
{
    line_events(Box::pin(response.bytes_stream()), parse)
}

fn line_events<F>(bytes: ByteStream, parse: F) -> EventStream
where
    F: Fn(&str) -> Vec<StreamEvent> + Send + 'static,
{
    let state = LineState {
        bytes,
        buffer: Vec::new(),
        pending: VecDeque::new(),
        parse,
        finished: false,
    };

    let events = stream::unfold(state, |mut state| async move {
        loop {
            if let Some(event) = state.pending.pop_front() {
                return Some((event, state));
            }
            if state.finished {
                return None;
            }

            match state.bytes.next().await {
                Some(Ok(chunk)) => {
                    state.buffer.extend_from_slice(&chunk);
                    for line in drain_lines(&mut state.buffer) {
                        trace!(line = %line, "stream line");
                        state.pending.extend((state.parse)(&line).into_iter().map(Ok));
                    }
                }
                Some(Err(e)) => {
                    state.finished = true;
                    state
                        .pending
                        .push_back(Err(LlmError::StreamError(e.to_string())));
                }
                None => {
                    state.finished = true;
                    let rest = std::mem::take(&mut state.buffer);
                    let rest = String::from_utf8_lossy(&rest);
                    let rest = rest.trim();
                    if !rest.is_empty() {
                        state.pending.extend((state.parse)(rest).into_iter().map(Ok));
                    }
                    state.pending.push_back(Ok(StreamEvent::MessageEnd));
                }
            }
        }
    });

    Box::pin(events)
}
