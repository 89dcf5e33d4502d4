//! Cloudflare Workers AI implementation of [`ModelClient`].
//!
//! Talks to the `ai/run/{model}` REST endpoint, which accepts the
//! conversation and function-calling tool definitions and returns either
//! final text, tool calls, or an SSE stream of text chunks.
//!
//! [`ModelClient`]: shrty_tool_runtime::provider::ModelClient

mod client;
mod sse;
mod translate;

pub use self::client::WorkersAiClient;
