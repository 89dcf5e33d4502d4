use async_trait::async_trait;
use tracing::debug;

use shrty_tool_runtime::{
    conversation::Message,
    provider::{LlmError, ModelClient, ModelResponse},
    stream::EventStream,
    tool::ToolDefinition,
};

use super::sse::parse_sse_line;
use super::translate::{parse_run_response, request_body};
use crate::provider::{line_event_stream, status_error, ProviderSettings};

/// Workers AI model client.
pub struct WorkersAiClient {
    client: reqwest::Client,
    api_base: String,
    account_id: String,
    api_token: String,
    model: String,
    settings: ProviderSettings,
}

impl WorkersAiClient {
    /// # Arguments
    /// * `api_base` - Cloudflare API base (e.g. `"https://api.cloudflare.com/client/v4"`)
    /// * `model` - Model name (e.g. `"@hf/nousresearch/hermes-2-pro-mistral-7b"`)
    pub fn new(
        api_base: String,
        account_id: String,
        api_token: String,
        model: String,
        settings: ProviderSettings,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base,
            account_id,
            api_token,
            model,
            settings,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub(super) fn run_url(&self) -> String {
        format!(
            "{}/accounts/{}/ai/run/{}",
            self.api_base.trim_end_matches('/'),
            self.account_id,
            self.model
        )
    }

    async fn post(&self, body: &serde_json::Value) -> Result<reqwest::Response, LlmError> {
        let url = self.run_url();
        debug!(model = %self.model, url = %url, "Workers AI request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_token)
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

#[async_trait]
impl ModelClient for WorkersAiClient {
    async fn run(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<ModelResponse, LlmError> {
        let body = request_body(messages, tools, self.settings, false);
        let response = self.post(&body).await?;
        let text = response
            .text()
            .await
            .map_err(|e| LlmError::NetworkError(e.to_string()))?;
        let parsed = parse_run_response(&text)?;
        debug!(
            tool_calls = parsed.tool_calls.len(),
            has_text = parsed.response.is_some(),
            "Workers AI response"
        );
        Ok(parsed)
    }

    async fn stream(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<EventStream, LlmError> {
        let body = request_body(messages, tools, self.settings, true);
        let response = self.post(&body).await?;
        Ok(line_event_stream(response, parse_sse_line))
    }

    fn provider_name(&self) -> &str {
        "workers-ai"
    }
}
