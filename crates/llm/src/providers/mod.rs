pub mod ollama;
pub mod workers_ai;

use std::sync::Arc;

use shrty_core::config::{CloudflareConfig, LlmConfig};
use shrty_tool_runtime::provider::{LlmError, ModelClient};

use crate::provider::ProviderSettings;

/// Create the model client selected by config.
pub fn create_model_client(
    llm_config: &LlmConfig,
    cloudflare: &CloudflareConfig,
) -> Result<Arc<dyn ModelClient>, LlmError> {
    let settings = ProviderSettings {
        temperature: llm_config.temperature,
        max_tokens: llm_config.max_tokens,
    };

    match llm_config.provider.as_str() {
        "workers-ai" | "workers_ai" | "cloudflare" => {
            let account_id = cloudflare
                .account_id
                .as_ref()
                .ok_or_else(|| LlmError::NotConfigured("CLOUDFLARE_ACCOUNT_ID not set".into()))?;
            let api_token = cloudflare
                .api_token
                .as_ref()
                .ok_or_else(|| LlmError::NotConfigured("CLOUDFLARE_API_TOKEN not set".into()))?;
            Ok(Arc::new(workers_ai::WorkersAiClient::new(
                cloudflare.api_base.clone(),
                account_id.clone(),
                api_token.clone(),
                llm_config.workers_ai_model.clone(),
                settings,
            )))
        }
        "ollama" => Ok(Arc::new(ollama::OllamaClient::new(
            llm_config.ollama_url.clone(),
            llm_config.ollama_model.clone(),
            settings,
        ))),
        other => Err(LlmError::NotConfigured(format!(
            "unknown LLM provider: '{}'",
            other
        ))),
    }
}
