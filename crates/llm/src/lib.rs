pub mod provider;
pub mod providers;

pub use provider::ProviderSettings;
pub use providers::create_model_client;
pub use providers::ollama::OllamaClient;
pub use providers::workers_ai::WorkersAiClient;
