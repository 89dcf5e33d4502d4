use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_u16(profile: &str, key: &str, default: u16) -> u16 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_u32(profile: &str, key: &str, default: u32) -> u32 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_u64(profile: &str, key: &str, default: u64) -> u64 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub server: ServerConfig,
    pub llm: LlmConfig,
    pub cloudflare: CloudflareConfig,
    pub store: StoreConfig,
    pub analytics: AnalyticsConfig,
    pub dispatch: DispatchConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `SHRTY_PROFILE` env var. When set (e.g. `PROD`),
    /// every key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("SHRTY_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            server: ServerConfig::from_env_profiled(p),
            llm: LlmConfig::from_env_profiled(p),
            cloudflare: CloudflareConfig::from_env_profiled(p),
            store: StoreConfig::from_env_profiled(p),
            analytics: AnalyticsConfig::from_env_profiled(p),
            dispatch: DispatchConfig::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!("  server:      {}:{}", self.server.host, self.server.port);
        tracing::info!("  llm:         provider={}, model={}", self.llm.provider, self.llm.model_label());
        tracing::info!("  cloudflare:  account={}", self.cloudflare.account_id.as_deref().unwrap_or("(none)"));
        tracing::info!("  store:       backend={}", self.store.backend);
        tracing::info!("  analytics:   backend={}, dataset={}", self.analytics.backend, self.analytics.dataset);
        tracing::info!(
            "  dispatch:    max_iterations={}, model_timeout={}s, tool_timeout={}s",
            self.dispatch.max_iterations,
            self.dispatch.model_timeout_secs,
            self.dispatch.tool_timeout_secs
        );
    }

    /// Return a redacted view safe for API responses (no secrets).
    pub fn redacted_summary(&self) -> serde_json::Value {
        serde_json::json!({
            "profile": self.profile_label(),
            "server": { "host": self.server.host, "port": self.server.port },
            "llm": {
                "provider": self.llm.provider,
                "model": self.llm.model_label(),
                "configured": self.llm.is_configured(&self.cloudflare),
            },
            "cloudflare": {
                "account_id": self.cloudflare.account_id,
                "configured": self.cloudflare.is_configured(),
            },
            "store": { "backend": self.store.backend },
            "analytics": { "backend": self.analytics.backend, "dataset": self.analytics.dataset },
            "dispatch": {
                "max_iterations": self.dispatch.max_iterations,
                "model_timeout_secs": self.dispatch.model_timeout_secs,
                "tool_timeout_secs": self.dispatch.tool_timeout_secs,
            },
        })
    }
}

// ── Server ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origin: String,
    /// Public origin the shorties live under, e.g. `https://shrty.dev`.
    pub public_base_url: Option<String>,
}

impl ServerConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            host: profiled_env_or(p, "HOST", "0.0.0.0"),
            port: profiled_env_u16(p, "PORT", 8787),
            cors_origin: profiled_env_or(p, "CORS_ORIGIN", "*"),
            public_base_url: profiled_env_opt(p, "PUBLIC_BASE_URL"),
        }
    }
}

// ── LLM (Workers AI / Ollama) ─────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// "workers-ai", "ollama"
    pub provider: String,
    pub workers_ai_model: String,
    pub ollama_url: String,
    pub ollama_model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl LlmConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            provider: profiled_env_or(p, "LLM_PROVIDER", "workers-ai"),
            workers_ai_model: profiled_env_or(
                p,
                "WORKERS_AI_MODEL",
                "@hf/nousresearch/hermes-2-pro-mistral-7b",
            ),
            ollama_url: profiled_env_or(p, "OLLAMA_URL", "http://localhost:11434"),
            ollama_model: profiled_env_or(p, "OLLAMA_MODEL", "llama3.1"),
            temperature: profiled_env_or(p, "LLM_TEMPERATURE", "0.1")
                .parse()
                .unwrap_or(0.1),
            max_tokens: profiled_env_u32(p, "LLM_MAX_TOKENS", 1024),
        }
    }

    pub fn model_label(&self) -> &str {
        match self.provider.as_str() {
            "ollama" => &self.ollama_model,
            _ => &self.workers_ai_model,
        }
    }

    pub fn is_configured(&self, cloudflare: &CloudflareConfig) -> bool {
        match self.provider.as_str() {
            "workers-ai" | "workers_ai" | "cloudflare" => cloudflare.is_configured(),
            "ollama" => true,
            _ => false,
        }
    }
}

// ── Cloudflare account ────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudflareConfig {
    pub account_id: Option<String>,
    pub api_token: Option<String>,
    pub api_base: String,
}

impl CloudflareConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            account_id: profiled_env_opt(p, "CLOUDFLARE_ACCOUNT_ID"),
            api_token: profiled_env_opt(p, "CLOUDFLARE_API_TOKEN"),
            api_base: profiled_env_or(
                p,
                "CLOUDFLARE_API_BASE",
                "https://api.cloudflare.com/client/v4",
            ),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.account_id.is_some() && self.api_token.is_some()
    }
}

// ── Slug store ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// "memory", "workers-kv"
    pub backend: String,
    pub kv_namespace_id: Option<String>,
}

impl StoreConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            backend: profiled_env_or(p, "URL_STORE", "memory"),
            kv_namespace_id: profiled_env_opt(p, "KV_NAMESPACE_ID"),
        }
    }
}

// ── Click analytics ───────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    /// "memory", "analytics-engine"
    pub backend: String,
    pub dataset: String,
}

impl AnalyticsConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            backend: profiled_env_or(p, "ANALYTICS_BACKEND", "memory"),
            dataset: profiled_env_or(p, "ANALYTICS_DATASET", "link_clicks"),
        }
    }
}

// ── Dispatch loop ─────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Maximum number of tool-call rounds per chat request.
    pub max_iterations: usize,
    pub model_timeout_secs: u64,
    pub tool_timeout_secs: u64,
}

impl DispatchConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            max_iterations: profiled_env_u32(p, "DISPATCH_MAX_ITERATIONS", 8) as usize,
            model_timeout_secs: profiled_env_u64(p, "MODEL_TIMEOUT_SECS", 60),
            tool_timeout_secs: profiled_env_u64(p, "TOOL_TIMEOUT_SECS", 15),
        }
    }

    pub fn model_timeout(&self) -> Duration {
        Duration::from_secs(self.model_timeout_secs)
    }

    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }
}
