//! Wiring from [`Config`] to the shared application state.

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use shrty_core::Config;
use shrty_links::{
    AnalyticsEngineClient, ClickAnalytics, MemoryClickAnalytics, MemoryUrlStore, UrlStore,
    WorkersKvStore,
};
use shrty_tool_runtime::{default_registry, system_preamble, DispatchLoop};

use crate::state::AppState;

fn cloudflare_credentials(config: &Config) -> anyhow::Result<(String, String)> {
    let account_id = config
        .cloudflare
        .account_id
        .clone()
        .context("CLOUDFLARE_ACCOUNT_ID not set")?;
    let api_token = config
        .cloudflare
        .api_token
        .clone()
        .context("CLOUDFLARE_API_TOKEN not set")?;
    Ok((account_id, api_token))
}

pub fn build_store(config: &Config) -> anyhow::Result<Arc<dyn UrlStore>> {
    match config.store.backend.as_str() {
        "memory" => {
            warn!("Using in-memory URL store; shorties are lost on restart");
            Ok(Arc::new(MemoryUrlStore::new()))
        }
        "workers-kv" | "workers_kv" | "kv" => {
            let (account_id, api_token) = cloudflare_credentials(config)?;
            let namespace_id = config
                .store
                .kv_namespace_id
                .clone()
                .context("KV_NAMESPACE_ID not set")?;
            Ok(Arc::new(WorkersKvStore::new(
                config.cloudflare.api_base.clone(),
                account_id,
                namespace_id,
                api_token,
            )))
        }
        other => anyhow::bail!("unknown URL_STORE backend: '{}'", other),
    }
}

pub fn build_analytics(config: &Config) -> anyhow::Result<Arc<dyn ClickAnalytics>> {
    match config.analytics.backend.as_str() {
        "memory" => Ok(Arc::new(MemoryClickAnalytics::new())),
        "analytics-engine" | "analytics_engine" => {
            let (account_id, api_token) = cloudflare_credentials(config)?;
            Ok(Arc::new(AnalyticsEngineClient::new(
                config.cloudflare.api_base.clone(),
                account_id,
                api_token,
                config.analytics.dataset.clone(),
            )))
        }
        other => anyhow::bail!("unknown ANALYTICS_BACKEND: '{}'", other),
    }
}

/// Build the application state: backends, model client, tool registry and dispatch loop.
pub fn build_state(config: &Config) -> anyhow::Result<AppState> {
    let store = build_store(config)?;
    let analytics = build_analytics(config)?;

    let client = shrty_llm::create_model_client(&config.llm, &config.cloudflare)
        .context("failed to create model client")?;
    let registry = default_registry(store.clone(), analytics.clone())?;

    info!(
        provider = client.provider_name(),
        model = config.llm.model_label(),
        tools = registry.len(),
        store = store.backend_name(),
        analytics = analytics.backend_name(),
        "Dispatch loop ready"
    );

    let dispatch = DispatchLoop::new(
        client,
        Arc::new(registry),
        system_preamble(config.server.public_base_url.as_deref()),
    )
    .with_max_iterations(config.dispatch.max_iterations)
    .with_model_timeout(config.dispatch.model_timeout())
    .with_tool_timeout(config.dispatch.tool_timeout());

    Ok(AppState {
        dispatch: Arc::new(dispatch),
        store,
        analytics,
        model_label: format!("{}/{}", config.llm.provider, config.llm.model_label()),
    })
}

pub async fn serve(config: &Config) -> anyhow::Result<()> {
    config.log_summary();
    let state = Arc::new(build_state(config)?);
    let app = crate::router::build_router(state, &config.server.cors_origin);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Server listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
