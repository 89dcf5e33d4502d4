mod api;
mod cli;
mod router;
mod startup;
mod state;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use shrty_tool_runtime::Message;

use crate::cli::{Cli, Command};

fn load_config() -> shrty_core::Config {
    shrty_core::config::load_dotenv();
    shrty_core::Config::from_env()
}

/// One chat turn through the full stack, printed as JSON.
async fn chat(config: &shrty_core::Config, text: String) -> anyhow::Result<()> {
    let state = startup::build_state(config)?;
    let messages = state.dispatch.run(vec![Message::user(text)]).await?;
    println!("{}", serde_json::to_string_pretty(&messages)?);
    Ok(())
}

async fn shorten(
    config: &shrty_core::Config,
    slug: &str,
    url: &str,
    override_existing: bool,
) -> anyhow::Result<()> {
    let store = startup::build_store(config)?;
    let shorty = shrty_links::add_url(store.as_ref(), slug, url, override_existing).await?;
    println!("{}", serde_json::to_string_pretty(&shorty)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_level(true)
        .init();

    let cli = Cli::parse();
    let mut config = load_config();

    match cli.command.unwrap_or(Command::Serve {
        host: None,
        port: None,
    }) {
        Command::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            startup::serve(&config).await?;
        }
        Command::Chat { text } => chat(&config, text).await?,
        Command::Shorten {
            slug,
            url,
            override_existing,
        } => shorten(&config, &slug, &url, override_existing).await?,
    }

    Ok(())
}
