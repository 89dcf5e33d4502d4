use clap::{Parser, Subcommand};

/// URL shortener with a tool-calling chat assistant.
#[derive(Parser, Debug)]
#[command(name = "shrty", version, about = "URL shortener with a tool-calling chat assistant")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the HTTP server (default)
    Serve {
        /// Bind address override
        #[arg(long)]
        host: Option<String>,
        /// Port override
        #[arg(long)]
        port: Option<u16>,
    },
    /// Run one chat turn through the assistant and print the conversation as JSON
    Chat {
        /// The user message
        text: String,
    },
    /// Create a shorty directly, without the assistant
    Shorten {
        slug: String,
        url: String,
        /// Replace an existing mapping for this slug
        #[arg(long = "override")]
        override_existing: bool,
    },
}
