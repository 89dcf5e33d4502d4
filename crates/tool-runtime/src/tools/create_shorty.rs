use async_trait::async_trait;
use serde::Deserialize;
use shrty_links::{add_url, ShortenError, UrlStore};
use std::sync::Arc;
use tracing::debug;

use crate::registry::ValidatedArguments;
use crate::tool::{to_content, ParamType, Parameter, Tool, ToolDefinition, ToolError};

/// `createShorty`: map a slug to a destination URL.
pub struct CreateShortyTool {
    store: Arc<dyn UrlStore>,
}

impl CreateShortyTool {
    pub fn new(store: Arc<dyn UrlStore>) -> Self {
        Self { store }
    }
}

#[derive(Debug, Deserialize)]
struct CreateShortyArgs {
    slug: String,
    url: String,
    #[serde(default, rename = "override")]
    override_existing: bool,
}

#[async_trait]
impl Tool for CreateShortyTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "createShorty".to_string(),
            description: "Creates a new short link".to_string(),
            parameters: vec![
                Parameter::required("slug", ParamType::String, "The shortened part of the url."),
                Parameter::required(
                    "url",
                    ParamType::String,
                    "The final destination where the shorty should redirect. Should start with https://",
                ),
                Parameter::optional(
                    "override",
                    ParamType::Boolean,
                    "Will override if there is an existing shorty at that slug. Default is false. Ensure the value is lowercased for json",
                ),
            ],
        }
    }

    async fn execute(&self, args: ValidatedArguments) -> Result<String, ToolError> {
        let args: CreateShortyArgs = args
            .parse()
            .map_err(|e| ToolError::InvalidInput(e.to_string()))?;
        debug!(slug = %args.slug, url = %args.url, override_existing = args.override_existing, "createShorty");

        let shorty = add_url(
            self.store.as_ref(),
            &args.slug,
            &args.url,
            args.override_existing,
        )
        .await
        .map_err(|e| match e {
            ShortenError::Store(e) => ToolError::ExecutionFailed(e.to_string()),
            invalid => ToolError::InvalidInput(invalid.to_string()),
        })?;

        to_content(&shorty)
    }
}
