use async_trait::async_trait;
use serde::Deserialize;
use shrty_links::{AnalyticsError, ClickAnalytics};
use std::sync::Arc;
use tracing::debug;

use crate::registry::ValidatedArguments;
use crate::tool::{to_content, ParamType, Parameter, Tool, ToolDefinition, ToolError};

/// `getClicksByCountryReport`: click totals for one shorty, grouped by country.
pub struct ClicksReportTool {
    analytics: Arc<dyn ClickAnalytics>,
}

impl ClicksReportTool {
    pub fn new(analytics: Arc<dyn ClickAnalytics>) -> Self {
        Self { analytics }
    }
}

#[derive(Debug, Deserialize)]
struct ClicksReportArgs {
    slug: String,
}

#[async_trait]
impl Tool for ClicksReportTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "getClicksByCountryReport".to_string(),
            description: "Returns a report of all clicks on a specific shorty grouped by country"
                .to_string(),
            parameters: vec![Parameter::required(
                "slug",
                ParamType::String,
                "The shortened part of the url",
            )],
        }
    }

    async fn execute(&self, args: ValidatedArguments) -> Result<String, ToolError> {
        let args: ClicksReportArgs = args
            .parse()
            .map_err(|e| ToolError::InvalidInput(e.to_string()))?;
        debug!(slug = %args.slug, backend = self.analytics.backend_name(), "getClicksByCountryReport");

        let rows = self
            .analytics
            .clicks_by_country(&args.slug)
            .await
            .map_err(|e| match e {
                AnalyticsError::InvalidParameter(m) => ToolError::InvalidInput(m),
                other => ToolError::ExecutionFailed(other.to_string()),
            })?;

        to_content(&rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ToolRegistry;
    use chrono::Utc;
    use serde_json::json;
    use shrty_links::{ClickEvent, MemoryClickAnalytics};

    #[tokio::test]
    async fn test_report_rows() {
        let analytics = Arc::new(MemoryClickAnalytics::new());
        for country in ["US", "DE", "US"] {
            analytics
                .record_click(ClickEvent {
                    slug: "ex".into(),
                    url: "https://example.com".into(),
                    country: Some(country.into()),
                    timestamp: Utc::now(),
                })
                .await
                .unwrap();
        }
        let tool = ClicksReportTool::new(analytics);

        let args = ToolRegistry::validate(&tool.definition(), &json!({"slug": "ex"})).unwrap();
        let content = tool.execute(args).await.unwrap();
        assert_eq!(
            content,
            r#"[{"country":"US","total":2},{"country":"DE","total":1}]"#
        );
    }

    #[tokio::test]
    async fn test_unknown_slug_is_empty_report() {
        let tool = ClicksReportTool::new(Arc::new(MemoryClickAnalytics::new()));
        let args = ToolRegistry::validate(&tool.definition(), &json!({"slug": "nope"})).unwrap();
        assert_eq!(tool.execute(args).await.unwrap(), "[]");
    }
}
