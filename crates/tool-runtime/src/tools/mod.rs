//! The tools the shorty assistant can call.
//!
//! Both are thin adapters over `shrty-links`: argument shapes live here,
//! behavior lives with the store and analytics backends.

pub mod clicks_report;
pub mod create_shorty;

pub use clicks_report::ClicksReportTool;
pub use create_shorty::CreateShortyTool;

use shrty_links::{ClickAnalytics, UrlStore};
use std::sync::Arc;

use crate::registry::{RegistryError, ToolRegistry};

/// Registry holding exactly `createShorty` and `getClicksByCountryReport`, in that order.
pub fn default_registry(
    store: Arc<dyn UrlStore>,
    analytics: Arc<dyn ClickAnalytics>,
) -> Result<ToolRegistry, RegistryError> {
    let mut registry = ToolRegistry::new();
    registry.register(CreateShortyTool::new(store))?;
    registry.register(ClicksReportTool::new(analytics))?;
    Ok(registry)
}
