use std::sync::Arc;

use shrty_links::{ClickAnalytics, UrlStore};
use shrty_tool_runtime::DispatchLoop;

pub struct AppState {
    pub dispatch: Arc<DispatchLoop>,
    pub store: Arc<dyn UrlStore>,
    pub analytics: Arc<dyn ClickAnalytics>,
    /// "<provider>/<model>", reported by /health.
    pub model_label: String,
}
