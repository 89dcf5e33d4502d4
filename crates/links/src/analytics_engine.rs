//! Cloudflare Analytics Engine SQL API client.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::analytics::{AnalyticsError, ClickAnalytics, ClicksByCountryQuery, CountryClicks};

/// Reads click data from the Analytics Engine dataset the redirect worker writes to.
///
/// The SQL API is read-only, so `record_click` keeps the pass-through default.
pub struct AnalyticsEngineClient {
    client: reqwest::Client,
    api_base: String,
    account_id: String,
    api_token: String,
    dataset: String,
}

#[derive(Debug, Deserialize)]
struct SqlResponse {
    #[serde(default)]
    data: Vec<CountryClicks>,
}

impl AnalyticsEngineClient {
    pub fn new(api_base: String, account_id: String, api_token: String, dataset: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base,
            account_id,
            api_token,
            dataset,
        }
    }

    fn sql_url(&self) -> String {
        format!(
            "{}/accounts/{}/analytics_engine/sql",
            self.api_base.trim_end_matches('/'),
            self.account_id
        )
    }
}

#[async_trait]
impl ClickAnalytics for AnalyticsEngineClient {
    async fn clicks_by_country(&self, slug: &str) -> Result<Vec<CountryClicks>, AnalyticsError> {
        let sql = ClicksByCountryQuery::new(&self.dataset, slug).to_sql()?;
        debug!(slug, sql = %sql, "Analytics Engine query");

        let response = self
            .client
            .post(self.sql_url())
            .bearer_auth(&self.api_token)
            .body(sql)
            .send()
            .await
            .map_err(|e| AnalyticsError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if status != 200 {
            let message = response.text().await.unwrap_or_default();
            return Err(AnalyticsError::Api { status, message });
        }

        let body: SqlResponse = response
            .json()
            .await
            .map_err(|e| AnalyticsError::InvalidResponse(e.to_string()))?;
        Ok(body.data)
    }

    fn backend_name(&self) -> &str {
        "analytics-engine"
    }
}
