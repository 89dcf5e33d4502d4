//! Click analytics capability and the clicks-by-country query.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;
use tracing::warn;

/// One row of the clicks-by-country report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountryClicks {
    pub country: String,
    #[serde(deserialize_with = "count_from_number_or_string")]
    pub total: u64,
}

/// A single redirect, as recorded by the redirect handler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClickEvent {
    pub slug: String,
    pub url: String,
    pub country: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum AnalyticsError {
    #[error("invalid query parameter: {0}")]
    InvalidParameter(String),
    #[error("analytics request failed: {0}")]
    Network(String),
    #[error("analytics API error: {status} - {message}")]
    Api { status: u16, message: String },
    #[error("invalid analytics response: {0}")]
    InvalidResponse(String),
}

#[async_trait]
pub trait ClickAnalytics: Send + Sync {
    /// Click totals for one slug grouped by country.
    async fn clicks_by_country(&self, slug: &str) -> Result<Vec<CountryClicks>, AnalyticsError>;

    /// Record a redirect. Backends without a write path pass through.
    async fn record_click(&self, click: ClickEvent) -> Result<(), AnalyticsError> {
        warn!(
            slug = %click.slug,
            backend = self.backend_name(),
            "Click tracking not supported by this backend, passing through"
        );
        Ok(())
    }

    fn backend_name(&self) -> &str;
}

// ── Query construction ────────────────────────────────────────

/// Clicks grouped by country for a single slug.
///
/// The slug is a bound parameter: it only ever reaches the SQL text through
/// [`quote_literal`].
#[derive(Debug, Clone)]
pub struct ClicksByCountryQuery {
    dataset: String,
    slug: String,
}

impl ClicksByCountryQuery {
    pub fn new(dataset: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            dataset: dataset.into(),
            slug: slug.into(),
        }
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }

    /// Render the statement for the Analytics Engine SQL API.
    /// blob1 holds the slug and blob4 the country, as written by the tracker.
    pub fn to_sql(&self) -> Result<String, AnalyticsError> {
        let table = identifier(&self.dataset)?;
        let slug = quote_literal(&self.slug)?;
        Ok(format!(
            "SELECT blob4 AS country, COUNT() AS total FROM {table} WHERE blob1 = {slug} GROUP BY country ORDER BY total DESC"
        ))
    }
}

/// Quote a string literal for ClickHouse-flavoured SQL.
pub fn quote_literal(value: &str) -> Result<String, AnalyticsError> {
    if value.chars().any(char::is_control) {
        return Err(AnalyticsError::InvalidParameter(
            "control characters are not allowed".into(),
        ));
    }
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('\'');
    for c in value.chars() {
        match c {
            '\\' => quoted.push_str("\\\\"),
            '\'' => quoted.push_str("\\'"),
            _ => quoted.push(c),
        }
    }
    quoted.push('\'');
    Ok(quoted)
}

fn identifier(name: &str) -> Result<&str, AnalyticsError> {
    let valid = !name.is_empty()
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !name.starts_with(|c: char| c.is_ascii_digit());
    if valid {
        Ok(name)
    } else {
        Err(AnalyticsError::InvalidParameter(format!(
            "invalid dataset name '{name}'"
        )))
    }
}

/// The SQL API returns UInt64 columns as JSON strings.
fn count_from_number_or_string<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| D::Error::custom(format!("count is not a u64: {n}"))),
        serde_json::Value::String(s) => s.parse().map_err(D::Error::custom),
        other => Err(D::Error::custom(format!("unexpected count value: {other}"))),
    }
}

// ── In-memory backend ─────────────────────────────────────────

/// Keeps per-slug country counters in process; used for local development
/// and tests. Memory grows with distinct (slug, country) pairs, not clicks.
#[derive(Default)]
pub struct MemoryClickAnalytics {
    counts: RwLock<HashMap<String, BTreeMap<String, u64>>>,
}

impl MemoryClickAnalytics {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ClickAnalytics for MemoryClickAnalytics {
    async fn clicks_by_country(&self, slug: &str) -> Result<Vec<CountryClicks>, AnalyticsError> {
        let counts = self.counts.read().await;
        let mut rows: Vec<CountryClicks> = counts
            .get(slug)
            .into_iter()
            .flatten()
            .map(|(country, total)| CountryClicks {
                country: country.clone(),
                total: *total,
            })
            .collect();
        // Stable sort keeps countries alphabetical within equal totals.
        rows.sort_by(|a, b| b.total.cmp(&a.total));
        Ok(rows)
    }

    async fn record_click(&self, click: ClickEvent) -> Result<(), AnalyticsError> {
        let country = click.country.unwrap_or_else(|| "XX".to_string());
        *self
            .counts
            .write()
            .await
            .entry(click.slug)
            .or_default()
            .entry(country)
            .or_default() += 1;
        Ok(())
    }

    fn backend_name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn click(slug: &str, country: Option<&str>) -> ClickEvent {
        ClickEvent {
            slug: slug.to_string(),
            url: "https://example.com".to_string(),
            country: country.map(String::from),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_sql_binds_slug() {
        let sql = ClicksByCountryQuery::new("link_clicks", "ex").to_sql().unwrap();
        assert_eq!(
            sql,
            "SELECT blob4 AS country, COUNT() AS total FROM link_clicks WHERE blob1 = 'ex' GROUP BY country ORDER BY total DESC"
        );
    }

    #[test]
    fn test_sql_injection_is_escaped() {
        let sql = ClicksByCountryQuery::new("link_clicks", "x' OR 1=1 --")
            .to_sql()
            .unwrap();
        assert!(sql.contains(r"WHERE blob1 = 'x\' OR 1=1 --' GROUP BY"));

        let sql = ClicksByCountryQuery::new("link_clicks", r"x\' OR 1=1 --")
            .to_sql()
            .unwrap();
        assert!(sql.contains(r"WHERE blob1 = 'x\\\' OR 1=1 --' GROUP BY"));
    }

    #[test]
    fn test_rejects_control_chars_and_bad_dataset() {
        assert!(ClicksByCountryQuery::new("link_clicks", "a\nb").to_sql().is_err());
        assert!(ClicksByCountryQuery::new("link_clicks; DROP", "a").to_sql().is_err());
        assert!(ClicksByCountryQuery::new("1table", "a").to_sql().is_err());
    }

    #[test]
    fn test_count_deserializes_from_string_or_number() {
        let rows: Vec<CountryClicks> = serde_json::from_str(
            r#"[{"country":"US","total":"12"},{"country":"DE","total":3}]"#,
        )
        .unwrap();
        assert_eq!(rows[0].total, 12);
        assert_eq!(rows[1].total, 3);
    }

    #[tokio::test]
    async fn test_memory_aggregates_per_slug() {
        let analytics = MemoryClickAnalytics::new();
        analytics.record_click(click("ex", Some("US"))).await.unwrap();
        analytics.record_click(click("ex", Some("US"))).await.unwrap();
        analytics.record_click(click("ex", Some("DE"))).await.unwrap();
        analytics.record_click(click("ex", None)).await.unwrap();
        analytics.record_click(click("other", Some("FR"))).await.unwrap();

        let rows = analytics.clicks_by_country("ex").await.unwrap();
        assert_eq!(
            rows,
            vec![
                CountryClicks { country: "US".into(), total: 2 },
                CountryClicks { country: "DE".into(), total: 1 },
                CountryClicks { country: "XX".into(), total: 1 },
            ]
        );
        assert!(analytics.clicks_by_country("missing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_memory_keeps_one_counter_per_country() {
        let analytics = MemoryClickAnalytics::new();
        for _ in 0..1000 {
            analytics.record_click(click("ex", Some("US"))).await.unwrap();
        }
        analytics.record_click(click("ex", Some("DE"))).await.unwrap();

        assert_eq!(analytics.counts.read().await["ex"].len(), 2);
        let rows = analytics.clicks_by_country("ex").await.unwrap();
        assert_eq!(rows[0], CountryClicks { country: "US".into(), total: 1000 });
        assert_eq!(rows[1], CountryClicks { country: "DE".into(), total: 1 });
    }
}
