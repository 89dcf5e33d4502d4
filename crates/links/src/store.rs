use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Slug → destination URL persistence.
///
/// Consistency is owned by the backend; callers do not coordinate writes.
#[async_trait]
pub trait UrlStore: Send + Sync {
    /// Look up the destination for a slug.
    async fn get(&self, slug: &str) -> Result<Option<String>, StoreError>;

    /// Create or replace the mapping for a slug.
    async fn put(&self, slug: &str, url: &str) -> Result<(), StoreError>;

    /// Backend name for logging (e.g., "memory", "workers-kv").
    fn backend_name(&self) -> &str;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store request failed: {0}")]
    Network(String),
    #[error("store API error: {status} - {message}")]
    Api { status: u16, message: String },
    #[error("store not configured: {0}")]
    NotConfigured(String),
}

/// In-process store for local development and tests.
#[derive(Default)]
pub struct MemoryUrlStore {
    urls: RwLock<HashMap<String, String>>,
}

impl MemoryUrlStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored slugs.
    pub async fn len(&self) -> usize {
        self.urls.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.urls.read().await.is_empty()
    }
}

#[async_trait]
impl UrlStore for MemoryUrlStore {
    async fn get(&self, slug: &str) -> Result<Option<String>, StoreError> {
        Ok(self.urls.read().await.get(slug).cloned())
    }

    async fn put(&self, slug: &str, url: &str) -> Result<(), StoreError> {
        self.urls
            .write()
            .await
            .insert(slug.to_string(), url.to_string());
        Ok(())
    }

    fn backend_name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_missing_slug() {
        let store = MemoryUrlStore::new();
        assert!(store.get("nope").await.unwrap().is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let store = MemoryUrlStore::new();
        store.put("ex", "https://example.com").await.unwrap();
        assert_eq!(
            store.get("ex").await.unwrap().as_deref(),
            Some("https://example.com")
        );
    }

    #[tokio::test]
    async fn test_put_replaces() {
        let store = MemoryUrlStore::new();
        store.put("ex", "https://a.example").await.unwrap();
        store.put("ex", "https://b.example").await.unwrap();
        assert_eq!(store.len().await, 1);
        assert_eq!(
            store.get("ex").await.unwrap().as_deref(),
            Some("https://b.example")
        );
    }
}
