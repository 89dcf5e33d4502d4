//! Cloudflare Workers KV implementation of [`UrlStore`] over the REST API.

use async_trait::async_trait;
use tracing::debug;
use url::Url;

use crate::store::{StoreError, UrlStore};

/// Workers KV namespace accessed through `/accounts/{id}/storage/kv/namespaces/{ns}/values/{key}`.
pub struct WorkersKvStore {
    client: reqwest::Client,
    api_base: String,
    account_id: String,
    namespace_id: String,
    api_token: String,
}

impl WorkersKvStore {
    pub fn new(api_base: String, account_id: String, namespace_id: String, api_token: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base,
            account_id,
            namespace_id,
            api_token,
        }
    }

    /// Build the value URL for a key. The key is pushed as a path segment so
    /// it is percent-encoded rather than spliced into the path.
    fn value_url(&self, key: &str) -> Result<Url, StoreError> {
        let mut url = Url::parse(&self.api_base)
            .map_err(|e| StoreError::NotConfigured(format!("invalid API base: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| StoreError::NotConfigured("API base cannot be a base URL".into()))?
            .pop_if_empty()
            .extend([
                "accounts",
                self.account_id.as_str(),
                "storage",
                "kv",
                "namespaces",
                self.namespace_id.as_str(),
                "values",
                key,
            ]);
        Ok(url)
    }
}

#[async_trait]
impl UrlStore for WorkersKvStore {
    async fn get(&self, slug: &str) -> Result<Option<String>, StoreError> {
        let url = self.value_url(slug)?;
        debug!(slug, "KV get");

        let response = self
            .client
            .get(url)
            .bearer_auth(&self.api_token)
            .send()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if status == 404 {
            return Ok(None);
        }
        if status != 200 {
            let message = response.text().await.unwrap_or_default();
            return Err(StoreError::Api { status, message });
        }

        let value = response
            .text()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;
        Ok(Some(value))
    }

    async fn put(&self, slug: &str, url: &str) -> Result<(), StoreError> {
        let endpoint = self.value_url(slug)?;
        debug!(slug, "KV put");

        let response = self
            .client
            .put(endpoint)
            .bearer_auth(&self.api_token)
            .header("Content-Type", "text/plain")
            .body(url.to_string())
            .send()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if status != 200 {
            let message = response.text().await.unwrap_or_default();
            return Err(StoreError::Api { status, message });
        }
        Ok(())
    }

    fn backend_name(&self) -> &str {
        "workers-kv"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> WorkersKvStore {
        WorkersKvStore::new(
            "https://api.cloudflare.com/client/v4".into(),
            "acct".into(),
            "ns".into(),
            "token".into(),
        )
    }

    #[test]
    fn test_value_url() {
        let url = store().value_url("ex").unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.cloudflare.com/client/v4/accounts/acct/storage/kv/namespaces/ns/values/ex"
        );
    }

    #[test]
    fn test_value_url_encodes_key() {
        let url = store().value_url("a/b c").unwrap();
        assert!(url.as_str().ends_with("/values/a%2Fb%20c"));
    }

    #[test]
    fn test_invalid_base() {
        let kv = WorkersKvStore::new("not a url".into(), "a".into(), "n".into(), "t".into());
        assert!(matches!(kv.value_url("x"), Err(StoreError::NotConfigured(_))));
    }
}
