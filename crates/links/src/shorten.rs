//! Shorty creation with override semantics.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::store::{StoreError, UrlStore};

/// Result of creating (or refusing to replace) a shorty.
///
/// Field order is the wire order: `slug`, `url`, `shorty`, then the optional
/// `message` when an existing mapping was kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shorty {
    pub slug: String,
    pub url: String,
    /// Path of the short link, e.g. `/ex`.
    pub shorty: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ShortenError {
    #[error("invalid slug '{0}': must be non-empty and contain no '/', '?', '#' or whitespace")]
    InvalidSlug(String),
    #[error("invalid url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub fn validate_slug(slug: &str) -> Result<(), ShortenError> {
    let bad = slug.is_empty()
        || slug
            .chars()
            .any(|c| matches!(c, '/' | '?' | '#') || c.is_whitespace() || c.is_control());
    if bad {
        return Err(ShortenError::InvalidSlug(slug.to_string()));
    }
    Ok(())
}

pub fn validate_url(raw: &str) -> Result<(), ShortenError> {
    let parsed = url::Url::parse(raw).map_err(|e| ShortenError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ShortenError::InvalidUrl {
            url: raw.to_string(),
            reason: format!("unsupported scheme '{other}'"),
        }),
    }
}

/// Map `slug` to `url`.
///
/// When the slug already exists and `override_existing` is false, the store
/// is left untouched and the existing mapping is reported back.
pub async fn add_url(
    store: &dyn UrlStore,
    slug: &str,
    url: &str,
    override_existing: bool,
) -> Result<Shorty, ShortenError> {
    validate_slug(slug)?;
    validate_url(url)?;

    if let Some(existing) = store.get(slug).await? {
        if !override_existing {
            info!(slug, existing = %existing, "Slug exists, not overriding");
            return Ok(Shorty {
                slug: slug.to_string(),
                url: existing.clone(),
                shorty: format!("/{slug}"),
                message: Some(format!(
                    "Did not update {slug} because it already was pointing to {existing} and override was set to {override_existing}."
                )),
            });
        }
        info!(slug, "Overriding shorty");
    }

    store.put(slug, url).await?;
    info!(slug, url, backend = store.backend_name(), "Shorty stored");

    Ok(Shorty {
        slug: slug.to_string(),
        url: url.to_string(),
        shorty: format!("/{slug}"),
        message: None,
    })
}
