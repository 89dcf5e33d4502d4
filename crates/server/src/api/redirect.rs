use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::Utc;

use shrty_links::ClickEvent;

use crate::state::AppState;

use super::{error, ApiError, ErrorResponse};

/// Country header set by the Cloudflare edge.
const COUNTRY_HEADER: &str = "cf-ipcountry";

/// Follow a shorty
///
/// Records the click, then redirects to the destination URL.
#[utoipa::path(
    get,
    path = "/{slug}",
    tag = "Links",
    params(
        ("slug" = String, Path, description = "Shorty slug")
    ),
    responses(
        (status = 302, description = "Redirect to the destination"),
        (status = 404, description = "Unknown slug", body = ErrorResponse),
        (status = 502, description = "Store unavailable", body = ErrorResponse)
    )
)]
pub async fn redirect(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let url = state
        .store
        .get(&slug)
        .await
        .map_err(|e| error(StatusCode::BAD_GATEWAY, e.to_string()))?
        .ok_or_else(|| error(StatusCode::NOT_FOUND, format!("No shorty named '{slug}'")))?;

    let country = headers
        .get(COUNTRY_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .unwrap_or("XX")
        .to_string();

    let click = ClickEvent {
        slug: slug.clone(),
        url: url.clone(),
        country: Some(country),
        timestamp: Utc::now(),
    };
    if let Err(e) = state.analytics.record_click(click).await {
        tracing::warn!(slug = %slug, error = %e, "Failed to record click");
    }

    Ok((StatusCode::FOUND, [(header::LOCATION, url)]).into_response())
}
