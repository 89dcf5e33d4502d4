use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use utoipa::ToSchema;

use shrty_links::{add_url, ShortenError, Shorty};

use crate::state::AppState;

use super::{error, ApiError, ErrorResponse};

#[derive(Deserialize, ToSchema)]
pub struct CreateUrlRequest {
    pub slug: String,
    pub url: String,
    /// Replace an existing mapping for this slug.
    #[serde(default, rename = "override")]
    pub override_existing: bool,
}

/// Create a shorty without going through the assistant.
#[utoipa::path(
    post,
    path = "/api/url",
    tag = "Links",
    request_body = CreateUrlRequest,
    responses(
        (status = 200, description = "Created shorty, or the existing one when not overridden", body = Object),
        (status = 400, description = "Invalid slug or URL", body = ErrorResponse),
        (status = 502, description = "Store unavailable", body = ErrorResponse)
    )
)]
pub async fn create_url(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateUrlRequest>,
) -> Result<Json<Shorty>, ApiError> {
    add_url(
        state.store.as_ref(),
        &req.slug,
        &req.url,
        req.override_existing,
    )
    .await
    .map(Json)
    .map_err(|e| match e {
        ShortenError::Store(e) => {
            tracing::warn!(slug = %req.slug, error = %e, "Store write failed");
            error(StatusCode::BAD_GATEWAY, e.to_string())
        }
        invalid => error(StatusCode::BAD_REQUEST, invalid.to_string()),
    })
}
